//! Byte ranges and the range plan.

use std::fmt;

/// Inclusive byte range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    from: u64,
    to: u64,
}

impl ByteRange {
    /// Returns `None` when `to < from`.
    pub fn new(from: u64, to: u64) -> Option<Self> {
        (to >= from).then_some(Self { from, to })
    }

    pub fn from(&self) -> u64 {
        self.from
    }

    pub fn to(&self) -> u64 {
        self.to
    }

    /// Number of bytes covered. Never zero.
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    /// HTTP Range header value: `bytes=from-to`.
    pub fn header_value(&self) -> String {
        format!("bytes={}", self.curl_range())
    }

    /// Range in the form libcurl expects (`from-to`, no unit).
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Part size actually used for planning.
///
/// The configured size is kept unless it is below `min_part_size`, in which
/// case the file is split evenly across the connections instead.
pub fn effective_part_size(
    part_size: u64,
    min_part_size: u64,
    file_size: u64,
    connection_count: usize,
) -> u64 {
    if part_size >= min_part_size && part_size > 0 {
        return part_size;
    }
    let conns = connection_count.max(1) as u64;
    (file_size / conns).max(1)
}

/// Split `[0, file_size - 1]` into consecutive ranges of `part_size` bytes.
///
/// There are `ceil(file_size / part_size)` ranges in ascending order; the
/// last one is clamped to `file_size - 1`. Empty when either input is 0.
pub fn plan_ranges(file_size: u64, part_size: u64) -> Vec<ByteRange> {
    if file_size == 0 || part_size == 0 {
        return Vec::new();
    }
    let count = file_size.div_ceil(part_size);
    let last = file_size - 1;
    (0..count)
        .map(|idx| {
            let from = idx * part_size;
            let to = (from + part_size - 1).min(last);
            ByteRange { from, to }
        })
        .collect()
}
