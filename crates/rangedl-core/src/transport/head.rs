//! Response status line and headers.

/// Status and headers of the final response (after redirects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: u32) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// Total length from `Content-Range: bytes a-b/total`, i.e. the text after the last `/`.
    /// `None` when the header is absent or the total is `*`.
    pub fn content_range_total(&self) -> Option<u64> {
        let value = self.header("content-range")?;
        let (_, total) = value.rsplit_once('/')?;
        total.trim().parse().ok()
    }
}

/// Parse raw header lines (status line first) into a `ResponseHead`.
///
/// Only the last status block is kept, so redirect and `100 Continue`
/// responses collected along the way are discarded.
pub fn parse_response_head(lines: &[String]) -> Option<ResponseHead> {
    let mut head: Option<ResponseHead> = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            let status = line.split_whitespace().nth(1)?.parse().ok()?;
            head = Some(ResponseHead::new(status));
            continue;
        }
        if let (Some(h), Some((name, value))) = (head.as_mut(), line.split_once(':')) {
            h.headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    head
}
