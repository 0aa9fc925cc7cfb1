//! Sizes learned from a part's response headers.

use crate::transport::ResponseHead;

/// Whole-file size (`-1` when unknown) and this response's body size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LearnedSizes {
    pub whole_file: i64,
    pub range: i64,
}

impl LearnedSizes {
    pub(crate) const UNKNOWN: LearnedSizes = LearnedSizes {
        whole_file: -1,
        range: -1,
    };
}

/// Read sizes from a successful response.
///
/// The whole-file size comes from the `Content-Range` total and the range size
/// from `Content-Length`. A body larger than the advertised total raises the
/// total, so a `200` answer with only `Content-Length` still yields a size.
pub(crate) fn learn_sizes(head: &ResponseHead) -> LearnedSizes {
    let mut whole_file = head.content_range_total().map_or(0, clamp_i64);
    let range = head.content_length().map_or(0, clamp_i64);
    if range > whole_file {
        whole_file = range;
    }
    LearnedSizes { whole_file, range }
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_content_sizes() {
        let head = ResponseHead::new(206)
            .with_header("Content-Range", "bytes 0-10000000/5000")
            .with_header("Content-Length", "5000");
        assert_eq!(
            learn_sizes(&head),
            LearnedSizes {
                whole_file: 5000,
                range: 5000
            }
        );
    }

    #[test]
    fn content_length_raises_total() {
        let head = ResponseHead::new(200).with_header("Content-Length", "1234");
        assert_eq!(learn_sizes(&head).whole_file, 1234);

        let head = ResponseHead::new(206)
            .with_header("Content-Range", "bytes 0-99/50")
            .with_header("Content-Length", "100");
        assert_eq!(learn_sizes(&head).whole_file, 100);
    }

    #[test]
    fn no_headers_means_zero() {
        let sizes = learn_sizes(&ResponseHead::new(200));
        assert_eq!(sizes.whole_file, 0);
        assert_eq!(sizes.range, 0);
    }
}
