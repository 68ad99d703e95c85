//! HTTP byte-range resolution
//!
//! Media players fetch a video in overlapping `Range: bytes=start-end` chunks
//! while seeking. This module turns the header value into a concrete,
//! validated span of the file; the server only has to copy those bytes.
//!
//! Policy:
//! - Unparseable headers (other units, multiple ranges, garbage) are ignored
//!   and the whole file is served, as RFC 9110 allows.
//! - An omitted start means 0, an omitted end means the last byte.
//! - An end past the file is clamped to the last byte.
//! - A start at or past the end of the file, or an end before the start, is
//!   unsatisfiable and answered with `416`.

use crate::error::RangeError;

/// Inclusive byte span within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the span
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header of a `206` response
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// What a request asked for after the `Range` header was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No usable range: serve the whole file with `200`
    Full,
    /// Serve this span with `206`
    Partial(ByteRange),
}

/// Value for the `Content-Range` header of a `416` response
pub fn unsatisfiable_content_range(file_size: u64) -> String {
    format!("bytes */{}", file_size)
}

/// Resolve an optional `Range` header value against a file of `file_size` bytes
pub fn resolve_range(header: Option<&str>, file_size: u64) -> Result<RangeRequest, RangeError> {
    let Some((start, end)) = header.and_then(parse_bounds) else {
        return Ok(RangeRequest::Full);
    };

    if file_size == 0 {
        return Err(RangeError::EmptyFile);
    }
    if start >= file_size {
        return Err(RangeError::StartBeyondEnd { start, file_size });
    }
    let last = file_size - 1;
    let end = match end {
        Some(end) if end < start => return Err(RangeError::Inverted { start, end }),
        Some(end) => end.min(last),
        None => last,
    };

    Ok(RangeRequest::Partial(ByteRange { start, end }))
}

/// Parse `bytes=start-end`, returning `None` for anything malformed
fn parse_bounds(header: &str) -> Option<(u64, Option<u64>)> {
    let (unit, spec) = header.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }
    if spec.contains(',') {
        return None;
    }

    let (start, end) = spec.trim().split_once('-')?;
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() && end.is_empty() {
        return None;
    }

    let start = if start.is_empty() {
        0
    } else {
        start.parse::<u64>().ok()?
    };
    let end = if end.is_empty() {
        None
    } else {
        Some(end.parse::<u64>().ok()?)
    };

    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u64 = 1000;

    fn partial(start: u64, end: u64) -> Result<RangeRequest, RangeError> {
        Ok(RangeRequest::Partial(ByteRange { start, end }))
    }

    #[test]
    fn test_no_header_is_full() {
        assert_eq!(resolve_range(None, SIZE), Ok(RangeRequest::Full));
    }

    #[test]
    fn test_explicit_range() {
        assert_eq!(resolve_range(Some("bytes=100-199"), SIZE), partial(100, 199));
        if let Ok(RangeRequest::Partial(range)) = resolve_range(Some("bytes=100-199"), SIZE) {
            assert_eq!(range.len(), 100);
            assert_eq!(range.content_range(SIZE), "bytes 100-199/1000");
        }
    }

    #[test]
    fn test_open_ended_range() {
        assert_eq!(resolve_range(Some("bytes=0-"), SIZE), partial(0, 999));
        assert_eq!(resolve_range(Some("bytes=500-"), SIZE), partial(500, 999));
    }

    #[test]
    fn test_omitted_start_defaults_to_zero() {
        assert_eq!(resolve_range(Some("bytes=-499"), SIZE), partial(0, 499));
    }

    #[test]
    fn test_end_is_clamped() {
        assert_eq!(resolve_range(Some("bytes=900-5000"), SIZE), partial(900, 999));
    }

    #[test]
    fn test_whitespace_and_case_tolerated() {
        assert_eq!(resolve_range(Some(" Bytes = 10 - 20 "), SIZE), partial(10, 20));
    }

    #[test]
    fn test_malformed_falls_back_to_full() {
        for header in [
            "bytes",
            "bytes=",
            "bytes=-",
            "bytes=abc-def",
            "bytes=1-x",
            "items=0-10",
            "bytes=0-10,20-30",
            "0-10",
        ] {
            assert_eq!(resolve_range(Some(header), SIZE), Ok(RangeRequest::Full), "{header}");
        }
    }

    #[test]
    fn test_unsatisfiable() {
        assert_eq!(
            resolve_range(Some("bytes=1000-"), SIZE),
            Err(RangeError::StartBeyondEnd {
                start: 1000,
                file_size: SIZE
            })
        );
        assert_eq!(
            resolve_range(Some("bytes=200-100"), SIZE),
            Err(RangeError::Inverted {
                start: 200,
                end: 100
            })
        );
        assert_eq!(resolve_range(Some("bytes=0-"), 0), Err(RangeError::EmptyFile));
        assert_eq!(unsatisfiable_content_range(SIZE), "bytes */1000");
    }

    #[test]
    fn test_empty_file_without_range_is_full() {
        assert_eq!(resolve_range(None, 0), Ok(RangeRequest::Full));
        assert_eq!(resolve_range(Some("garbage"), 0), Ok(RangeRequest::Full));
    }
}
