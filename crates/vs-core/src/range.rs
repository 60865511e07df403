//! Range resolution for partial-content playback.
//!
//! Every playback request must carry `Range: bytes=<start>-`. The resolver
//! ignores any explicit end offset and always answers with a window of at
//! most `max_chunk_bytes` starting at the requested offset, which makes the
//! client's media element walk the file with successive range requests.
//! Multi-range, suffix-range and `If-Range` are not supported.

use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};

/// Default ceiling on a single delivered window.
pub const DEFAULT_MAX_CHUNK_BYTES: u64 = 100_000;

/// An inclusive `[start, end]` slice of an asset of `total` bytes.
///
/// Invariant: `start <= end < total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteWindow {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteWindow {
    /// Number of bytes covered by the window.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }

    /// Whether this window reaches the final byte of the asset.
    pub fn is_last(&self) -> bool {
        self.end + 1 == self.total
    }

    /// Start offset of the window that follows this one, if any.
    pub fn next_start(&self) -> Option<u64> {
        (!self.is_last()).then_some(self.end + 1)
    }
}

impl fmt::Display for ByteWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.start, self.end, self.total)
    }
}

/// `Content-Range` value sent with a 416 response.
pub fn unsatisfied_content_range(total: u64) -> String {
    format!("bytes */{total}")
}

/// Extract the start offset from a `Range` header value.
///
/// Accepts `bytes=<start>-` and `bytes=<start>-<end>`; the end offset is
/// checked for syntax only.
pub fn parse_range_start(header: Option<&str>) -> Result<u64> {
    let value = header.ok_or(Error::MissingRange)?.trim();

    let (unit, spec) = value
        .split_once('=')
        .ok_or_else(|| Error::MalformedRange(format!("missing unit in {value:?}")))?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(Error::MalformedRange(format!("unsupported unit {unit:?}")));
    }
    if spec.contains(',') {
        return Err(Error::MalformedRange("multiple ranges are not supported".into()));
    }

    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| Error::MalformedRange(format!("missing '-' in {value:?}")))?;
    let start = start.trim();
    let end = end.trim();

    if start.is_empty() {
        return Err(Error::MalformedRange(
            "suffix ranges are not supported".into(),
        ));
    }
    if !start.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedRange(format!("invalid start offset {start:?}")));
    }
    if !end.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedRange(format!("invalid end offset {end:?}")));
    }

    start
        .parse::<u64>()
        .map_err(|_| Error::MalformedRange(format!("start offset {start} overflows")))
}

/// Build the window served for `start` within an asset of `total` bytes.
pub fn window_from_start(start: u64, total: u64, max_chunk_bytes: u64) -> Result<ByteWindow> {
    if total == 0 {
        return Err(Error::EmptyAsset);
    }
    if start >= total {
        return Err(Error::UnsatisfiableRange { start, total });
    }
    let chunk = max_chunk_bytes.max(1);
    let end = start.saturating_add(chunk - 1).min(total - 1);
    Ok(ByteWindow { start, end, total })
}

/// Resolve a `Range` header against an asset size.
pub fn resolve(header: Option<&str>, total: u64, max_chunk_bytes: u64) -> Result<ByteWindow> {
    let start = parse_range_start(header)?;
    window_from_start(start, total, max_chunk_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = DEFAULT_MAX_CHUNK_BYTES;

    #[test]
    fn open_ended_from_zero() {
        let w = resolve(Some("bytes=0-"), 250_000, MAX).unwrap();
        assert_eq!(w, ByteWindow { start: 0, end: 99_999, total: 250_000 });
        assert_eq!(w.len(), 100_000);
        assert_eq!(w.content_range(), "bytes 0-99999/250000");
    }

    #[test]
    fn tail_window_is_clamped() {
        let w = resolve(Some("bytes=200000-"), 250_000, MAX).unwrap();
        assert_eq!(w.end, 249_999);
        assert_eq!(w.len(), 50_000);
        assert!(w.is_last());
        assert_eq!(w.next_start(), None);
    }

    #[test]
    fn explicit_end_is_ignored() {
        let w = resolve(Some("bytes=10-20"), 1_000_000, MAX).unwrap();
        assert_eq!(w.start, 10);
        assert_eq!(w.end, 10 + MAX - 1);
    }

    #[test]
    fn start_at_size_is_unsatisfiable() {
        let err = resolve(Some("bytes=250000-"), 250_000, MAX).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsatisfiableRange { start: 250_000, total: 250_000 }
        ));
    }

    #[test]
    fn window_matches_formula() {
        for total in [1u64, 2, 99_999, 100_000, 100_001, 250_000] {
            for start in [0, 1, total / 2, total - 1] {
                let w = window_from_start(start, total, MAX).unwrap();
                assert_eq!(w.end, (start + MAX - 1).min(total - 1));
                assert!(w.start <= w.end);
                assert!(w.len() <= MAX);
            }
            assert!(window_from_start(total, total, MAX).is_err());
            assert!(window_from_start(total + 7, total, MAX).is_err());
        }
    }

    #[test]
    fn single_byte_asset() {
        let w = resolve(Some("bytes=0-"), 1, MAX).unwrap();
        assert_eq!(w, ByteWindow { start: 0, end: 0, total: 1 });
    }

    #[test]
    fn empty_asset() {
        assert!(matches!(resolve(Some("bytes=0-"), 0, MAX), Err(Error::EmptyAsset)));
    }

    #[test]
    fn missing_header() {
        assert!(matches!(resolve(None, 10, MAX), Err(Error::MissingRange)));
    }

    #[test]
    fn malformed_headers() {
        for bad in [
            "",
            "bytes",
            "bytes=",
            "bytes=-",
            "bytes=-500",
            "bytes=abc-",
            "bytes=1-abc",
            "bytes=0-1,5-6",
            "items=0-",
            "bytes=99999999999999999999999-",
        ] {
            assert!(
                matches!(parse_range_start(Some(bad)), Err(Error::MalformedRange(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn parse_is_lenient_about_case_and_whitespace() {
        assert_eq!(parse_range_start(Some(" Bytes= 42 - ")).unwrap(), 42);
    }

    #[test]
    fn malformed_checked_before_size() {
        // A bad header on an empty asset still reports the header problem.
        assert!(matches!(
            resolve(Some("bytes=x-"), 0, MAX),
            Err(Error::MalformedRange(_))
        ));
    }

    #[test]
    fn chunk_ceiling_of_zero_still_serves_a_byte() {
        let w = window_from_start(5, 10, 0).unwrap();
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn unsatisfied_header() {
        assert_eq!(unsatisfied_content_range(250_000), "bytes */250000");
    }

    #[test]
    fn successive_windows_tile_the_asset() {
        let total = 250_000;
        let mut start = 0;
        let mut covered = 0;
        loop {
            let w = window_from_start(start, total, MAX).unwrap();
            assert_eq!(w.start, covered);
            covered += w.len();
            match w.next_start() {
                Some(next) => start = next,
                None => break,
            }
        }
        assert_eq!(covered, total);
    }
}
