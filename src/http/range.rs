//! HTTP Range request parsing module
//!
//! Single byte-range parsing for resumable downloads (RFC 7233 subset).
//! Multi-range requests are rejected rather than served as multipart.

/// Satisfiable byte interval into a resource of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset (inclusive)
    pub start: u64,
    /// One past the last byte offset (exclusive)
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// `Content-Range` header value, e.g. `bytes 0-127/128`
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end - 1)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Valid single range
    Valid(ByteRange),
    /// Malformed, multi-range or out of bounds - should return 416
    Invalid,
    /// No Range header, serve the full content
    Absent,
}

/// Parse HTTP Range header (single range only, bytes unit)
///
/// Supported formats:
/// - `bytes=start-end` - Inclusive end, clamped to the file size
/// - `bytes=start-` - From start to end of file
/// - `bytes=-suffix` - Last suffix bytes
///
/// # Examples
/// ```
/// use devhost::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// let result = parse_range_header(Some("bytes=0-99"), 1000);
/// assert_eq!(result, RangeParseResult::Valid(ByteRange { start: 0, end: 100 }));
///
/// let result = parse_range_header(None, 1000);
/// assert_eq!(result, RangeParseResult::Absent);
/// ```
pub fn parse_range_header(range_header: Option<&str>, known_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::Absent;
    };

    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return RangeParseResult::Invalid;
    };

    if spec.contains(',') {
        return RangeParseResult::Invalid;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeParseResult::Invalid;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let range = match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => return RangeParseResult::Invalid,
        (true, false) => parse_suffix_range(end_str, known_size),
        (false, true) => parse_number(start_str).map(|start| ByteRange {
            start: start.min(known_size),
            end: known_size,
        }),
        (false, false) => parse_number(start_str)
            .zip(parse_number(end_str))
            .map(|(start, end)| ByteRange {
                start: start.min(known_size),
                end: end.saturating_add(1).min(known_size),
            }),
    };

    // An empty interval has no valid `Content-Range` representation
    match range {
        Some(r) if r.start < r.end => RangeParseResult::Valid(r),
        _ => RangeParseResult::Invalid,
    }
}

/// Suffix range (e.g. "-500" means the last 500 bytes)
fn parse_suffix_range(suffix_str: &str, known_size: u64) -> Option<ByteRange> {
    let suffix = parse_number(suffix_str)?;
    Some(ByteRange {
        start: known_size.saturating_sub(suffix),
        end: known_size,
    })
}

/// Digits only; `u64::from_str` would also accept a leading `+`
fn parse_number(s: &str) -> Option<u64> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}
