//! Request path helpers
//!
//! Percent-decoding, POSIX normalization and the relative-URL arithmetic used
//! to build redirect targets.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path};

/// Characters escaped when a decoded path is put back into a `Location` header
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URI delimiters whose escapes survive decoding (`%2F` is not a separator)
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

/// Decode percent-escapes in the path component of a request URI
///
/// Escapes of reserved delimiters are kept as written, so `/a%2Fb` names the
/// single segment `a%2Fb`. Returns `None` when the escapes do not form
/// valid UTF-8.
pub fn decode_request_path(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut chunk_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let reserved = bytes[i] == b'%'
            && raw
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .is_some_and(|b| URI_RESERVED.contains(&b));
        if reserved {
            decoded.extend(percent_decode_str(&raw[chunk_start..i]));
            decoded.extend_from_slice(&bytes[i..i + 3]);
            i += 3;
            chunk_start = i;
        } else {
            i += 1;
        }
    }
    decoded.extend(percent_decode_str(&raw[chunk_start..]));
    String::from_utf8(decoded).ok()
}

/// POSIX-normalize an absolute URL path
///
/// Collapses repeated slashes, drops `.` segments and resolves `..` segments,
/// never climbing above `/`. A trailing slash is kept.
///
/// # Examples
/// ```
/// use devhost::http::path::normalize_posix;
/// assert_eq!(normalize_posix("/a//b/../c/"), "/a/c/");
/// assert_eq!(normalize_posix("/../../etc/passwd"), "/etc/passwd");
/// assert_eq!(normalize_posix("/"), "/");
/// ```
pub fn normalize_posix(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    normalized.push('/');
    normalized.push_str(&segments.join("/"));

    if path.ends_with('/') && !segments.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Whether any segment of the path names a hidden (dot) file
pub fn has_hidden_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

/// Last non-empty segment of a URL path
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Relative URL leading from directory `from` to `to`
///
/// Both paths are expected to be absolute and free of `.`/`..` components.
/// Returns an empty string when they are the same location.
pub fn relative_url(from: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

/// Percent-encode a decoded path (and optional query) for use in `Location`
pub fn encode_location(path: &str, query: Option<&str>) -> String {
    let mut location = utf8_percent_encode(path, LOCATION).to_string();
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        location.push('?');
        location.push_str(q);
    }
    location
}
