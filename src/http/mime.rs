//! MIME type detection module
//!
//! Maps a file name to its media type by extension. Unknown extensions yield
//! `None` so that no `Content-Type` is sent and the client decides.

use std::path::Path;

/// Media type for a file name, based on its extension
///
/// # Examples
/// ```
/// use devhost::http::mime::mime_of;
/// use std::path::Path;
/// assert_eq!(mime_of(Path::new("index.html")), Some("text/html"));
/// assert_eq!(mime_of(Path::new("app.ts")), Some("application/x-typescript"));
/// assert_eq!(mime_of(Path::new("LICENSE")), None);
/// ```
pub fn mime_of(filename: &Path) -> Option<&'static str> {
    let extension = filename.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" | "text" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",

        // JavaScript/WASM
        "js" | "mjs" | "cjs" => "application/javascript",
        "ts" => "application/x-typescript",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",

        // Audio
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",

        _ => return None,
    };
    Some(mime)
}

/// `Content-Type` header value: the explicit type if given, else inferred from the name
///
/// `text/*` types get `; charset=utf-8` appended.
pub fn content_type_for(filename: &Path, explicit: Option<&str>) -> Option<String> {
    let mime = explicit.or_else(|| mime_of(filename))?;
    if mime.starts_with("text/") && !mime.contains("charset") {
        Some(format!("{mime}; charset=utf-8"))
    } else {
        Some(mime.to_string())
    }
}
