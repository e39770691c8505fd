//! HTTP response building module
//!
//! Body types, the never-cache default headers, and builders for the
//! status-only responses the server produces.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, EXPIRES,
    LOCATION, X_CONTENT_TYPE_OPTIONS,
};
use hyper::{Response, StatusCode};
use std::io;

/// Response body: either a buffer or a file stream
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Body holding a complete buffer
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Body with no content
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Headers applied to every response
///
/// A development server must never be cached by the browser.
#[derive(Debug, Clone, Copy)]
pub struct DefaultHeaders {
    cors: bool,
}

impl DefaultHeaders {
    pub const fn new(cors: bool) -> Self {
        Self { cors }
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        if self.cors {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
    }
}

/// Build an empty-bodied response with just a status
pub fn build_status_response(status: StatusCode) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(empty())
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, "GET, HEAD, OPTIONS")
        .header(CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(empty())
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, "GET, HEAD, OPTIONS");

    if enable_cors {
        builder = builder
            .header(ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD, OPTIONS")
            .header(ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Range");
    }

    builder.body(empty()).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(empty())
    })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_RANGE, format!("bytes */{file_size}"))
        .header(CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(empty())
        })
}

/// Build 302 redirect response
pub fn build_redirect_response(location: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("302", &e);
            Response::new(empty())
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
