//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, the static
//! pipeline, the status fallbacks for errors, default headers and the
//! access log.

use hyper::header::{
    HeaderMap, HeaderName, CONTENT_LENGTH, LOCATION, RANGE, REFERER, USER_AGENT,
};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::pipeline::PipelineRequest;
use super::transfer;
use crate::config::AppState;
use crate::error::ServeError;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
///
/// Never fails: every error is turned into a status response.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    // The body of a GET/HEAD request is never read
    let parts = req.into_parts().0;

    let mut response = match check_http_method(&parts.method, state.handler.options().cors) {
        Some(resp) => resp,
        None => serve_static(&state, &parts).await,
    };
    state
        .handler
        .default_headers()
        .apply(response.headers_mut());

    if state.access_log {
        let entry = access_entry(&parts, &response, peer, started);
        logger::log_access(&entry, &state.access_log_format);
    }
    Ok(response)
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<ResponseBody>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        &Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

async fn serve_static(state: &AppState, parts: &Parts) -> Response<ResponseBody> {
    let path = parts.uri.path();
    let req = PipelineRequest {
        method: &parts.method,
        path,
        query: parts.uri.query(),
        // A present but non-ASCII value must still parse as an invalid range
        range: parts
            .headers
            .get(RANGE)
            .map(|v| v.to_str().unwrap_or_default()),
    };

    let result = match state.handler.plan(&req).await {
        Ok(plan) => transfer::into_response(plan).await,
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| error_response(&e, path))
}

/// Map a pipeline error onto its status response
fn error_response(err: &ServeError, path: &str) -> Response<ResponseBody> {
    match err {
        ServeError::RangeUnsatisfiable { size } => http::build_416_response(*size),
        ServeError::Transfer(e) => {
            logger::log_error(&format!("Transfer of {path} failed: {e}"));
            http::build_status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
        ServeError::ClientPath(_) | ServeError::Containment(_) | ServeError::NotFound => {
            http::build_status_response(err.status())
        }
    }
}

fn access_entry(
    parts: &Parts,
    response: &Response<ResponseBody>,
    peer: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = header_str(response.headers(), CONTENT_LENGTH)
        .and_then(|len| len.parse().ok())
        .unwrap_or_default();
    entry.referer = header_str(&parts.headers, REFERER).map(ToString::to_string);
    entry.user_agent = header_str(&parts.headers, USER_AGENT).map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    if response.status().is_redirection() {
        entry.location = header_str(response.headers(), LOCATION).map(ToString::to_string);
    }
    entry
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_http_method() {
        assert!(check_http_method(&Method::GET, false).is_none());
        assert!(check_http_method(&Method::HEAD, false).is_none());
        assert_eq!(
            check_http_method(&Method::OPTIONS, true).unwrap().status(),
            StatusCode::NO_CONTENT
        );
        let resp = check_http_method(&Method::POST, false).unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["allow"], "GET, HEAD, OPTIONS");
    }

    #[test]
    fn test_error_response() {
        let resp = error_response(&ServeError::Containment("/a/x".into()), "/a/x");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "0");

        let resp = error_response(&ServeError::RangeUnsatisfiable { size: 7 }, "/f");
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()["content-range"], "bytes */7");

        let resp = error_response(&ServeError::ClientPath("%ff".into()), "/%ff");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_access_entry_records_redirect() {
        let (parts, ()) = Request::get("/docs?x=1")
            .header(USER_AGENT, "curl/8")
            .body(())
            .unwrap()
            .into_parts();
        let response = http::build_redirect_response("docs/?x=1");
        let peer = "127.0.0.1:5000".parse().unwrap();
        let entry = access_entry(&parts, &response, peer, Instant::now());
        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(entry.path, "/docs");
        assert_eq!(entry.query.as_deref(), Some("x=1"));
        assert_eq!(entry.status, 302);
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(entry.location.as_deref(), Some("docs/?x=1"));
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(Version::HTTP_10), "1.0");
        assert_eq!(version_label(Version::HTTP_11), "1.1");
    }
}
