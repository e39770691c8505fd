//! Error types
//!
//! `ServeError` is the per-request taxonomy produced by the request pipeline,
//! `ConfigError` covers startup validation.

use hyper::StatusCode;
use std::io;
use thiserror::Error;

/// Outcome of a request that did not produce a servable response plan
#[derive(Debug, Error)]
pub enum ServeError {
    /// Decoded request path was malformed or not absolute
    #[error("malformed request path: {0}")]
    ClientPath(String),

    /// Resolved path (or a symlink on the way) leaves the serving root
    #[error("path escapes serving root: {0}")]
    Containment(String),

    /// Nothing to serve; the caller decides on the fallback (usually 404)
    #[error("not found")]
    NotFound,

    /// Range header was malformed, multi-range or out of bounds
    #[error("range not satisfiable for {size}-byte resource")]
    RangeUnsatisfiable { size: u64 },

    /// I/O failure while producing the response body
    #[error("transfer failed: {0}")]
    Transfer(#[from] io::Error),
}

impl ServeError {
    /// HTTP status this error is reported with
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ClientPath(_) => StatusCode::BAD_REQUEST,
            Self::Containment(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RangeUnsatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Transfer(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Startup configuration failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("serving root '{path}' is not accessible: {source}")]
    Root { path: String, source: io::Error },

    #[error("serving root '{0}' is not a directory")]
    RootNotDirectory(String),

    #[error("invalid listen address: {0}")]
    Address(String),
}
