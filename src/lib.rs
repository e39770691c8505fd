//! Secure local development server for static files
//!
//! Serves a directory over HTTP/1.1 with symlink containment, single byte
//! ranges, canonical-URL redirects and a chain of content rewriters.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod resolve;
pub mod rewrite;
pub mod server;
