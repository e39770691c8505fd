//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! request pipeline: range parsing, media types, path helpers and responses.

pub mod mime;
pub mod path;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{parse_range_header, ByteRange, RangeParseResult};
pub use response::{
    build_405_response, build_416_response, build_options_response, build_redirect_response,
    build_status_response, DefaultHeaders, ResponseBody,
};
