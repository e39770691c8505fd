//! Request handler module
//!
//! The static-file pipeline, its file transfer, and the hyper-facing router.

pub mod pipeline;
pub mod router;
pub mod transfer;

// Re-export main entry points
pub use pipeline::{BodySource, PipelineRequest, ServePlan, StaticHandler};
pub use router::handle_request;
