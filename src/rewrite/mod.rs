//! Content rewriters
//!
//! A rewriter may substitute computed content for a request instead of the raw
//! file bytes. Rewriters are consulted in registration order once directory and
//! index resolution is complete; the first one that returns output wins.

mod lazy;
pub mod listing;

pub use lazy::LazyRewriter;
pub use listing::DirectoryListing;

use crate::resolve::FileMeta;
use async_trait::async_trait;
use hyper::body::Bytes;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// What a rewriter gets to look at
#[derive(Debug, Clone, Copy)]
pub struct RewriteArgs<'a> {
    /// Metadata snapshot of the target, `None` if it does not exist
    pub meta: Option<FileMeta>,
    /// Resolved filesystem path (after index.html substitution)
    pub resolved_path: &'a Path,
    /// Decoded request path as observed by the server
    pub request_path: &'a str,
    /// Query string including the leading `?`, or empty
    pub search: &'a str,
}

impl RewriteArgs<'_> {
    pub fn exists(&self) -> bool {
        self.meta.is_some()
    }

    pub fn is_dir(&self) -> bool {
        self.meta.is_some_and(|m| m.is_dir())
    }

    pub fn is_file(&self) -> bool {
        self.meta.is_some_and(|m| m.is_file())
    }
}

/// Content produced by a rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutput {
    pub content: Bytes,
    /// Explicit media type; inferred from the file name when `None`
    pub content_type: Option<String>,
}

impl RewriteOutput {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Pluggable content transform
///
/// Returning `None` means "not mine", and the next rewriter is asked.
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn rewrite(&self, args: &RewriteArgs<'_>) -> Option<RewriteOutput>;
}

/// Ordered list of rewriters, first match wins
#[derive(Clone, Default)]
pub struct RewriterChain {
    rewriters: Vec<Arc<dyn Rewriter>>,
}

impl RewriterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rewriter after the ones already registered
    pub fn push(&mut self, rewriter: Arc<dyn Rewriter>) {
        self.rewriters.push(rewriter);
    }

    pub fn len(&self) -> usize {
        self.rewriters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewriters.is_empty()
    }

    /// Ask each rewriter in order; returns the winner's name and output
    pub async fn apply(&self, args: &RewriteArgs<'_>) -> Option<(&'static str, RewriteOutput)> {
        for rewriter in &self.rewriters {
            if let Some(output) = rewriter.rewrite(args).await {
                return Some((rewriter.name(), output));
            }
        }
        None
    }
}

impl fmt::Debug for RewriterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rewriters.iter().map(|r| r.name()))
            .finish()
    }
}
