//! Lazily constructed rewriter
//!
//! Heavy rewriters (source transforms and the like) are built on first use.
//! Concurrent first requests wait on the same in-flight initialization, so
//! exactly one instance is ever constructed per `LazyRewriter`.

use super::{RewriteArgs, RewriteOutput, Rewriter};
use crate::logger;
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;

type InitFuture = Pin<Box<dyn Future<Output = io::Result<Arc<dyn Rewriter>>> + Send>>;
type InitFn = Box<dyn Fn() -> InitFuture + Send + Sync>;
type Predicate = Box<dyn Fn(&RewriteArgs<'_>) -> bool + Send + Sync>;

/// Rewriter whose real implementation is built once, on first matching request
pub struct LazyRewriter {
    name: &'static str,
    init: InitFn,
    applies: Predicate,
    shared: OnceCell<Arc<dyn Rewriter>>,
}

impl LazyRewriter {
    /// `init` builds the inner rewriter; it runs at most once successfully
    pub fn new<F, Fut>(name: &'static str, init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = io::Result<Arc<dyn Rewriter>>> + Send + 'static,
    {
        Self {
            name,
            init: Box::new(move || -> InitFuture { Box::pin(init()) }),
            applies: Box::new(always),
            shared: OnceCell::new(),
        }
    }

    /// Only initialize (and consult) the inner rewriter when `predicate` holds
    #[must_use]
    pub fn only_for<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&RewriteArgs<'_>) -> bool + Send + Sync + 'static,
    {
        self.applies = Box::new(predicate);
        self
    }

    /// Whether the inner rewriter has been built yet
    pub fn is_initialized(&self) -> bool {
        self.shared.initialized()
    }

    async fn instance(&self) -> io::Result<&Arc<dyn Rewriter>> {
        self.shared.get_or_try_init(|| (self.init)()).await
    }
}

const fn always(_: &RewriteArgs<'_>) -> bool {
    true
}

#[async_trait]
impl Rewriter for LazyRewriter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn rewrite(&self, args: &RewriteArgs<'_>) -> Option<RewriteOutput> {
        if !(self.applies)(args) {
            return None;
        }
        match self.instance().await {
            Ok(inner) => inner.rewrite(args).await,
            Err(e) => {
                // Left uninitialized so a later request retries
                logger::log_error(&format!("Failed to initialize rewriter '{}': {e}", self.name));
                None
            }
        }
    }
}
