// Validated serving options
// Built once at startup from `ServeConfig`; immutable afterwards

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::ServeConfig;
use crate::error::ConfigError;
use crate::rewrite::{DirectoryListing, Rewriter, RewriterChain};

/// Serving options with a canonical root
///
/// Defaults: CORS off, symlink containment on, hidden files refused,
/// directory listing on, no extra rewriters.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    root: PathBuf,
    pub cors: bool,
    pub serve_symlink_targets: bool,
    pub serve_hidden: bool,
    pub listing: bool,
    rewriters: RewriterChain,
}

impl ServeOptions {
    /// Options for `root` with defaults; the root must be an existing directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        // Resolves symlinks in the serving path itself
        let canonical = std::fs::canonicalize(root).map_err(|source| ConfigError::Root {
            path: root.display().to_string(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(ConfigError::RootNotDirectory(canonical.display().to_string()));
        }

        Ok(Self {
            root: canonical,
            cors: false,
            serve_symlink_targets: false,
            serve_hidden: false,
            listing: true,
            rewriters: RewriterChain::new(),
        })
    }

    pub fn from_config(config: &ServeConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(&config.root)?
            .with_cors(config.cors)
            .with_serve_symlink_targets(config.serve_symlink_targets)
            .with_serve_hidden(config.serve_hidden)
            .with_listing(config.listing))
    }

    /// Canonical serving root
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn with_cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    #[must_use]
    pub const fn with_serve_symlink_targets(mut self, enabled: bool) -> Self {
        self.serve_symlink_targets = enabled;
        self
    }

    #[must_use]
    pub const fn with_serve_hidden(mut self, enabled: bool) -> Self {
        self.serve_hidden = enabled;
        self
    }

    #[must_use]
    pub const fn with_listing(mut self, enabled: bool) -> Self {
        self.listing = enabled;
        self
    }

    /// Register a rewriter; consulted in registration order
    #[must_use]
    pub fn with_rewriter(mut self, rewriter: Arc<dyn Rewriter>) -> Self {
        self.rewriters.push(rewriter);
        self
    }

    /// Registered rewriters followed by the directory listing, if enabled
    pub fn rewriter_chain(&self) -> RewriterChain {
        let mut chain = self.rewriters.clone();
        if self.listing {
            chain.push(Arc::new(DirectoryListing::new(self.serve_hidden)));
        }
        chain
    }
}
