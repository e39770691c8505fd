// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub serve: ServeConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Fail instead of trying the next port when `port` is taken
    #[serde(default)]
    pub strict_port: bool,
    /// Listen on all interfaces instead of `host`
    #[serde(default)]
    pub bind_all: bool,
    /// Runtime worker threads (CPU cores when unset)
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_true")]
    pub keep_alive: bool,
}

/// What to serve and how
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServeConfig {
    /// Directory to serve, resolved at startup
    pub root: String,
    /// Send `Access-Control-Allow-Origin: *`
    #[serde(default)]
    pub cors: bool,
    /// Serve symlink targets directly, even outside the root (unsafe)
    #[serde(default)]
    pub serve_symlink_targets: bool,
    /// Serve paths with segments starting with `.`
    #[serde(default)]
    pub serve_hidden: bool,
    /// Render HTML listings for directories without index.html
    #[serde(default = "default_true")]
    pub listing: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            access_log_format: default_access_log_format(),
            access_log_file: None,
            error_log_file: None,
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            cors: false,
            serve_symlink_targets: false,
            serve_hidden: false,
            listing: true,
        }
    }
}
