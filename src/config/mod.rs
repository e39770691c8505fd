// Configuration module entry point
// Loads configuration and holds the per-process serving state

mod options;
mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ConfigError;

// Re-export public types
pub use options::ServeOptions;
pub use state::AppState;
pub use types::{Config, LoggingConfig, ServeConfig, ServerConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_FILE: &str = "devhost";

/// Environment variable prefix, e.g. `DEVHOST_SERVE__CORS=true`
pub const ENV_PREFIX: &str = "DEVHOST";

impl Config {
    /// Load configuration from the default file, the environment and an
    /// optional root override (positional command-line argument)
    pub fn load(root_override: Option<String>) -> Result<Self, ConfigError> {
        let path = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path, root_override)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str, root_override: Option<String>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 9000)?
            .set_default("server.strict_port", false)?
            .set_default("server.bind_all", false)?
            .set_default("server.keep_alive", true)?
            .set_default("serve.root", ".")?
            .set_default("serve.cors", false)?
            .set_default("serve.serve_symlink_targets", false)?
            .set_default("serve.serve_hidden", false)?
            .set_default("serve.listing", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_override_option("serve.root", root_override)?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = if self.server.bind_all {
            "0.0.0.0"
        } else {
            self.server.host.as_str()
        };
        format!("{host}:{}", self.server.port)
            .parse()
            .map_err(|e| ConfigError::Address(format!("{host}:{}: {e}", self.server.port)))
    }
}
