// Application state module
// Immutable per-process state shared by every connection

use super::options::ServeOptions;
use super::types::LoggingConfig;
use crate::handler::StaticHandler;
use crate::logger::LogFormat;

/// Application state
pub struct AppState {
    pub handler: StaticHandler,
    pub access_log: bool,
    pub access_log_format: LogFormat,
    pub keep_alive: bool,
}

impl AppState {
    pub fn new(options: ServeOptions, logging: &LoggingConfig) -> Self {
        Self {
            handler: StaticHandler::new(options),
            access_log: logging.access_log,
            access_log_format: LogFormat::from(logging.access_log_format.as_str()),
            keep_alive: true,
        }
    }

    #[must_use]
    pub const fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}
