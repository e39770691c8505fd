//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Leveled error, warning, info and debug logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::{AccessLogEntry, LogFormat};

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use crate::config::LoggingConfig;

/// Log level, ordered from least to most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "trace" => Ok(Self::Debug),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup. An unknown level falls
/// back to `info` with a warning.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let level = config.level.parse().unwrap_or_else(|e| {
        eprintln!("[WARN] {e}, using info");
        Level::Info
    });
    writer::init(
        level,
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
}

fn enabled(level: Level) -> bool {
    writer::get().map_or(Level::Info, writer::LogWriter::level) >= level
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, root: &Path, workers: Option<usize>) {
    write_info("======================================");
    write_info(&format!("Serving {}", root.display()));
    write_info(&format!("Local: http://{addr}/"));
    if let Some(workers) = workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    write_info("Press Ctrl+C to stop");
    write_info("======================================\n");
}

pub fn log_port_in_use(addr: &SocketAddr) {
    log_info(&format!("Port {} is in use, trying another one...", addr.port()));
}

pub fn log_shutdown(signal: &str) {
    write_info(&shutdown_message(signal));
}

fn shutdown_message(signal: &str) -> String {
    format!("\n[Shutdown] {signal} received, stopping server")
}

pub fn log_connection_error(err: &impl fmt::Debug) {
    if enabled(Level::Error) {
        write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
    }
}

pub fn log_error(message: &str) {
    if enabled(Level::Error) {
        write_error(&format!("[ERROR] {message}"));
    }
}

pub fn log_warning(message: &str) {
    if enabled(Level::Warn) {
        write_error(&format!("[WARN] {message}"));
    }
}

pub fn log_info(message: &str) {
    if enabled(Level::Info) {
        write_info(&format!("[INFO] {message}"));
    }
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        write_info(&format!("[DEBUG] {message}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &LogFormat) {
    write_access(&entry.format(format));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("INFO".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("trace".parse::<Level>().unwrap(), Level::Debug);
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_shutdown_message_names_the_signal() {
        let msg = shutdown_message("SIGTERM");
        assert!(msg.contains("SIGTERM received"));
        assert!(!msg.contains("Ctrl+C"));
    }

    #[test]
    fn test_level_order() {
        assert!(Level::Debug > Level::Info);
        assert!(Level::Warn > Level::Error);
        assert_eq!(Level::Warn.to_string(), "warn");
    }
}
