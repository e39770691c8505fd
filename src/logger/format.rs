//! Access log format module
//!
//! The format is chosen once at startup (`logging.access_log_format`):
//! - `combined`: Common Log Format plus referer, user agent and the redirect target
//! - `common`: Common Log Format
//! - `json`: one JSON object per request
//! - anything else: a pattern with `$variable` placeholders

use chrono::{DateTime, Local};
use serde_json::json;
use std::fmt::Write;

/// Parsed `logging.access_log_format`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Combined,
    Common,
    Json,
    Pattern(String),
}

impl From<&str> for LogFormat {
    fn from(name: &str) -> Self {
        match name {
            "combined" => Self::Combined,
            "common" => Self::Common,
            "json" => Self::Json,
            pattern => Self::Pattern(pattern.to_string()),
        }
    }
}

/// One served request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    /// Raw request path, before decoding
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    /// `Content-Length` of the response
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
    /// Redirect target, set for 3xx responses only
    pub location: Option<String>,
}

impl AccessLogEntry {
    /// Entry stamped with the current local time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
            location: None,
        }
    }

    pub fn format(&self, format: &LogFormat) -> String {
        match format {
            LogFormat::Common => self.clf(),
            LogFormat::Combined => {
                let mut line = self.clf();
                let _ = write!(
                    line,
                    " \"{}\" \"{}\"",
                    dash(self.referer.as_deref()),
                    dash(self.user_agent.as_deref())
                );
                if let Some(location) = &self.location {
                    let _ = write!(line, " -> {location}");
                }
                line
            }
            LogFormat::Json => self.json(),
            LogFormat::Pattern(pattern) => self.expand(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn time_local(&self) -> String {
        self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn clf(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time_local(),
            self.method,
            self.request_uri(),
            self.http_version,
            self.status,
            self.body_bytes,
        )
    }

    fn json(&self) -> String {
        json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
            "location": self.location,
        })
        .to_string()
    }

    /// Value of a pattern variable, `None` for unknown names
    fn variable(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time_local(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => format!(
                "{} {} HTTP/{}",
                self.method,
                self.request_uri(),
                self.http_version
            ),
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => dash(self.referer.as_deref()).to_string(),
            "http_user_agent" => dash(self.user_agent.as_deref()).to_string(),
            "request_time" => format!(
                "{}.{:03}",
                self.request_time_us / 1_000_000,
                self.request_time_us % 1_000_000 / 1_000
            ),
            "location" => dash(self.location.as_deref()).to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Replace each `$name` (longest run of `[a-z0-9_]`); unknown names stay verbatim
    fn expand(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..len];
            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }
}

fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_request() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "/docs/".to_string(),
        );
        entry.query = Some("sort=name".to_string());
        entry.body_bytes = 512;
        entry.referer = Some("http://localhost:9000/".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 2_345;
        entry
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from("combined"), LogFormat::Combined);
        assert_eq!(LogFormat::from("json"), LogFormat::Json);
        assert_eq!(
            LogFormat::from("$status"),
            LogFormat::Pattern("$status".to_string())
        );
    }

    #[test]
    fn test_common_and_combined() {
        let entry = listing_request();
        let common = entry.format(&LogFormat::Common);
        assert!(common.starts_with("127.0.0.1 - - ["));
        assert!(common.ends_with("\"GET /docs/?sort=name HTTP/1.1\" 200 512"));

        let combined = entry.format(&LogFormat::Combined);
        assert!(combined.starts_with(&common));
        assert!(combined.ends_with("\"http://localhost:9000/\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_redirect_target() {
        let mut entry = listing_request();
        entry.path = "/docs".to_string();
        entry.status = 302;
        entry.location = Some("docs/?sort=name".to_string());
        assert!(entry
            .format(&LogFormat::Combined)
            .ends_with(" -> docs/?sort=name"));
        assert!(!entry.format(&LogFormat::Common).contains("->"));
    }

    #[test]
    fn test_json() {
        let mut entry = listing_request();
        entry.user_agent = Some("quote \" and \\ slash".to_string());
        entry.referer = None;
        let value: serde_json::Value =
            serde_json::from_str(&entry.format(&LogFormat::Json)).unwrap();
        assert_eq!(value["path"], "/docs/");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 512);
        assert_eq!(value["user_agent"], "quote \" and \\ slash");
        assert!(value["referer"].is_null());
        assert!(value["location"].is_null());
    }

    #[test]
    fn test_pattern() {
        let mut entry = listing_request();
        entry.status = 302;
        entry.location = Some("docs/".to_string());
        let format = LogFormat::from("$request_method $request_uri $status $location $request_time");
        assert_eq!(
            entry.format(&format),
            "GET /docs/?sort=name 302 docs/ 0.002"
        );
    }

    #[test]
    fn test_pattern_keeps_unknown_and_prefix_names() {
        let entry = listing_request();
        let format = LogFormat::from("$request_method:$nope:$status$");
        assert_eq!(entry.format(&format), "GET:$nope:200$");
        // `$request` is not mistaken for a prefix of `$request_time`
        assert_eq!(
            entry.format(&LogFormat::from("[$request]")),
            "[GET /docs/?sort=name HTTP/1.1]"
        );
    }
}
