//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default `0.0.0.0`) and `PORT` (default `8080`)
/// - `RUST_LOG` (default `info`) and `LOG_FORMAT` (`pretty` or `json`)
/// - `DATABASE_URL`: Postgres connection string; unset means the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` (default `10`)
/// - `DIAGRAM_SERVICE_URL` (default `http://localhost:3001/api`)
/// - `DIAGRAM_TIMEOUT_SECS` (default `10`)
/// - `COMPENSATION_TIMEOUT_SECS` (default `5`)
/// - `REQUEST_TIMEOUT_SECS` (default `30`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub diagram_service_url: String,
    pub diagram_timeout: Duration,
    pub compensation_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            diagram_service_url: lookup("DIAGRAM_SERVICE_URL")
                .unwrap_or(defaults.diagram_service_url),
            diagram_timeout: secs("DIAGRAM_TIMEOUT_SECS", defaults.diagram_timeout),
            compensation_timeout: secs("COMPENSATION_TIMEOUT_SECS", defaults.compensation_timeout),
            request_timeout: secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 10,
            diagram_service_url: "http://localhost:3001/api".to_string(),
            diagram_timeout: Duration::from_secs(10),
            compensation_timeout: saga::DEFAULT_COMPENSATION_TIMEOUT,
            request_timeout: Duration::from_secs(30),
        }
    }
}
