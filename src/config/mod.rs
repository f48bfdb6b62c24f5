//! Runtime configuration for the harvester.
//!
//! Everything comes from environment variables with development defaults,
//! except the relational store DSN which is only needed by `replicate`.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ENV_DOCUMENT_STORE_URL: &str = "DOCUMENT_STORE_URL";
pub const ENV_POSTGRES_DSN: &str = "POSTGRES_DSN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

const DEFAULT_DOCUMENT_STORE_URL: &str = "sqlite://articles.db?mode=rwc";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    document_store_url: String,
    postgres_dsn: Option<String>,
    http_timeout: Duration,
}

impl Config {
    pub fn new(
        document_store_url: impl Into<String>,
        postgres_dsn: Option<String>,
        http_timeout: Duration,
    ) -> Self {
        Self {
            document_store_url: document_store_url.into(),
            postgres_dsn,
            http_timeout,
        }
    }

    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let document_store_url = env::var(ENV_DOCUMENT_STORE_URL)
            .unwrap_or_else(|_| DEFAULT_DOCUMENT_STORE_URL.to_string());
        let postgres_dsn = env::var(ENV_POSTGRES_DSN)
            .ok()
            .filter(|dsn| !dsn.trim().is_empty());
        let http_timeout = match env::var(ENV_HTTP_TIMEOUT_SECS) {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            document_store_url,
            postgres_dsn,
            http_timeout,
        })
    }

    /// Where crawled articles are upserted (sqlx SQLite URL).
    pub fn document_store_url(&self) -> &str {
        &self.document_store_url
    }

    pub fn postgres_dsn(&self) -> Option<&str> {
        self.postgres_dsn.as_deref()
    }

    /// The relational store DSN, or an error naming the missing variable.
    pub fn require_postgres_dsn(&self) -> Result<&str, ConfigError> {
        self.postgres_dsn().ok_or(ConfigError::Missing {
            field: ENV_POSTGRES_DSN,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_DOCUMENT_STORE_URL,
            None,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            field: ENV_HTTP_TIMEOUT_SECS,
            reason: format!("expected a positive number of seconds, got {raw:?}"),
        }),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
    Missing { field: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
            ConfigError::Missing { field } => write!(f, "'{}' is not set", field),
        }
    }
}

impl Error for ConfigError {}
