//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. A `.env` file in the
//! working directory is loaded first when present.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Number of messages requested from the queue per receive.
pub const RECEIVE_BATCH_SIZE: usize = 5;

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not found")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("error loading .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// AMQP connection string of the queue broker
    pub queue_url: String,

    /// Queue to consume messages from
    pub queue_name: String,

    /// Webhook every message body is POSTed to
    pub webhook_url: Url,

    /// Listen address of the admin HTTP surface
    pub http_listen: SocketAddr,

    /// Bearer token for outbound webhook calls and the `/post` sink
    pub bearer_token: Option<String>,

    /// Extra PEM CA bundle trusted for outbound TLS
    pub tls_ca_file: Option<PathBuf>,

    /// Admin-surface TLS certificate
    pub tls_cert_file: Option<PathBuf>,

    /// Admin-surface TLS private key
    pub tls_key_file: Option<PathBuf>,

    /// How long a receive waits for the first message of a batch
    pub receive_timeout: Duration,

    /// How long a receive keeps collecting once the first message arrived
    pub receive_linger: Duration,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::DotEnv(e)),
        }

        Self::from_vars()
    }

    /// Load configuration from already-set environment variables.
    pub fn from_vars() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name| env::var(name).ok())
    }

    /// Load configuration from any name-to-value lookup.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let webhook_raw = required(lookup, "WEBHOOK_URL")?;
        let webhook_url = Url::parse(&webhook_raw).map_err(|e| ConfigError::Invalid {
            name: "WEBHOOK_URL",
            reason: e.to_string(),
        })?;
        if !matches!(webhook_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: "WEBHOOK_URL",
                reason: format!("unsupported scheme {}", webhook_url.scheme()),
            });
        }

        let http_listen = required(lookup, "HTTP_LISTEN")?
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "HTTP_LISTEN",
                reason: e.to_string(),
            })?;

        Ok(Config {
            queue_url: required(lookup, "QUEUE_URL")?,
            queue_name: required(lookup, "QUEUE_NAME")?,
            webhook_url,
            http_listen,
            bearer_token: optional(lookup, "HTTP_BEARER_TOKEN"),
            tls_ca_file: optional(lookup, "TLS_CA_FILE").map(PathBuf::from),
            tls_cert_file: optional(lookup, "TLS_CERT_FILE").map(PathBuf::from),
            tls_key_file: optional(lookup, "TLS_KEY_FILE").map(PathBuf::from),
            receive_timeout: parse_millis(lookup, "RECEIVE_TIMEOUT_MS", 60_000)?,
            receive_linger: parse_millis(lookup, "RECEIVE_LINGER_MS", 100)?,
        })
    }

    /// Certificate and key for the admin server.
    ///
    /// HTTPS needs both; with only one of them set the admin server stays on
    /// plain HTTP.
    pub fn admin_tls(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    /// Host of the queue broker, without credentials, for logging.
    pub fn queue_host(&self) -> Option<String> {
        Url::parse(&self.queue_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn required(lookup: Lookup<'_>, name: &'static str) -> Result<String, ConfigError> {
    lookup(name).ok_or(ConfigError::Missing(name))
}

/// Unset and empty values are both treated as absent.
fn optional(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn parse_millis(
    lookup: Lookup<'_>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match optional(lookup, name) {
        None => Ok(Duration::from_millis(default)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
    }
}
