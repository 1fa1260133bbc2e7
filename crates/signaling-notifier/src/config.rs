//! Notifier configuration.
//!
//! Loaded from environment variables. The backend list and shared secret come
//! from a single JSON blob in `SIGNALING_SERVERS`:
//!
//! ```json
//! {"secret": "...", "servers": [{"server": "https://signaling.example.com", "verify": true}]}
//! ```
//!
//! The secret is held as a `SecretString` and never appears in Debug output.

use crate::errors::NotifierError;
use crate::registry::BackendSelection;
use common::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for the per-request timeout in seconds.
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 60;

/// URL schemes accepted for a signaling server entry.
const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

/// One entry of the `servers` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerEntry {
    /// Base URL of the signaling server.
    pub server: String,

    /// Verify the server's TLS certificate (default: true).
    #[serde(default = "default_verify")]
    pub verify: bool,
}

fn default_verify() -> bool {
    true
}

/// The signaling configuration blob.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalingServers {
    /// Shared HMAC secret.
    pub secret: SecretString,

    /// Configured backends, in configuration order.
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

impl SignalingServers {
    /// Parse and validate the JSON blob.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let parsed: SignalingServers = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidServers(format!("malformed JSON: {}", e)))?;

        if parsed.secret.expose_secret().is_empty() {
            return Err(ConfigError::InvalidServers(
                "secret must not be empty".to_string(),
            ));
        }

        if parsed.servers.is_empty() {
            return Err(ConfigError::InvalidServers(
                "at least one server must be configured".to_string(),
            ));
        }

        for entry in &parsed.servers {
            validate_server_url(&entry.server)?;
        }

        Ok(parsed)
    }
}

fn validate_server_url(server: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(server).map_err(|e| {
        ConfigError::InvalidServers(format!("invalid server URL '{}': {}", server, e))
    })?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ConfigError::InvalidServers(format!(
            "server URL '{}' must use one of {:?}",
            server, ALLOWED_SCHEMES
        )));
    }

    Ok(())
}

/// Notifier configuration.
#[derive(Clone)]
pub struct Config {
    /// Shared secret and backend list.
    pub signaling: SignalingServers,

    /// Timeout applied to each callback POST.
    pub request_timeout: Duration,

    /// How backends are chosen for a room.
    pub selection: BackendSelection,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"[REDACTED]")
            .field("servers", &self.signaling.servers)
            .field("request_timeout", &self.request_timeout)
            .field("selection", &self.selection)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signaling servers configuration: {0}")]
    InvalidServers(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid backend selection: {0}")]
    InvalidSelection(String),
}

impl From<ConfigError> for NotifierError {
    fn from(err: ConfigError) -> Self {
        NotifierError::Configuration(err.to_string())
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let servers_json = vars
            .get("SIGNALING_SERVERS")
            .ok_or_else(|| ConfigError::MissingEnvVar("SIGNALING_SERVERS".to_string()))?;
        let signaling = SignalingServers::from_json(servers_json)?;

        let request_timeout = if let Some(value_str) = vars.get("SIGNALING_REQUEST_TIMEOUT_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRequestTimeout(format!(
                    "SIGNALING_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, \
                     got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRequestTimeout(
                    "SIGNALING_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_REQUEST_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidRequestTimeout(format!(
                    "SIGNALING_REQUEST_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                    MAX_REQUEST_TIMEOUT_SECONDS, value
                )));
            }

            Duration::from_secs(value)
        } else {
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)
        };

        let selection = match vars.get("SIGNALING_BACKEND_SELECTION") {
            Some(value) => value.parse()?,
            None => BackendSelection::default(),
        };

        Ok(Config {
            signaling,
            request_timeout,
            selection,
        })
    }
}
