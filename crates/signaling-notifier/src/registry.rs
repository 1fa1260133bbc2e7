//! Backend registry.
//!
//! Holds the shared secret and the configured signaling backends, and decides
//! which backend(s) receive the callbacks for a room. Selection is a pure
//! function of the room token so every event for a room lands on the same
//! backend. The registry is immutable; reloading configuration means building
//! a new one.

use crate::config::{Config, ConfigError};
use crate::errors::NotifierError;
use common::secret::SecretString;
use ring::digest;
use std::str::FromStr;

/// Path prefix of the room callback endpoint on a signaling backend.
pub const ROOM_CALLBACK_PATH: &str = "/api/v1/room/";

/// A configured signaling backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingBackend {
    /// Normalized base URL: http(s) scheme, no trailing slash.
    pub base_url: String,

    /// Verify the backend's TLS certificate.
    pub verify: bool,
}

impl SignalingBackend {
    /// Create a backend from a configured server URL.
    ///
    /// Trailing slashes are trimmed and websocket schemes are mapped onto
    /// their HTTP equivalents (`wss://` -> `https://`, `ws://` -> `http://`).
    pub fn new(server: &str, verify: bool) -> Self {
        Self {
            base_url: normalize_base_url(server),
            verify,
        }
    }

    /// Callback URL for a room on this backend.
    pub fn room_url(&self, room_token: &str) -> String {
        format!("{}{}{}", self.base_url, ROOM_CALLBACK_PATH, room_token)
    }
}

fn normalize_base_url(server: &str) -> String {
    let trimmed = server.trim().trim_end_matches('/');

    if let Some(rest) = trimmed.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else {
        trimmed.to_string()
    }
}

/// Strategy for mapping a room onto backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendSelection {
    /// One backend per room, chosen by hashing the room token.
    #[default]
    ShardByToken,
    /// Every configured backend receives every event.
    Broadcast,
}

impl FromStr for BackendSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shard" | "shard-by-token" => Ok(BackendSelection::ShardByToken),
            "broadcast" => Ok(BackendSelection::Broadcast),
            other => Err(ConfigError::InvalidSelection(format!(
                "expected 'shard' or 'broadcast', got '{}'",
                other
            ))),
        }
    }
}

/// Shared secret plus configured backends.
#[derive(Debug)]
pub struct BackendRegistry {
    secret: SecretString,
    backends: Vec<SignalingBackend>,
    selection: BackendSelection,
}

impl BackendRegistry {
    pub fn new(
        secret: SecretString,
        backends: Vec<SignalingBackend>,
        selection: BackendSelection,
    ) -> Self {
        Self {
            secret,
            backends,
            selection,
        }
    }

    /// Build a registry from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::NoBackendConfigured` if the server list is empty.
    pub fn from_config(config: &Config) -> Result<Self, NotifierError> {
        let backends: Vec<SignalingBackend> = config
            .signaling
            .servers
            .iter()
            .map(|entry| SignalingBackend::new(&entry.server, entry.verify))
            .collect();

        if backends.is_empty() {
            tracing::error!(target: "notifier.registry", "No signaling backends configured");
            return Err(NotifierError::NoBackendConfigured);
        }

        tracing::info!(
            target: "notifier.registry",
            backend_count = backends.len(),
            selection = ?config.selection,
            "Backend registry loaded"
        );

        Ok(Self::new(
            config.signaling.secret.clone(),
            backends,
            config.selection,
        ))
    }

    /// The shared signing secret.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn selection(&self) -> BackendSelection {
        self.selection
    }

    pub fn backends(&self) -> &[SignalingBackend] {
        &self.backends
    }

    /// The backend that owns `room_token`.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::NoBackendConfigured` if no backends are configured.
    pub fn resolve_backend(&self, room_token: &str) -> Result<&SignalingBackend, NotifierError> {
        let index = shard_index(room_token, self.backends.len())
            .ok_or(NotifierError::NoBackendConfigured)?;
        self.backends
            .get(index)
            .ok_or(NotifierError::NoBackendConfigured)
    }

    /// Every backend that should receive events for `room_token`, according
    /// to the configured selection strategy.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::NoBackendConfigured` if no backends are configured.
    pub fn resolve_backends(
        &self,
        room_token: &str,
    ) -> Result<Vec<&SignalingBackend>, NotifierError> {
        match self.selection {
            BackendSelection::ShardByToken => Ok(vec![self.resolve_backend(room_token)?]),
            BackendSelection::Broadcast => {
                if self.backends.is_empty() {
                    return Err(NotifierError::NoBackendConfigured);
                }
                Ok(self.backends.iter().collect())
            }
        }
    }
}

/// First 8 bytes of SHA-256(token), big-endian, modulo `count`.
fn shard_index(room_token: &str, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }

    let hash = digest::digest(&digest::SHA256, room_token.as_bytes());
    let prefix: [u8; 8] = hash.as_ref().get(..8)?.try_into().ok()?;
    let value = u64::from_be_bytes(prefix);

    usize::try_from(value % count as u64).ok()
}
