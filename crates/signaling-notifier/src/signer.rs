//! Callback request signing.
//!
//! Each request carries a fresh random nonce and a checksum:
//!
//! ```text
//! random   = hex(32 bytes from the OS CSPRNG)      (64 chars)
//! checksum = hex(HMAC-SHA256(secret, random || body))
//! ```
//!
//! Receivers reject nonces shorter than [`MIN_RANDOM_LEN`] characters.

use crate::errors::NotifierError;
use common::secret::{ExposeSecret, SecretString};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

/// Header carrying the nonce.
pub const RANDOM_HEADER: &str = "Signaling-Random";

/// Header carrying the checksum.
pub const CHECKSUM_HEADER: &str = "Signaling-Checksum";

/// Minimum nonce length accepted by receivers.
pub const MIN_RANDOM_LEN: usize = 32;

/// Random bytes drawn per nonce; hex encoding doubles the length.
const RANDOM_BYTES: usize = 32;

/// Signature headers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub random: String,
    pub checksum: String,
}

/// Signs callback bodies with the shared secret.
pub struct RequestSigner {
    key: hmac::Key,
    rng: SystemRandom,
}

impl RequestSigner {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.expose_secret().as_bytes()),
            rng: SystemRandom::new(),
        }
    }

    /// Sign `body` with a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::Signing` if the OS random source fails.
    pub fn sign(&self, body: &[u8]) -> Result<SignedRequest, NotifierError> {
        let mut nonce = [0u8; RANDOM_BYTES];
        self.rng.fill(&mut nonce).map_err(|_| {
            tracing::error!(target: "notifier.signer", "CSPRNG fill failed");
            NotifierError::Signing
        })?;
        let random = hex::encode(nonce);
        let checksum = self.checksum(&random, body);

        Ok(SignedRequest { random, checksum })
    }

    /// Check a received `(random, checksum, body)` triple in constant time.
    pub fn verify(&self, random: &str, body: &[u8], checksum: &str) -> bool {
        if random.len() < MIN_RANDOM_LEN {
            return false;
        }

        let Ok(provided) = hex::decode(checksum) else {
            return false;
        };

        let mut message = Vec::with_capacity(random.len() + body.len());
        message.extend_from_slice(random.as_bytes());
        message.extend_from_slice(body);

        hmac::verify(&self.key, &message, &provided).is_ok()
    }

    fn checksum(&self, random: &str, body: &[u8]) -> String {
        let mut ctx = hmac::Context::with_key(&self.key);
        ctx.update(random.as_bytes());
        ctx.update(body);
        hex::encode(ctx.sign().as_ref())
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
