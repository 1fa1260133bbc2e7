//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the shared signaling secret.
//! `SecretString` implements `Debug` with redaction, so a struct deriving
//! `Debug` that holds the signaling secret cannot leak it through `{:?}` or
//! a tracing field. The value is zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let secret = SecretString::from("the-signaling-secret");
//! assert!(!format!("{secret:?}").contains("the-signaling-secret"));
//!
//! // Reading the value is always explicit.
//! let key: &str = secret.expose_secret();
//! assert_eq!(key, "the-signaling-secret");
//! ```
//!
//! With the `serde` feature, secrets deserialize directly from the signaling
//! configuration blob:
//!
//! ```rust
//! use serde::Deserialize;
//! use common::secret::SecretString;
//!
//! #[derive(Debug, Deserialize)]
//! struct Blob {
//!     secret: SecretString,
//! }
//!
//! let blob: Blob = serde_json::from_str(r#"{"secret": "abc"}"#).unwrap();
//! assert!(format!("{blob:?}").contains("REDACTED"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
