//! Signaling Notifier
//!
//! Keeps external real-time signaling servers in sync with room state. Every
//! room mutation (invite, disinvite, rename, delete, in-call change) is turned
//! into a signed JSON callback and posted to the signaling backend(s) that
//! service the room.
//!
//! # Architecture
//!
//! ```text
//! store.rs -> dispatcher.rs -> { registry.rs, call_state.rs, payload.rs, signer.rs }
//! ```
//!
//! # Modules
//!
//! - `config` - Backend configuration from environment / JSON blob
//! - `errors` - Error taxonomy (`NotifierError`, `DeliveryError`)
//! - `registry` - Shared secret, configured backends and backend selection
//! - `call_state` - Call flags, sessions, room snapshots and the flag diff
//! - `payload` - Wire structures for each callback kind
//! - `signer` - Nonce generation and HMAC-SHA256 checksums
//! - `dispatcher` - Build, sign and POST callbacks, swallowing delivery failures
//! - `store` - `RoomStore` boundary and an in-memory implementation
//! - `observability` - Delivery metrics

pub mod call_state;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod observability;
pub mod payload;
pub mod registry;
pub mod signer;
pub mod store;
