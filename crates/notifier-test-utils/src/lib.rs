//! # Notifier Test Utilities
//!
//! Shared test utilities for the signaling notifier.
//!
//! ## Modules
//!
//! - `mock_backend` - wiremock-backed signaling server that captures and
//!   verifies callbacks
//! - `fixtures` - secrets, configuration blobs, dispatchers and sessions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notifier_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let backend = MockSignalingBackend::start().await;
//!     let store = in_memory_store(&[backend.base_url()]);
//!
//!     let token = store.create_room("Test room", RoomType::Public).await;
//!     store.add_users(&token, &["alice"]).await.unwrap();
//!
//!     let bodies = backend.bodies_for(&token).await;
//!     assert_eq!(bodies[0]["type"], "invite");
//! }
//! ```

pub mod fixtures;
pub mod mock_backend;

pub use fixtures::*;
pub use mock_backend::*;
