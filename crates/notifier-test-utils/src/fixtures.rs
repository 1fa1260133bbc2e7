//! Test fixtures.

use common::config::ObservabilityConfig;
use common::observability::init_tracing;
use common::secret::SecretString;
use signaling_notifier::call_state::{CallFlags, ParticipantType, SessionState};
use signaling_notifier::config::Config;
use signaling_notifier::dispatcher::Dispatcher;
use signaling_notifier::registry::BackendSelection;
use signaling_notifier::store::InMemoryRoomStore;
use std::collections::HashMap;
use std::sync::{Arc, Once};

/// Shared secret used by every fixture.
pub const TEST_SECRET: &str = "the-signaling-secret";

/// Flags of a session in the call with audio and video.
pub fn full_call() -> CallFlags {
    CallFlags::IN_CALL.with_audio().with_video()
}

pub fn test_secret() -> SecretString {
    SecretString::from(TEST_SECRET)
}

/// `SIGNALING_SERVERS` JSON for the given server URLs.
pub fn servers_json(servers: &[String]) -> String {
    serde_json::json!({
        "secret": TEST_SECRET,
        "servers": servers
            .iter()
            .map(|s| serde_json::json!({"server": s}))
            .collect::<Vec<_>>(),
    })
    .to_string()
}

/// Configuration for the given servers, 2 second timeout.
pub fn test_config(servers: &[String], selection: BackendSelection) -> Config {
    let selection = match selection {
        BackendSelection::ShardByToken => "shard",
        BackendSelection::Broadcast => "broadcast",
    };
    let vars = HashMap::from([
        ("SIGNALING_SERVERS".to_string(), servers_json(servers)),
        (
            "SIGNALING_REQUEST_TIMEOUT_SECONDS".to_string(),
            "2".to_string(),
        ),
        (
            "SIGNALING_BACKEND_SELECTION".to_string(),
            selection.to_string(),
        ),
    ]);
    Config::from_vars(&vars).expect("test config should load")
}

pub fn test_dispatcher(servers: &[String], selection: BackendSelection) -> Arc<Dispatcher> {
    Arc::new(
        Dispatcher::from_config(&test_config(servers, selection))
            .expect("test dispatcher should build"),
    )
}

/// In-memory store notifying the given servers (shard selection).
pub fn in_memory_store(servers: &[String]) -> InMemoryRoomStore {
    InMemoryRoomStore::new(test_dispatcher(servers, BackendSelection::ShardByToken))
}

pub fn user_session(session_id: &str, user_id: &str) -> SessionState {
    SessionState::new(session_id, Some(user_id.to_string()), ParticipantType::User)
}

pub fn guest_session(session_id: &str) -> SessionState {
    SessionState::new(session_id, None, ParticipantType::Guest)
}

/// Install a debug-level subscriber once per test binary.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let config = ObservabilityConfig {
            log_level: "signaling_notifier=debug".to_string(),
            json_logs: false,
        };
        // Another harness may already own the global subscriber.
        let _ = init_tracing(&config);
    });
}
