//! Room lifecycle integration tests.
//!
//! Drive the in-memory room store and assert on the signed callbacks a mock
//! signaling backend receives:
//!
//! - invite / disinvite / update / delete bodies
//! - the in-call sequence (join, guest joins, disconnect)
//! - leaving and removal while in call

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use notifier_test_utils::*;
use serde_json::json;
use signaling_notifier::call_state::{CallFlags, RoomType};
use signaling_notifier::errors::NotifierError;
use signaling_notifier::store::RoomStore;

#[tokio::test]
async fn test_room_invite() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;

    store.add_users(&token, &["alice"]).await?;
    backend.clear().await;
    store.add_users(&token, &["bob"]).await?;

    let bodies = backend.bodies_for(&token).await;
    assert_eq!(
        bodies,
        vec![json!({
            "type": "invite",
            "invite": {
                "userids": ["bob"],
                "alluserids": ["alice", "bob"],
                "properties": {"name": "Test room", "type": 3}
            }
        })]
    );
    Ok(())
}

#[tokio::test]
async fn test_adding_existing_member_sends_nothing() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Group).await;

    store.add_users(&token, &["alice"]).await?;
    backend.clear().await;
    let added = store.add_users(&token, &["alice"]).await?;

    assert!(added.is_empty());
    assert!(backend.requests().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_room_disinvite() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;
    store.add_users(&token, &["alice"]).await?;
    backend.clear().await;

    assert!(store.remove_user(&token, "alice").await?);

    assert_eq!(
        backend.bodies_for(&token).await,
        vec![json!({
            "type": "disinvite",
            "disinvite": {
                "userids": ["alice"],
                "alluserids": [],
                "properties": {"name": "Test room", "type": 3}
            }
        })]
    );
    Ok(())
}

#[tokio::test]
async fn test_room_name_changed() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("", RoomType::Public).await;

    store.set_name(&token, "Test room").await?;
    // Unchanged name is not an event.
    store.set_name(&token, "Test room").await?;

    assert_eq!(
        backend.bodies_for(&token).await,
        vec![json!({
            "type": "update",
            "update": {
                "userids": [],
                "properties": {"name": "Test room", "type": 3}
            }
        })]
    );
    Ok(())
}

#[tokio::test]
async fn test_room_type_changed() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Group).await;

    store.set_type(&token, RoomType::Public).await?;

    let bodies = backend.bodies_for(&token).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["type"], "update");
    assert_eq!(bodies[0]["update"]["properties"]["type"], 3);
    Ok(())
}

#[tokio::test]
async fn test_room_delete() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;
    store.add_users(&token, &["alice", "bob"]).await?;
    backend.clear().await;

    store.delete_room(&token).await?;

    assert_eq!(
        backend.bodies_for(&token).await,
        vec![json!({"type": "delete", "delete": {"userids": ["alice", "bob"]}})]
    );
    assert!(matches!(
        store.current_participants(&token).await,
        Err(NotifierError::RoomNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_room_in_call_changed() -> Result<()> {
    init_test_tracing();
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;
    store.add_users(&token, &["alice"]).await?;
    store.join_room(&token, user_session("s1", "alice")).await?;
    backend.clear().await;

    let alice = |flags: u8| {
        json!({
            "inCall": flags,
            "lastPing": 0,
            "sessionId": "s1",
            "participantType": 3,
            "userId": "alice"
        })
    };

    // Alice joins the call with audio and video.
    store.change_in_call(&token, "s1", full_call()).await?;
    assert_eq!(
        backend.bodies_for(&token).await,
        vec![json!({
            "type": "incall",
            "incall": {"incall": 7, "changed": [alice(7)], "users": [alice(7)]}
        })]
    );

    // A guest joins the room and the call.
    backend.clear().await;
    let guest_id = store.join_room_guest(&token).await?;
    store.change_in_call(&token, &guest_id, CallFlags::IN_CALL).await?;
    let guest = json!({"inCall": 1, "lastPing": 0, "sessionId": guest_id, "participantType": 4});
    assert_eq!(
        backend.bodies_for(&token).await,
        vec![json!({
            "type": "incall",
            "incall": {"incall": 7, "changed": [guest], "users": [alice(7), guest]}
        })]
    );

    // Alice disconnects.
    backend.clear().await;
    store
        .change_in_call(&token, "s1", CallFlags::DISCONNECTED)
        .await?;
    assert_eq!(
        backend.bodies_for(&token).await,
        vec![json!({
            "type": "incall",
            "incall": {"incall": 1, "changed": [alice(0)], "users": [guest]}
        })]
    );
    Ok(())
}

#[tokio::test]
async fn test_in_call_change_for_unknown_session() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;

    let result = store
        .change_in_call(&token, "ghost", CallFlags::IN_CALL)
        .await;

    assert!(matches!(result, Err(NotifierError::SessionNotFound(id)) if id == "ghost"));
    assert!(backend.requests().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_leaving_while_in_call_reports_disconnect() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;
    store.add_users(&token, &["alice"]).await?;
    store.join_room(&token, user_session("s1", "alice")).await?;
    store.join_room(&token, guest_session("g1")).await?;
    store.change_in_call(&token, "s1", CallFlags::IN_CALL).await?;
    backend.clear().await;

    store.leave_room(&token, "s1").await?;
    // A session that is not in the call leaves silently.
    store.leave_room(&token, "g1").await?;

    let bodies = backend.bodies_for(&token).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["type"], "incall");
    assert_eq!(bodies[0]["incall"]["changed"][0]["sessionId"], "s1");
    assert_eq!(bodies[0]["incall"]["changed"][0]["inCall"], 0);
    assert_eq!(bodies[0]["incall"]["users"], json!([]));

    let snapshot = store.current_participants(&token).await?;
    assert!(snapshot.sessions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejoining_while_in_call_reports_disconnect() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;
    store.add_users(&token, &["alice"]).await?;
    store.join_room(&token, user_session("s1", "alice")).await?;
    store.change_in_call(&token, "s1", full_call()).await?;
    backend.clear().await;

    store.join_room(&token, user_session("s1", "alice")).await?;

    let bodies = backend.bodies_for(&token).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["type"], "incall");
    assert_eq!(bodies[0]["incall"]["changed"][0]["sessionId"], "s1");
    assert_eq!(bodies[0]["incall"]["changed"][0]["inCall"], 0);
    assert_eq!(bodies[0]["incall"]["users"], json!([]));

    let snapshot = store.current_participants(&token).await?;
    assert_eq!(snapshot.session("s1").unwrap().call_flags, CallFlags::DISCONNECTED);
    backend.clear().await;

    store.join_room(&token, guest_session("g1")).await?;
    store.change_in_call(&token, "g1", CallFlags::IN_CALL).await?;

    let bodies = backend.bodies_for(&token).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["incall"]["users"].as_array().unwrap().len(), 1);
    assert_eq!(bodies[0]["incall"]["users"][0]["sessionId"], "g1");
    Ok(())
}

#[tokio::test]
async fn test_removing_user_in_call() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Group).await;
    store.add_users(&token, &["alice", "bob"]).await?;
    store.join_room(&token, user_session("s1", "alice")).await?;
    store.change_in_call(&token, "s1", full_call()).await?;
    backend.clear().await;

    store.remove_user(&token, "alice").await?;

    let kinds: Vec<_> = backend
        .bodies_for(&token)
        .await
        .iter()
        .map(|b| b["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["incall", "disinvite"]);
    Ok(())
}

#[tokio::test]
async fn test_self_joined_user_is_invited() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;

    store.join_room(&token, user_session("s9", "carol")).await?;

    let bodies = backend.bodies_for(&token).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["invite"]["userids"], json!(["carol"]));

    let snapshot = store.current_participants(&token).await?;
    assert_eq!(
        snapshot.session("s9").unwrap().participant_type.code(),
        5,
        "self-joined participant type"
    );
    Ok(())
}

#[tokio::test]
async fn test_ping_updates_last_ping_in_payload() -> Result<()> {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;
    store.join_room(&token, guest_session("g1")).await?;
    backend.clear().await;

    store.ping(&token, "g1", 1_700_000_000).await?;
    assert!(backend.requests().await.is_empty());

    store.change_in_call(&token, "g1", CallFlags::IN_CALL).await?;
    let bodies = backend.bodies_for(&token).await;
    assert_eq!(bodies[0]["incall"]["changed"][0]["lastPing"], 1_700_000_000i64);
    Ok(())
}

#[tokio::test]
async fn test_failing_backend_does_not_fail_mutation() -> Result<()> {
    let backend = MockSignalingBackend::start_with_status(500).await;
    let store = in_memory_store(&[backend.base_url()]);
    let token = store.create_room("Test room", RoomType::Public).await;

    store.add_users(&token, &["alice"]).await?;
    store.set_name(&token, "Renamed").await?;

    assert_eq!(backend.requests().await.len(), 2);
    let snapshot = store.current_participants(&token).await?;
    assert_eq!(snapshot.name, "Renamed");
    assert_eq!(snapshot.user_ids(), ["alice"]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_room() {
    let backend = MockSignalingBackend::start().await;
    let store = in_memory_store(&[backend.base_url()]);

    assert!(matches!(
        store.set_name("missing", "x").await,
        Err(NotifierError::RoomNotFound(_))
    ));
    assert!(matches!(
        store.delete_room("missing").await,
        Err(NotifierError::RoomNotFound(_))
    ));
}
