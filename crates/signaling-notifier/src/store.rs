//! Room store boundary.
//!
//! `RoomStore` is the read side the notifier consumes. `InMemoryRoomStore`
//! is a complete store that owns room state, serializes mutations per room
//! with a per-room lock, and reports every mutation to the `Dispatcher`
//! before returning. The lock is held across the dispatch so two flag
//! changes on one room can never interleave.

use crate::call_state::{
    CallFlags, InCallDelta, ParticipantType, RoomSnapshot, RoomType, SessionState,
};
use crate::dispatcher::Dispatcher;
use crate::errors::NotifierError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::instrument;
use uuid::Uuid;

/// Read access to room state.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Current snapshot of a room's properties, members and sessions.
    async fn current_participants(&self, room_token: &str)
        -> Result<RoomSnapshot, NotifierError>;
}

/// Room state plus a tombstone set by `delete_room` under the room lock.
struct RoomSlot {
    snapshot: RoomSnapshot,
    deleted: bool,
}

type SharedRoom = Arc<Mutex<RoomSlot>>;

/// In-memory room store that notifies signaling backends on every mutation.
pub struct InMemoryRoomStore {
    rooms: RwLock<HashMap<String, SharedRoom>>,
    dispatcher: Arc<Dispatcher>,
}

impl InMemoryRoomStore {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            dispatcher,
        }
    }

    /// Lock a room for mutation. A room deleted while the caller waited for
    /// the lock is reported as not found.
    async fn lock_room(
        &self,
        room_token: &str,
    ) -> Result<OwnedMutexGuard<RoomSlot>, NotifierError> {
        let room = self
            .rooms
            .read()
            .await
            .get(room_token)
            .cloned()
            .ok_or_else(|| NotifierError::RoomNotFound(room_token.to_string()))?;
        let slot = room.lock_owned().await;
        if slot.deleted {
            return Err(NotifierError::RoomNotFound(room_token.to_string()));
        }
        Ok(slot)
    }

    /// Create an empty room and return its token. Creation sends no event.
    pub async fn create_room(&self, name: &str, room_type: RoomType) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let slot = RoomSlot {
            snapshot: RoomSnapshot::new(token.clone(), name, room_type),
            deleted: false,
        };
        self.rooms
            .write()
            .await
            .insert(token.clone(), Arc::new(Mutex::new(slot)));
        token
    }

    /// Add members and send an invite for the ones not already present.
    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    pub async fn add_users(
        &self,
        room_token: &str,
        user_ids: &[&str],
    ) -> Result<Vec<String>, NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        let room = &mut slot.snapshot;

        let added = room.add_user_ids(user_ids.iter().copied());
        if !added.is_empty() {
            self.dispatcher.room_invited(room, &added).await?;
        }
        Ok(added)
    }

    /// Remove a member and all of their sessions, then send a disinvite.
    ///
    /// Sessions that were in the call are reported as disconnected first.
    #[instrument(skip(self))]
    pub async fn remove_user(
        &self,
        room_token: &str,
        user_id: &str,
    ) -> Result<bool, NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        let room = &mut slot.snapshot;

        let sessions: Vec<String> = room
            .sessions()
            .iter()
            .filter(|s| s.user_id.as_deref() == Some(user_id))
            .map(|s| s.session_id.clone())
            .collect();
        for session_id in sessions {
            self.leave_locked(room, &session_id).await?;
        }

        if !room.remove_user_id(user_id) {
            return Ok(false);
        }
        self.dispatcher
            .room_disinvited(room, &[user_id.to_string()])
            .await?;
        Ok(true)
    }

    /// Connect a session. A user who is not yet a member joins as
    /// self-joined and is invited. Reconnecting a session id that is still in
    /// the call reports it as disconnected before the new session replaces it.
    #[instrument(skip(self, session), fields(session_id = %session.session_id))]
    pub async fn join_room(
        &self,
        room_token: &str,
        mut session: SessionState,
    ) -> Result<(), NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        let room = &mut slot.snapshot;

        let rejoined_in_call = room
            .session(&session.session_id)
            .is_some_and(|existing| existing.call_flags.is_in_call());
        if rejoined_in_call {
            self.leave_locked(room, &session.session_id).await?;
        }

        let newly_added = match session.user_id.clone() {
            Some(user_id) if !room.user_ids().contains(&user_id) => {
                if session.participant_type == ParticipantType::User {
                    session.participant_type = ParticipantType::UserSelfJoined;
                }
                room.add_user_ids([user_id])
            }
            _ => Vec::new(),
        };

        room.join_session(session);

        if !newly_added.is_empty() {
            self.dispatcher.room_invited(room, &newly_added).await?;
        }
        Ok(())
    }

    /// Connect an unauthenticated guest and return the generated session id.
    pub async fn join_room_guest(&self, room_token: &str) -> Result<String, NotifierError> {
        let session_id = Uuid::new_v4().simple().to_string();
        self.join_room(
            room_token,
            SessionState::new(session_id.clone(), None, ParticipantType::Guest),
        )
        .await?;
        Ok(session_id)
    }

    /// Disconnect a session. An in-call session is reported as disconnected
    /// before it is removed.
    #[instrument(skip(self))]
    pub async fn leave_room(
        &self,
        room_token: &str,
        session_id: &str,
    ) -> Result<(), NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        self.leave_locked(&mut slot.snapshot, session_id).await
    }

    async fn leave_locked(
        &self,
        room: &mut RoomSnapshot,
        session_id: &str,
    ) -> Result<(), NotifierError> {
        let in_call = room
            .session(session_id)
            .ok_or_else(|| NotifierError::SessionNotFound(session_id.to_string()))?
            .call_flags
            .is_in_call();

        let reported = if in_call {
            self.dispatcher
                .room_in_call_changed(room, session_id, CallFlags::DISCONNECTED)
                .await
                .map(|_| ())
        } else {
            Ok(())
        };
        room.remove_session(session_id);
        reported
    }

    /// Record a keep-alive for a session. Sends no event.
    pub async fn ping(
        &self,
        room_token: &str,
        session_id: &str,
        timestamp: i64,
    ) -> Result<(), NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        let room = &mut slot.snapshot;

        let mut session = room
            .session(session_id)
            .cloned()
            .ok_or_else(|| NotifierError::SessionNotFound(session_id.to_string()))?;
        session.last_ping = timestamp;
        room.join_session(session);
        Ok(())
    }

    /// Change a session's call flags and notify the backend.
    #[instrument(skip(self))]
    pub async fn change_in_call(
        &self,
        room_token: &str,
        session_id: &str,
        flags: CallFlags,
    ) -> Result<InCallDelta, NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        let room = &mut slot.snapshot;
        self.dispatcher
            .room_in_call_changed(room, session_id, flags)
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_name(&self, room_token: &str, name: &str) -> Result<(), NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        let room = &mut slot.snapshot;

        if room.name == name {
            return Ok(());
        }
        room.name = name.to_string();
        self.dispatcher.room_renamed(room).await
    }

    #[instrument(skip(self))]
    pub async fn set_type(
        &self,
        room_token: &str,
        room_type: RoomType,
    ) -> Result<(), NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        let room = &mut slot.snapshot;

        if room.room_type == room_type {
            return Ok(());
        }
        room.room_type = room_type;
        self.dispatcher.room_type_changed(room).await
    }

    /// Delete the room and notify all of its members.
    #[instrument(skip(self))]
    pub async fn delete_room(&self, room_token: &str) -> Result<(), NotifierError> {
        let mut slot = self.lock_room(room_token).await?;
        slot.deleted = true;
        self.rooms.write().await.remove(room_token);
        self.dispatcher.room_deleted(&slot.snapshot).await
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn current_participants(
        &self,
        room_token: &str,
    ) -> Result<RoomSnapshot, NotifierError> {
        let slot = self.lock_room(room_token).await?;
        Ok(slot.snapshot.clone())
    }
}
