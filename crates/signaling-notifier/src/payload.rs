//! Callback payloads.
//!
//! One builder per event kind. Builders are pure and field order is fixed by
//! declaration order, so identical inputs always serialize to identical
//! bytes. Set-valued inputs keep their first-seen order with duplicates
//! dropped.
//!
//! Wire shape of every callback body:
//!
//! ```text
//! {"type": "<kind>", "<kind>": { ...payload... }}
//! ```

use crate::call_state::{CallFlags, ParticipantType, RoomSnapshot, RoomType, SessionState};
use crate::errors::NotifierError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Room properties carried by invite, disinvite and update events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomProperties {
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
}

impl RoomProperties {
    fn of(room: &RoomSnapshot) -> Self {
        Self {
            name: room.name.clone(),
            room_type: room.room_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitePayload {
    pub userids: Vec<String>,
    pub alluserids: Vec<String>,
    pub properties: RoomProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisinvitePayload {
    pub userids: Vec<String>,
    pub alluserids: Vec<String>,
    pub properties: RoomProperties,
}

/// Receivers re-fetch membership on update, so `userids` is always empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePayload {
    pub userids: Vec<String>,
    pub properties: RoomProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletePayload {
    pub userids: Vec<String>,
}

/// Per-session entry of an in-call event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub in_call: CallFlags,
    pub last_ping: i64,
    pub session_id: String,
    pub participant_type: ParticipantType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl From<&SessionState> for SessionEntry {
    fn from(session: &SessionState) -> Self {
        Self {
            in_call: session.call_flags,
            last_ping: session.last_ping,
            session_id: session.session_id.clone(),
            participant_type: session.participant_type,
            user_id: session.user_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InCallPayload {
    /// Bitwise OR of every entry in `users`.
    pub incall: CallFlags,
    pub changed: Vec<SessionEntry>,
    pub users: Vec<SessionEntry>,
}

/// A callback body, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Invite(InvitePayload),
    Disinvite(DisinvitePayload),
    Update(UpdatePayload),
    Delete(DeletePayload),
    InCall(InCallPayload),
}

impl BackendEvent {
    /// Value of the `type` field, also used as the payload key.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendEvent::Invite(_) => "invite",
            BackendEvent::Disinvite(_) => "disinvite",
            BackendEvent::Update(_) => "update",
            BackendEvent::Delete(_) => "delete",
            BackendEvent::InCall(_) => "incall",
        }
    }

    /// Serialize to the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::Serialization` if serialization fails.
    pub fn to_body(&self) -> Result<Vec<u8>, NotifierError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for BackendEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", kind)?;
        match self {
            BackendEvent::Invite(payload) => map.serialize_entry(kind, payload)?,
            BackendEvent::Disinvite(payload) => map.serialize_entry(kind, payload)?,
            BackendEvent::Update(payload) => map.serialize_entry(kind, payload)?,
            BackendEvent::Delete(payload) => map.serialize_entry(kind, payload)?,
            BackendEvent::InCall(payload) => map.serialize_entry(kind, payload)?,
        }
        map.end()
    }
}

fn ordered_unique(ids: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    unique
}

/// Users were added to the room.
pub fn build_invite(
    user_ids: &[String],
    all_user_ids_after_invite: &[String],
    room: &RoomSnapshot,
) -> BackendEvent {
    BackendEvent::Invite(InvitePayload {
        userids: ordered_unique(user_ids),
        alluserids: ordered_unique(all_user_ids_after_invite),
        properties: RoomProperties::of(room),
    })
}

/// Users were removed from the room.
pub fn build_disinvite(
    removed_user_ids: &[String],
    remaining_user_ids: &[String],
    room: &RoomSnapshot,
) -> BackendEvent {
    BackendEvent::Disinvite(DisinvitePayload {
        userids: ordered_unique(removed_user_ids),
        alluserids: ordered_unique(remaining_user_ids),
        properties: RoomProperties::of(room),
    })
}

/// Room properties (name, type) changed.
pub fn build_update(room: &RoomSnapshot) -> BackendEvent {
    BackendEvent::Update(UpdatePayload {
        userids: Vec::new(),
        properties: RoomProperties::of(room),
    })
}

/// The room was deleted.
pub fn build_delete(all_user_ids: &[String]) -> BackendEvent {
    BackendEvent::Delete(DeletePayload {
        userids: ordered_unique(all_user_ids),
    })
}

/// A session's call flags changed.
pub fn build_in_call_changed(
    changed: &[SessionState],
    all_in_call: &[SessionState],
) -> BackendEvent {
    let incall = all_in_call
        .iter()
        .fold(CallFlags::DISCONNECTED, |acc, s| acc | s.call_flags);

    BackendEvent::InCall(InCallPayload {
        incall,
        changed: changed.iter().map(SessionEntry::from).collect(),
        users: all_in_call.iter().map(SessionEntry::from).collect(),
    })
}
