//! Call state of room sessions and the per-change diff.
//!
//! A `RoomSnapshot` is the notifier's view of a room: its properties, member
//! user ids and the connected sessions in join order. `apply_flag_change` is
//! the single place where a session's call flags are written; it returns the
//! session that changed together with the full in-call roster afterwards.
//!
//! The snapshot is not synchronized here. Callers hold whatever lock guards
//! the room while applying a change so two flag changes cannot interleave.

use crate::errors::NotifierError;
use serde::{Serialize, Serializer};
use std::ops::BitOr;

const IN_CALL_BIT: u8 = 1;
const WITH_AUDIO_BIT: u8 = 2;
const WITH_VIDEO_BIT: u8 = 4;
const ALL_BITS: u8 = IN_CALL_BIT | WITH_AUDIO_BIT | WITH_VIDEO_BIT;

/// In-call bitmask of a session.
///
/// Always either `DISCONNECTED` (0) or has the in-call bit set; audio and
/// video bits never appear on their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CallFlags(u8);

impl CallFlags {
    pub const DISCONNECTED: CallFlags = CallFlags(0);
    pub const IN_CALL: CallFlags = CallFlags(IN_CALL_BIT);

    /// Validate a raw bitmask.
    ///
    /// # Errors
    ///
    /// Returns `NotifierError::InvalidCallFlags` for unknown bits, or for
    /// audio/video bits without the in-call bit.
    pub fn from_bits(bits: u8) -> Result<Self, NotifierError> {
        if bits & !ALL_BITS != 0 || (bits != 0 && bits & IN_CALL_BIT == 0) {
            return Err(NotifierError::InvalidCallFlags(bits));
        }
        Ok(CallFlags(bits))
    }

    /// Add audio. Implies in-call.
    #[must_use]
    pub fn with_audio(self) -> Self {
        CallFlags(self.0 | IN_CALL_BIT | WITH_AUDIO_BIT)
    }

    /// Add video. Implies in-call.
    #[must_use]
    pub fn with_video(self) -> Self {
        CallFlags(self.0 | IN_CALL_BIT | WITH_VIDEO_BIT)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_in_call(self) -> bool {
        self.0 & IN_CALL_BIT != 0
    }

    pub fn has_audio(self) -> bool {
        self.0 & WITH_AUDIO_BIT != 0
    }

    pub fn has_video(self) -> bool {
        self.0 & WITH_VIDEO_BIT != 0
    }
}

impl BitOr for CallFlags {
    type Output = CallFlags;

    fn bitor(self, rhs: CallFlags) -> CallFlags {
        CallFlags(self.0 | rhs.0)
    }
}

impl TryFrom<u8> for CallFlags {
    type Error = NotifierError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        CallFlags::from_bits(bits)
    }
}

impl Serialize for CallFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

/// Kind of participant. Independent of call state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantType {
    Owner,
    Moderator,
    User,
    Guest,
    UserSelfJoined,
    GuestModerator,
}

impl ParticipantType {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            ParticipantType::Owner => 1,
            ParticipantType::Moderator => 2,
            ParticipantType::User => 3,
            ParticipantType::Guest => 4,
            ParticipantType::UserSelfJoined => 5,
            ParticipantType::GuestModerator => 6,
        }
    }

    pub fn is_guest(self) -> bool {
        matches!(
            self,
            ParticipantType::Guest | ParticipantType::GuestModerator
        )
    }
}

impl TryFrom<u8> for ParticipantType {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ParticipantType::Owner),
            2 => Ok(ParticipantType::Moderator),
            3 => Ok(ParticipantType::User),
            4 => Ok(ParticipantType::Guest),
            5 => Ok(ParticipantType::UserSelfJoined),
            6 => Ok(ParticipantType::GuestModerator),
            other => Err(other),
        }
    }
}

impl Serialize for ParticipantType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Kind of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomType {
    OneToOne,
    Group,
    Public,
    Changelog,
}

impl RoomType {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            RoomType::OneToOne => 1,
            RoomType::Group => 2,
            RoomType::Public => 3,
            RoomType::Changelog => 4,
        }
    }
}

impl TryFrom<u8> for RoomType {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(RoomType::OneToOne),
            2 => Ok(RoomType::Group),
            3 => Ok(RoomType::Public),
            4 => Ok(RoomType::Changelog),
            other => Err(other),
        }
    }
}

impl Serialize for RoomType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// One active connection of a participant to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session_id: String,
    /// Absent for unauthenticated guests.
    pub user_id: Option<String>,
    pub participant_type: ParticipantType,
    pub call_flags: CallFlags,
    pub last_ping: i64,
}

impl SessionState {
    /// A session that has joined but is not in the call.
    pub fn new(
        session_id: impl Into<String>,
        user_id: Option<String>,
        participant_type: ParticipantType,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id,
            participant_type,
            call_flags: CallFlags::DISCONNECTED,
            last_ping: 0,
        }
    }
}

/// The notifier's view of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub token: String,
    pub name: String,
    pub room_type: RoomType,
    user_ids: Vec<String>,
    sessions: Vec<SessionState>,
}

impl RoomSnapshot {
    pub fn new(token: impl Into<String>, name: impl Into<String>, room_type: RoomType) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            room_type,
            user_ids: Vec::new(),
            sessions: Vec::new(),
        }
    }

    /// Member user ids in the order they were added.
    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    /// Add members, skipping ones already present. Returns the ids that were
    /// actually added.
    pub fn add_user_ids<I, S>(&mut self, user_ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        for user_id in user_ids {
            let user_id = user_id.into();
            if !self.user_ids.contains(&user_id) {
                self.user_ids.push(user_id.clone());
                added.push(user_id);
            }
        }
        added
    }

    /// Remove a member. Returns whether it was present.
    pub fn remove_user_id(&mut self, user_id: &str) -> bool {
        let before = self.user_ids.len();
        self.user_ids.retain(|id| id != user_id);
        self.user_ids.len() != before
    }

    /// Connected sessions in join order.
    pub fn sessions(&self) -> &[SessionState] {
        &self.sessions
    }

    pub fn session(&self, session_id: &str) -> Option<&SessionState> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    /// Add a session at the end of the join order. A session with the same
    /// id is replaced in place.
    pub fn join_session(&mut self, session: SessionState) {
        match self
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session.session_id)
        {
            Some(existing) => *existing = session,
            None => self.sessions.push(session),
        }
    }

    pub fn remove_session(&mut self, session_id: &str) -> Option<SessionState> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.session_id == session_id)?;
        Some(self.sessions.remove(index))
    }

    /// Sessions with the in-call bit set, in join order.
    pub fn in_call_sessions(&self) -> Vec<SessionState> {
        self.sessions
            .iter()
            .filter(|s| s.call_flags.is_in_call())
            .cloned()
            .collect()
    }
}

/// Result of one flag change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InCallDelta {
    /// Exactly the session whose flags were set, with its new flags.
    pub changed: Vec<SessionState>,
    /// Every in-call session after the change, in join order.
    pub all_in_call: Vec<SessionState>,
    /// Flags of the changed session before the change.
    pub previous_flags: CallFlags,
}

/// Set `session_id`'s flags to `new_flags` and report the change.
///
/// The changed list always holds the session, even when the flags did not
/// differ; the caller reporting the change is authoritative.
///
/// # Errors
///
/// Returns `NotifierError::SessionNotFound` if the session is not in the room.
pub fn apply_flag_change(
    room: &mut RoomSnapshot,
    session_id: &str,
    new_flags: CallFlags,
) -> Result<InCallDelta, NotifierError> {
    let session = room
        .sessions
        .iter_mut()
        .find(|s| s.session_id == session_id)
        .ok_or_else(|| NotifierError::SessionNotFound(session_id.to_string()))?;

    let previous_flags = session.call_flags;
    session.call_flags = new_flags;
    let changed = vec![session.clone()];

    tracing::debug!(
        target: "notifier.call_state",
        room_token = %room.token,
        session_id = %session_id,
        previous = previous_flags.bits(),
        current = new_flags.bits(),
        "Applied call flag change"
    );

    Ok(InCallDelta {
        changed,
        all_in_call: room.in_call_sessions(),
        previous_flags,
    })
}
