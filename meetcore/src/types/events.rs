//! Events delivered by the video backend and their local interpretation.

use serde::{Deserialize, Serialize};

pub const CALL_ENDED: &str = "call.ended";
pub const CALL_SESSION_ENDED: &str = "call.session_ended";
pub const CALL_PARTICIPANT_LEFT: &str = "call.participant_left";
pub const CALL_SESSION_PARTICIPANT_LEFT: &str = "call.session_participant_left";
pub const CALL_DISCONNECTED: &str = "call.disconnected";
pub const CALLING_STATE_CHANGED: &str = "calling_state.changed";

/// Every backend event name a call session subscribes to.
pub const SUBSCRIBED_EVENTS: [&str; 6] = [
    CALL_ENDED,
    CALL_SESSION_ENDED,
    CALL_PARTICIPANT_LEFT,
    CALL_SESSION_PARTICIPANT_LEFT,
    CALL_DISCONNECTED,
    CALLING_STATE_CHANGED,
];

/// Calling state as reported by the video backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallingState {
    Idle,
    Ringing,
    Joining,
    Joined,
    Reconnecting,
    Left,
    Offline,
}

/// A raw event as handed to a subscribed handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub name: String,
    /// Participants still in the call, for `*participant_left` events.
    #[serde(default)]
    pub remaining_participants: Option<usize>,
    /// New state, for `calling_state.changed`.
    #[serde(default)]
    pub calling_state: Option<CallingState>,
}

impl CallEvent {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remaining_participants: None,
            calling_state: None,
        }
    }

    pub fn participant_left(remaining: usize) -> Self {
        Self {
            remaining_participants: Some(remaining),
            ..Self::named(CALL_PARTICIPANT_LEFT)
        }
    }

    pub fn calling_state(state: CallingState) -> Self {
        Self {
            calling_state: Some(state),
            ..Self::named(CALLING_STATE_CHANGED)
        }
    }
}

/// What a backend event means for the local session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    CallingState(CallingState),
    /// The call was ended for everyone.
    Ended,
    ParticipantLeft { remaining: usize },
    Disconnected,
    /// The local user pressed "end call" and the request is in flight.
    LocalEndRequested,
    /// The local user's end call finished; `ok` is false if neither ending
    /// nor leaving the call succeeded.
    LocalEnd { ok: bool },
}

impl SessionEvent {
    /// Maps a backend event to a session event. Unknown names and malformed
    /// payloads yield `None`.
    pub fn from_call_event(event: &CallEvent) -> Option<Self> {
        match event.name.as_str() {
            CALL_ENDED | CALL_SESSION_ENDED => Some(Self::Ended),
            CALL_PARTICIPANT_LEFT | CALL_SESSION_PARTICIPANT_LEFT => {
                event
                    .remaining_participants
                    .map(|remaining| Self::ParticipantLeft { remaining })
            }
            CALL_DISCONNECTED => Some(Self::Disconnected),
            CALLING_STATE_CHANGED => event.calling_state.map(Self::CallingState),
            _ => None,
        }
    }

    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Ended | Self::Disconnected | Self::LocalEnd { .. } => true,
            Self::LocalEndRequested => false,
            Self::ParticipantLeft { remaining } => *remaining == 0,
            Self::CallingState(state) => matches!(state, CallingState::Left | CallingState::Offline),
        }
    }
}
