use crate::session_id::{SessionId, UserId};
use crate::types::navigation::NavigationTarget;
use log::debug;
use serde::Serialize;

/// The other side of a two-party session, if we managed to work it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum Counterpart {
    Known(UserId),
    Unknown,
}

impl Counterpart {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn user(&self) -> Option<&UserId> {
        match self {
            Self::Known(id) => Some(id),
            Self::Unknown => None,
        }
    }

    /// Navigation target once a session with this counterpart is over.
    pub fn return_target(&self) -> NavigationTarget {
        match self {
            Self::Known(id) => NavigationTarget::Conversation(id.clone()),
            Self::Unknown => NavigationTarget::Home,
        }
    }
}

impl From<Option<UserId>> for Counterpart {
    fn from(value: Option<UserId>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantPair {
    pub self_id: UserId,
    pub counterpart: Counterpart,
}

impl ParticipantPair {
    /// Resolves the counterpart for `self_id` in `session_id`.
    ///
    /// An explicit counterpart wins unless it names ourselves. Otherwise the
    /// session id is decoded; failure there degrades to
    /// [`Counterpart::Unknown`].
    pub fn resolve(self_id: UserId, explicit: Option<UserId>, session_id: &SessionId) -> Self {
        if let Some(explicit) = explicit.filter(|id| *id != self_id) {
            return Self {
                self_id,
                counterpart: Counterpart::Known(explicit),
            };
        }

        let counterpart = match session_id.counterpart_of(&self_id) {
            Ok(id) => Counterpart::Known(id),
            Err(e) => {
                debug!("Counterpart of {self_id} in {session_id} unresolved: {e}");
                Counterpart::Unknown
            }
        };
        Self {
            self_id,
            counterpart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        s.parse().unwrap()
    }

    #[test]
    fn explicit_counterpart_wins() {
        let sid = SessionId::parse("u1-u2").unwrap();
        let pair = ParticipantPair::resolve(uid("u1"), Some(uid("u9")), &sid);
        assert_eq!(pair.counterpart, Counterpart::Known(uid("u9")));
    }

    #[test]
    fn explicit_self_falls_back_to_decode() {
        let sid = SessionId::parse("u1-u2").unwrap();
        let pair = ParticipantPair::resolve(uid("u1"), Some(uid("u1")), &sid);
        assert_eq!(pair.counterpart, Counterpart::Known(uid("u2")));
    }

    #[test]
    fn undecodable_session_gives_unknown() {
        let sid = SessionId::parse("lobby").unwrap();
        let pair = ParticipantPair::resolve(uid("u1"), None, &sid);
        assert_eq!(pair.counterpart, Counterpart::Unknown);
        assert_eq!(pair.counterpart.return_target(), NavigationTarget::Home);
    }

    #[test]
    fn known_counterpart_returns_to_conversation() {
        let target = Counterpart::Known(uid("u7")).return_target();
        assert_eq!(target.path(), "/chat/u7");
    }
}
