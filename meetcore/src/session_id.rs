//! Canonical two-party session identifiers.
//!
//! A [`SessionId`] names the chat channel, the video call and the route
//! segment shared by exactly two users. Both participants derive it locally
//! from the pair of user IDs, so no server round-trip is needed to agree on
//! it.
//!
//! Format: `{smaller}-{larger}`, where the two IDs are ordered by ordinal
//! (byte-wise) string comparison. Older links used `_` as the delimiter;
//! [`decode`] still accepts those.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Delimiter written by [`encode`].
pub const DELIMITER: char = '-';

/// Delimiter found in legacy session IDs, only honoured by [`decode`].
pub const LEGACY_DELIMITER: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionIdError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("unrecognized session id format: {0}")]
    UnrecognizedFormat(String),

    #[error("no counterpart distinct from {self_id} in session {session_id}")]
    CounterpartUnresolved { session_id: String, self_id: String },
}

/// Opaque, non-empty user identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, SessionIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(SessionIdError::InvalidInput("user id must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical identifier of a two-party session.
///
/// Values built with [`SessionId::for_pair`] are always in canonical form.
/// Values taken from a route or link with [`SessionId::parse`] are kept
/// verbatim, since they may come from an older client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Canonical ID for the unordered pair `{a, b}`.
    pub fn for_pair(a: &UserId, b: &UserId) -> Result<Self, SessionIdError> {
        encode(a.as_str(), b.as_str())
    }

    /// Accepts any non-empty identifier, e.g. a `/call/{id}` route segment.
    pub fn parse(raw: impl Into<String>) -> Result<Self, SessionIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(SessionIdError::InvalidInput("session id must not be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The participant of this session that is not `self_id`.
    pub fn counterpart_of(&self, self_id: &UserId) -> Result<UserId, SessionIdError> {
        decode(&self.0, self_id.as_str())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Builds the canonical session ID for two user IDs.
///
/// Order of the arguments does not matter. IDs containing [`DELIMITER`] are
/// rejected because the result could not be split back into two IDs.
pub fn encode(id_a: &str, id_b: &str) -> Result<SessionId, SessionIdError> {
    if id_a.is_empty() || id_b.is_empty() {
        return Err(SessionIdError::InvalidInput("user id must not be empty"));
    }
    if id_a.contains(DELIMITER) || id_b.contains(DELIMITER) {
        return Err(SessionIdError::InvalidInput(
            "user id must not contain the session delimiter",
        ));
    }

    // Ordinal comparison on bytes, never numeric: "u42" < "u7".
    let (low, high) = if id_a <= id_b {
        (id_a, id_b)
    } else {
        (id_b, id_a)
    };
    Ok(SessionId(format!("{low}{DELIMITER}{high}")))
}

/// Recovers the counterpart of `self_id` from a session ID.
///
/// Splits on `-`, falling back to `_` when that yields fewer than two tokens.
/// Returns the first non-empty token that differs from `self_id`.
pub fn decode(session_id: &str, self_id: &str) -> Result<UserId, SessionIdError> {
    let mut tokens: Vec<&str> = session_id.split(DELIMITER).collect();
    if tokens.len() < 2 {
        tokens = session_id.split(LEGACY_DELIMITER).collect();
    }
    if tokens.len() < 2 {
        return Err(SessionIdError::UnrecognizedFormat(session_id.to_string()));
    }

    tokens
        .into_iter()
        .find(|token| !token.is_empty() && *token != self_id)
        .map(|token| UserId(token.to_string()))
        .ok_or_else(|| SessionIdError::CounterpartUnresolved {
            session_id: session_id.to_string(),
            self_id: self_id.to_string(),
        })
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    // Anything but the primary delimiter; the legacy one is a legal id char.
    const ID: &str = "[A-Za-z0-9_.@]{1,24}";

    proptest! {
        #[test]
        fn decode_recovers_the_other_side(a in ID, b in ID) {
            prop_assume!(a != b);
            let id = encode(&a, &b).unwrap();
            let from_a = decode(id.as_str(), &a).unwrap();
            let from_b = decode(id.as_str(), &b).unwrap();
            prop_assert_eq!(from_a.as_str(), b.as_str());
            prop_assert_eq!(from_b.as_str(), a.as_str());
        }

        #[test]
        fn encode_ignores_argument_order(a in ID, b in ID) {
            prop_assert_eq!(encode(&a, &b).unwrap(), encode(&b, &a).unwrap());
        }

        #[test]
        fn encode_is_byte_identical_on_repeat(a in ID, b in ID) {
            let first = encode(&a, &b).unwrap();
            let second = encode(&a, &b).unwrap();
            prop_assert_eq!(first.as_str().as_bytes(), second.as_str().as_bytes());
        }

        #[test]
        fn ids_with_the_delimiter_are_rejected(a in ID, b in ID) {
            let tainted = format!("{a}-{b}");
            prop_assert!(encode(&tainted, &b).is_err());
        }
    }
}
