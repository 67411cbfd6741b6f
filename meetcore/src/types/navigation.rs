use crate::session_id::UserId;
use serde::Serialize;
use std::fmt;

/// Where the UI goes once a session is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum NavigationTarget {
    /// Back to the chat with this user.
    Conversation(UserId),
    /// The default landing view.
    Home,
}

impl NavigationTarget {
    pub fn path(&self) -> String {
        match self {
            Self::Conversation(user) => format!("/chat/{user}"),
            Self::Home => "/".to_string(),
        }
    }
}

impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
