//! Session-related error types.

use meetcore::SessionIdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("connection error: {0}")]
    Connection(#[source] anyhow::Error),

    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("another call action is in progress")]
    Busy,
}

impl From<SessionIdError> for SessionError {
    fn from(err: SessionIdError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
