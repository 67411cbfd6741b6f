// Core types and codecs live in meetcore; re-exported for convenience
pub use meetcore::{SessionId, SessionIdError, UserId, lifecycle, link, net, types};

pub mod config;
pub mod session;
pub mod settings;
pub mod upload;

// In-memory collaborators, public so integration tests can use them
pub mod test_utils;

pub use config::AppConfig;
pub use session::{
    CallControls, CallSession, ChatSession, SessionBootstrapper, SessionError, SessionTarget,
};
