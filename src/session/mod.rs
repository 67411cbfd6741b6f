//! Chat and call sessions between two users.
//!
//! # Architecture
//!
//! - [`SessionTarget`]: resolved session id and participants, pure
//! - [`SessionBootstrapper`]: opens chat channels and joins calls through
//!   the backend traits in [`backend`]
//! - [`ChatSession`]: a watched chat channel, can send call invites
//! - [`CallSession`]: a joined call; owns the event subscription and the
//!   lifecycle driver, releases both when dropped
//! - [`CallControls`]: end call, microphone and camera toggles

pub mod backend;
mod bootstrap;
mod call;
mod chat;
mod controls;
mod error;
mod lifecycle;

pub use bootstrap::{SessionBootstrapper, SessionBootstrapperBuilder, SessionTarget};
pub use call::CallSession;
pub use chat::ChatSession;
pub use controls::CallControls;
pub use error::SessionError;
pub use lifecycle::{EventSubscription, LifecycleDriver};
