//! Runtime-agnostic core of echomeet.
//!
//! Everything in this crate is pure: no runtime, no I/O. The platform crate
//! wires these pieces to the chat/video backends and the HTTP client.

pub mod lifecycle;
pub mod link;
pub mod net;
pub mod session_id;
pub mod types;
pub mod upload;

pub use session_id::{SessionId, SessionIdError, UserId};
