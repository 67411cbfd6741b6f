//! Collaborator seams: the chat and video backends, the token provider and
//! the UI sinks for notifications and navigation.

use anyhow::Result;
use async_trait::async_trait;
use meetcore::types::{AuthenticatedUser, CallEvent, NavigationTarget, Notification};
use meetcore::{SessionId, UserId};
use std::sync::Arc;

/// Channel type used for one-to-one conversations.
pub const CHAT_CHANNEL_KIND: &str = "messaging";

/// Call type used for one-to-one video calls.
pub const CALL_KIND: &str = "default";

/// Supplies the short-lived credential needed by both backends.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<String>;
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn connect_user(&self, user: &AuthenticatedUser, token: &str) -> Result<()>;

    /// Returns the channel `id` of the given kind with the given members,
    /// creating it on first use.
    async fn channel(
        &self,
        kind: &str,
        id: &SessionId,
        members: &[UserId],
    ) -> Result<Arc<dyn ChatChannel>>;
}

#[async_trait]
pub trait ChatChannel: Send + Sync {
    fn id(&self) -> &SessionId;

    /// Starts watching the channel for new messages.
    async fn watch(&self) -> Result<()>;

    async fn send_message(&self, text: &str) -> Result<()>;
}

#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn client(
        &self,
        api_key: &str,
        user: &AuthenticatedUser,
        token: &str,
    ) -> Result<Arc<dyn VideoClient>>;
}

pub trait VideoClient: Send + Sync {
    fn call(&self, kind: &str, id: &SessionId) -> Arc<dyn VideoCall>;
}

/// Handler registered for a named call event.
pub type CallEventHandler = Arc<dyn Fn(&CallEvent) + Send + Sync>;

/// Token returned by [`VideoCall::on`], needed to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[async_trait]
pub trait VideoCall: Send + Sync {
    fn id(&self) -> &SessionId;

    async fn join(&self, create: bool) -> Result<()>;

    /// Leaves the call; other participants stay.
    async fn leave(&self) -> Result<()>;

    /// Ends the call for every participant.
    async fn end_call(&self) -> Result<()>;

    async fn set_microphone(&self, enabled: bool) -> Result<()>;

    async fn set_camera(&self, enabled: bool) -> Result<()>;

    /// Current device state, if the backend knows it yet.
    fn microphone_enabled(&self) -> Option<bool>;

    fn camera_enabled(&self) -> Option<bool>;

    fn on(&self, event: &str, handler: CallEventHandler) -> SubscriptionId;

    fn off(&self, event: &str, id: SubscriptionId);
}

/// Shows user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Performs route changes.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &NavigationTarget);
}
