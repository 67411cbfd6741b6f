use super::backend::{ChatChannel, Notifier};
use super::bootstrap::SessionTarget;
use super::error::SessionError;
use log::{info, warn};
use meetcore::SessionId;
use meetcore::link::CallLink;
use meetcore::types::{Counterpart, Notification};
use std::sync::Arc;

/// A watched one-to-one chat channel.
pub struct ChatSession {
    target: SessionTarget,
    channel: Arc<dyn ChatChannel>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub(crate) fn new(
        target: SessionTarget,
        channel: Arc<dyn ChatChannel>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            target,
            channel,
            notifier,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.target.session_id
    }

    pub fn counterpart(&self) -> &Counterpart {
        self.target.counterpart()
    }

    pub fn channel(&self) -> &Arc<dyn ChatChannel> {
        &self.channel
    }

    pub async fn send_message(&self, text: &str) -> Result<(), SessionError> {
        self.channel
            .send_message(text)
            .await
            .map_err(SessionError::Connection)
    }

    /// Posts a link to the video call of this conversation and returns it.
    ///
    /// The call id is the channel id, so both sides land in the same call.
    pub async fn send_call_invite(&self, origin: &str) -> Result<CallLink, SessionError> {
        let link = CallLink::new(
            origin,
            self.channel.id().clone(),
            self.counterpart().user().cloned(),
        );
        let text = format!("I've started a video call. Join me here: {link}");

        match self.channel.send_message(&text).await {
            Ok(()) => {
                info!("Sent call invite for {}", self.session_id());
                self.notifier
                    .notify(Notification::success("Video call link sent successfully!"));
                Ok(link)
            }
            Err(e) => {
                warn!("Error sending call invite for {}: {}", self.session_id(), e);
                self.notifier.notify(Notification::error(
                    "Could not send the video call link. Please try again.",
                ));
                Err(SessionError::Connection(e))
            }
        }
    }
}
