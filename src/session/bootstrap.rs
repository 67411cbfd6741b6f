use super::backend::{
    CALL_KIND, CHAT_CHANNEL_KIND, ChatBackend, Navigator, Notifier, TokenProvider, VideoBackend,
};
use super::call::CallSession;
use super::chat::ChatSession;
use super::error::SessionError;
use super::lifecycle::EventSubscription;
use log::{debug, info, warn};
use meetcore::link::CallLink;
use meetcore::types::events::CallingState;
use meetcore::types::{AuthenticatedUser, Counterpart, Notification, ParticipantPair, SessionEvent};
use meetcore::{SessionId, UserId};
use std::sync::Arc;
use tokio::sync::{OnceCell, mpsc};

const CHAT_CONNECT_FAILED: &str = "Could not connect to chat. Please try again.";
const CALL_JOIN_FAILED: &str = "Could not join the call. Please try again.";

/// Session id plus the participants it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub session_id: SessionId,
    pub participants: ParticipantPair,
}

impl SessionTarget {
    /// Works out which session to open for `self_id`.
    ///
    /// Without a session id the canonical id of `self_id` and the explicit
    /// counterpart is used. With one, the counterpart comes from the
    /// explicit value or, failing that, from decoding the id; an unresolved
    /// counterpart does not fail the call.
    pub fn resolve(
        self_id: &UserId,
        explicit_counterpart: Option<UserId>,
        session_id: Option<SessionId>,
    ) -> Result<Self, SessionError> {
        let session_id = match (session_id, &explicit_counterpart) {
            (Some(id), _) => id,
            (None, Some(counterpart)) => SessionId::for_pair(self_id, counterpart)?,
            (None, None) => {
                return Err(SessionError::InvalidInput(
                    "either a session id or a counterpart is required".into(),
                ));
            }
        };
        let participants =
            ParticipantPair::resolve(self_id.clone(), explicit_counterpart, &session_id);
        Ok(Self {
            session_id,
            participants,
        })
    }

    pub fn counterpart(&self) -> &Counterpart {
        &self.participants.counterpart
    }

    /// Members of the backing chat channel.
    pub fn members(&self) -> Vec<UserId> {
        let mut members = vec![self.participants.self_id.clone()];
        if let Some(other) = self.participants.counterpart.user() {
            members.push(other.clone());
        }
        members
    }
}

/// Opens chat and call sessions for the signed-in user.
///
/// The backend token is fetched lazily, once per bootstrapper.
pub struct SessionBootstrapper {
    user: AuthenticatedUser,
    api_key: String,
    tokens: Arc<dyn TokenProvider>,
    token: OnceCell<String>,
    chat: Option<Arc<dyn ChatBackend>>,
    video: Option<Arc<dyn VideoBackend>>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl SessionBootstrapper {
    pub fn builder() -> SessionBootstrapperBuilder {
        SessionBootstrapperBuilder::default()
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    /// Resolves a session for the signed-in user. See [`SessionTarget::resolve`].
    pub fn open_session(
        &self,
        explicit_counterpart: Option<UserId>,
        session_id: Option<SessionId>,
    ) -> Result<SessionTarget, SessionError> {
        SessionTarget::resolve(&self.user.id, explicit_counterpart, session_id)
    }

    async fn token(&self) -> Result<&str, SessionError> {
        self.token
            .get_or_try_init(|| async {
                debug!("Fetching backend token for {}", self.user.id);
                self.tokens.fetch_token().await
            })
            .await
            .map(String::as_str)
            .map_err(SessionError::Connection)
    }

    /// Connects to chat and watches the conversation with `counterpart`.
    pub async fn open_chat(&self, counterpart: UserId) -> Result<ChatSession, SessionError> {
        let chat = self
            .chat
            .as_ref()
            .ok_or(SessionError::MissingCollaborator("chat backend"))?;
        let target = self.open_session(Some(counterpart), None)?;

        info!("Opening chat channel {}", target.session_id);
        let result: Result<_, SessionError> = async {
            let token = self.token().await?;
            chat.connect_user(&self.user, token)
                .await
                .map_err(SessionError::Connection)?;
            let channel = chat
                .channel(CHAT_CHANNEL_KIND, &target.session_id, &target.members())
                .await
                .map_err(SessionError::Connection)?;
            channel.watch().await.map_err(SessionError::Connection)?;
            Ok(channel)
        }
        .await;

        match result {
            Ok(channel) => Ok(ChatSession::new(target, channel, self.notifier.clone())),
            Err(e) => {
                warn!("Error initializing chat {}: {}", target.session_id, e);
                self.notifier.notify(Notification::error(CHAT_CONNECT_FAILED));
                Err(e)
            }
        }
    }

    /// Joins the call described by an invite link.
    pub async fn join_call_link(&self, link: &CallLink) -> Result<CallSession, SessionError> {
        self.join_call(link.target.clone(), Some(link.session_id.clone()))
            .await
    }

    /// Joins (creating if needed) the call for the resolved session.
    ///
    /// Lifecycle handlers are registered before joining so no terminal
    /// event is missed; they are removed again if the join fails.
    pub async fn join_call(
        &self,
        explicit_counterpart: Option<UserId>,
        session_id: Option<SessionId>,
    ) -> Result<CallSession, SessionError> {
        let video = self
            .video
            .as_ref()
            .ok_or(SessionError::MissingCollaborator("video backend"))?;
        let target = self.open_session(explicit_counterpart, session_id)?;

        info!("Initializing video call {}", target.session_id);
        let result: Result<_, SessionError> = async {
            let token = self.token().await?;
            let client = video
                .client(&self.api_key, &self.user, token)
                .await
                .map_err(SessionError::Connection)?;
            let call = client.call(CALL_KIND, &target.session_id);

            let (events_tx, events_rx) = mpsc::unbounded_channel();
            let subscription = EventSubscription::subscribe(call.clone(), events_tx.clone());

            // On error `subscription` is dropped here, which unsubscribes.
            call.join(true).await.map_err(SessionError::Connection)?;
            let _ = events_tx.send(SessionEvent::CallingState(CallingState::Joined));
            Ok((call, subscription, events_tx, events_rx))
        }
        .await;

        match result {
            Ok((call, subscription, events_tx, events_rx)) => {
                info!(
                    "Joined call {} (counterpart: {:?})",
                    target.session_id,
                    target.counterpart()
                );
                Ok(CallSession::start(
                    target,
                    call,
                    subscription,
                    events_tx,
                    events_rx,
                    self.notifier.clone(),
                    self.navigator.clone(),
                ))
            }
            Err(e) => {
                warn!("Error joining call {}: {}", target.session_id, e);
                self.notifier.notify(Notification::error(CALL_JOIN_FAILED));
                Err(e)
            }
        }
    }
}

#[derive(Default)]
pub struct SessionBootstrapperBuilder {
    user: Option<AuthenticatedUser>,
    api_key: Option<String>,
    tokens: Option<Arc<dyn TokenProvider>>,
    chat: Option<Arc<dyn ChatBackend>>,
    video: Option<Arc<dyn VideoBackend>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl SessionBootstrapperBuilder {
    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_chat_backend(mut self, chat: Arc<dyn ChatBackend>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_video_backend(mut self, video: Arc<dyn VideoBackend>) -> Self {
        self.video = Some(video);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> Result<SessionBootstrapper, SessionError> {
        Ok(SessionBootstrapper {
            user: self
                .user
                .ok_or(SessionError::MissingCollaborator("authenticated user"))?,
            api_key: self.api_key.unwrap_or_default(),
            tokens: self
                .tokens
                .ok_or(SessionError::MissingCollaborator("token provider"))?,
            token: OnceCell::new(),
            chat: self.chat,
            video: self.video,
            notifier: self
                .notifier
                .ok_or(SessionError::MissingCollaborator("notifier"))?,
            navigator: self
                .navigator
                .ok_or(SessionError::MissingCollaborator("navigator"))?,
        })
    }
}
