//! In-memory stand-ins for every collaborator, for tests.

use crate::session::backend::{
    CallEventHandler, ChatBackend, ChatChannel, Navigator, Notifier, SubscriptionId,
    TokenProvider, VideoBackend, VideoCall, VideoClient,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;
use meetcore::net::{HttpClient, HttpRequest, HttpResponse};
use meetcore::types::events::CALL_ENDED;
use meetcore::types::{AuthenticatedUser, CallEvent, NavigationTarget, Notification};
use meetcore::{SessionId, UserId};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
pub struct MockHttpClient {
    status_code: u16,
    body: Vec<u8>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub fn ok(body: Vec<u8>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status_code: u16, body: Vec<u8>) -> Self {
        Self {
            status_code,
            body,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("mutex should not be poisoned").clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .expect("mutex should not be poisoned")
            .push(request);
        Ok(HttpResponse {
            status_code: self.status_code,
            body: self.body.clone(),
        })
    }
}

/// Fails every request as if the host were unreachable.
#[derive(Debug, Clone, Default)]
pub struct UnreachableHttpClient;

#[async_trait]
impl HttpClient for UnreachableHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        Err(anyhow!("connection refused: {}", request.url))
    }
}

/// Hands out a fixed token and counts how often it was asked.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: Option<String>,
    fetches: AtomicUsize,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            token: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.token.clone().ok_or_else(|| anyhow!("token endpoint unavailable"))
    }
}

#[derive(Debug)]
pub struct FakeChannel {
    id: SessionId,
    members: Vec<UserId>,
    watched: AtomicBool,
    messages: Mutex<Vec<String>>,
    pub fail_send: AtomicBool,
}

impl FakeChannel {
    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    pub fn is_watched(&self) -> bool {
        self.watched.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("mutex should not be poisoned").clone()
    }
}

#[async_trait]
impl ChatChannel for FakeChannel {
    fn id(&self) -> &SessionId {
        &self.id
    }

    async fn watch(&self) -> Result<()> {
        self.watched.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(anyhow!("send failed"));
        }
        self.messages
            .lock()
            .expect("mutex should not be poisoned")
            .push(text.to_string());
        Ok(())
    }
}

/// Chat backend keeping channels by id, so opening the same id twice yields
/// the same channel.
#[derive(Debug, Default)]
pub struct FakeChatBackend {
    channels: DashMap<String, Arc<FakeChannel>>,
    connected: Mutex<Vec<(UserId, String)>>,
    pub fail_connect: AtomicBool,
}

impl FakeChatBackend {
    pub fn channel_by_id(&self, id: &str) -> Option<Arc<FakeChannel>> {
        self.channels.get(id).map(|c| c.clone())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// `(user, token)` of every `connect_user` call.
    pub fn connections(&self) -> Vec<(UserId, String)> {
        self.connected.lock().expect("mutex should not be poisoned").clone()
    }
}

#[async_trait]
impl ChatBackend for FakeChatBackend {
    async fn connect_user(&self, user: &AuthenticatedUser, token: &str) -> Result<()> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(anyhow!("chat service unreachable"));
        }
        self.connected
            .lock()
            .expect("mutex should not be poisoned")
            .push((user.id.clone(), token.to_string()));
        Ok(())
    }

    async fn channel(
        &self,
        _kind: &str,
        id: &SessionId,
        members: &[UserId],
    ) -> Result<Arc<dyn ChatChannel>> {
        let channel = self
            .channels
            .entry(id.to_string())
            .or_insert_with(|| {
                Arc::new(FakeChannel {
                    id: id.clone(),
                    members: members.to_vec(),
                    watched: AtomicBool::new(false),
                    messages: Mutex::new(Vec::new()),
                    fail_send: AtomicBool::new(false),
                })
            })
            .clone();
        Ok(channel)
    }
}

/// A call whose events are fired by hand with [`FakeCall::emit`].
pub struct FakeCall {
    id: SessionId,
    handlers: DashMap<String, Vec<(SubscriptionId, CallEventHandler)>>,
    next_subscription: AtomicU64,
    microphone: Mutex<Option<bool>>,
    camera: Mutex<Option<bool>>,
    device_delay: Mutex<Option<Duration>>,
    pub joins: AtomicUsize,
    pub leaves: AtomicUsize,
    pub ends: AtomicUsize,
    pub fail_join: AtomicBool,
    pub fail_end: AtomicBool,
    pub fail_leave: AtomicBool,
    pub fail_devices: AtomicBool,
    /// Makes `end_call` deliver `call.ended` to our own handlers before it
    /// returns, like a backend that broadcasts the end to every member.
    pub echo_end: AtomicBool,
}

impl FakeCall {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            handlers: DashMap::new(),
            next_subscription: AtomicU64::new(1),
            microphone: Mutex::new(None),
            camera: Mutex::new(None),
            device_delay: Mutex::new(None),
            joins: AtomicUsize::new(0),
            leaves: AtomicUsize::new(0),
            ends: AtomicUsize::new(0),
            fail_join: AtomicBool::new(false),
            fail_end: AtomicBool::new(false),
            fail_leave: AtomicBool::new(false),
            fail_devices: AtomicBool::new(false),
            echo_end: AtomicBool::new(false),
        }
    }

    /// Delivers `event` to every handler registered for its name.
    pub fn emit(&self, event: CallEvent) {
        let handlers: Vec<CallEventHandler> = self
            .handlers
            .get(&event.name)
            .map(|entry| entry.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn set_initial_devices(&self, microphone: bool, camera: bool) {
        *self.microphone.lock().expect("mutex should not be poisoned") = Some(microphone);
        *self.camera.lock().expect("mutex should not be poisoned") = Some(camera);
    }

    /// Makes device toggles take `delay` to complete.
    pub fn set_device_delay(&self, delay: Duration) {
        *self.device_delay.lock().expect("mutex should not be poisoned") = Some(delay);
    }

    async fn device_round_trip(&self) -> Result<()> {
        let delay = *self.device_delay.lock().expect("mutex should not be poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_devices.load(Ordering::SeqCst) {
            return Err(anyhow!("device unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl VideoCall for FakeCall {
    fn id(&self) -> &SessionId {
        &self.id
    }

    async fn join(&self, _create: bool) -> Result<()> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        if self.fail_join.load(Ordering::SeqCst) {
            return Err(anyhow!("join rejected"));
        }
        Ok(())
    }

    async fn leave(&self) -> Result<()> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        if self.fail_leave.load(Ordering::SeqCst) {
            return Err(anyhow!("leave rejected"));
        }
        Ok(())
    }

    async fn end_call(&self) -> Result<()> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        if self.echo_end.load(Ordering::SeqCst) {
            self.emit(CallEvent::named(CALL_ENDED));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if self.fail_end.load(Ordering::SeqCst) {
            return Err(anyhow!("only the host can end the call"));
        }
        Ok(())
    }

    async fn set_microphone(&self, enabled: bool) -> Result<()> {
        self.device_round_trip().await?;
        *self.microphone.lock().expect("mutex should not be poisoned") = Some(enabled);
        Ok(())
    }

    async fn set_camera(&self, enabled: bool) -> Result<()> {
        self.device_round_trip().await?;
        *self.camera.lock().expect("mutex should not be poisoned") = Some(enabled);
        Ok(())
    }

    fn microphone_enabled(&self) -> Option<bool> {
        *self.microphone.lock().expect("mutex should not be poisoned")
    }

    fn camera_enabled(&self) -> Option<bool> {
        *self.camera.lock().expect("mutex should not be poisoned")
    }

    fn on(&self, event: &str, handler: CallEventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn off(&self, event: &str, id: SubscriptionId) {
        if let Some(mut entry) = self.handlers.get_mut(event) {
            entry.retain(|(existing, _)| *existing != id);
        }
    }
}

/// Video backend keeping calls by id, so both participants share one call.
#[derive(Default)]
pub struct FakeVideoBackend {
    calls: Arc<DashMap<String, Arc<FakeCall>>>,
    clients: AtomicUsize,
    pub fail_connect: AtomicBool,
}

impl FakeVideoBackend {
    /// The call for `id`, created on first use.
    pub fn call(&self, id: &SessionId) -> Arc<FakeCall> {
        get_or_create_call(&self.calls, id)
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn clients_created(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }
}

fn get_or_create_call(calls: &DashMap<String, Arc<FakeCall>>, id: &SessionId) -> Arc<FakeCall> {
    calls
        .entry(id.to_string())
        .or_insert_with(|| Arc::new(FakeCall::new(id.clone())))
        .clone()
}

struct FakeVideoClient {
    calls: Arc<DashMap<String, Arc<FakeCall>>>,
}

impl VideoClient for FakeVideoClient {
    fn call(&self, _kind: &str, id: &SessionId) -> Arc<dyn VideoCall> {
        get_or_create_call(&self.calls, id)
    }
}

#[async_trait]
impl VideoBackend for FakeVideoBackend {
    async fn client(
        &self,
        _api_key: &str,
        _user: &AuthenticatedUser,
        _token: &str,
    ) -> Result<Arc<dyn VideoClient>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(anyhow!("video service unreachable"));
        }
        self.clients.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeVideoClient {
            calls: self.calls.clone(),
        }))
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("mutex should not be poisoned")
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .expect("mutex should not be poisoned")
            .push(notification);
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    targets: Mutex<Vec<NavigationTarget>>,
}

impl RecordingNavigator {
    pub fn targets(&self) -> Vec<NavigationTarget> {
        self.targets.lock().expect("mutex should not be poisoned").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &NavigationTarget) {
        self.targets
            .lock()
            .expect("mutex should not be poisoned")
            .push(target.clone());
    }
}
