use super::backend::{CallEventHandler, Navigator, Notifier, SubscriptionId, VideoCall};
use log::{debug, info};
use meetcore::lifecycle::{Reaction, Reconciler, SessionLifecycleState};
use meetcore::types::{CallEvent, SessionEvent};
use meetcore::types::events::SUBSCRIBED_EVENTS;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Lifecycle handlers registered on one call.
///
/// Handlers only translate backend events and forward them; all state lives
/// in the [`LifecycleDriver`]. Dropping the subscription removes every
/// handler, so a re-opened session never sees events twice.
pub struct EventSubscription {
    call: Arc<dyn VideoCall>,
    handlers: Vec<(&'static str, SubscriptionId)>,
}

impl EventSubscription {
    pub fn subscribe(call: Arc<dyn VideoCall>, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let handlers = SUBSCRIBED_EVENTS
            .iter()
            .map(|&name| {
                let events = events.clone();
                let handler: CallEventHandler = Arc::new(move |event: &CallEvent| {
                    match SessionEvent::from_call_event(event) {
                        // The driver may already be gone after a terminal event.
                        Some(mapped) => {
                            let _ = events.send(mapped);
                        }
                        None => debug!("Ignoring call event {}", event.name),
                    }
                });
                (name, call.on(name, handler))
            })
            .collect();
        Self { call, handlers }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        for (name, id) in self.handlers.drain(..) {
            self.call.off(name, id);
        }
        debug!("Unsubscribed lifecycle handlers for call {}", self.call.id());
    }
}

/// Feeds session events through a [`Reconciler`] in delivery order and
/// performs the resulting notification and navigation.
pub struct LifecycleDriver {
    reconciler: Reconciler,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    state: watch::Sender<SessionLifecycleState>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl LifecycleDriver {
    pub fn new(
        reconciler: Reconciler,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> (Self, watch::Receiver<SessionLifecycleState>) {
        let (state, state_rx) = watch::channel(reconciler.state().clone());
        (
            Self {
                reconciler,
                events,
                state,
                notifier,
                navigator,
            },
            state_rx,
        )
    }

    /// Runs until the first terminal event has been acted on, or until every
    /// event sender is gone.
    pub async fn run(mut self) -> Reconciler {
        while let Some(event) = self.events.recv().await {
            let reaction = self.reconciler.handle(event, Instant::now().into_std());
            self.state.send_replace(self.reconciler.state().clone());
            if let Some(reaction) = reaction {
                self.perform(reaction).await;
                break;
            }
        }
        self.reconciler
    }

    async fn perform(&self, reaction: Reaction) {
        info!(
            "Session {} over, returning to {}",
            self.reconciler.session_id(),
            reaction.navigation
        );
        self.notifier.notify(reaction.notification);
        if !reaction.delay.is_zero() {
            tokio::time::sleep(reaction.delay).await;
        }
        self.navigator.navigate(&reaction.navigation);
    }
}
