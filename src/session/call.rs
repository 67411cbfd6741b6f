use super::backend::{Navigator, Notifier, VideoCall};
use super::bootstrap::SessionTarget;
use super::controls::CallControls;
use super::lifecycle::{EventSubscription, LifecycleDriver};
use log::debug;
use meetcore::SessionId;
use meetcore::lifecycle::{Reconciler, SessionLifecycleState};
use meetcore::types::{Counterpart, SessionEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A joined call.
///
/// Owns the lifecycle subscription and the driver task. Dropping the
/// session unsubscribes every handler, stops the driver and, if the call is
/// still live, fires a best-effort leave without waiting for it.
pub struct CallSession {
    target: SessionTarget,
    call: Arc<dyn VideoCall>,
    controls: CallControls,
    state: watch::Receiver<SessionLifecycleState>,
    subscription: Option<EventSubscription>,
    driver: Option<JoinHandle<Reconciler>>,
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("target", &self.target)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CallSession {
    pub(crate) fn start(
        target: SessionTarget,
        call: Arc<dyn VideoCall>,
        subscription: EventSubscription,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
        events_rx: mpsc::UnboundedReceiver<SessionEvent>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let reconciler = Reconciler::new(target.session_id.clone(), target.counterpart().clone());
        let (driver, state) = LifecycleDriver::new(reconciler, events_rx, notifier.clone(), navigator);
        let driver = tokio::spawn(driver.run());
        let controls = CallControls::new(call.clone(), events_tx, notifier);
        Self {
            target,
            call,
            controls,
            state,
            subscription: Some(subscription),
            driver: Some(driver),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.target.session_id
    }

    pub fn target(&self) -> &SessionTarget {
        &self.target
    }

    pub fn counterpart(&self) -> &Counterpart {
        self.target.counterpart()
    }

    pub fn controls(&self) -> &CallControls {
        &self.controls
    }

    pub fn state(&self) -> SessionLifecycleState {
        self.state.borrow().clone()
    }

    /// Time in the call so far; zero unless joined.
    pub fn duration(&self) -> Duration {
        self.state.borrow().duration(Instant::now().into_std())
    }

    pub fn status_line(&self) -> String {
        self.state.borrow().status_line(Instant::now().into_std())
    }

    /// Waits until the driver has notified and navigated for the terminal
    /// event, and returns the final lifecycle state. `None` if the driver
    /// stopped without one.
    pub async fn finished(&mut self) -> Option<SessionLifecycleState> {
        let driver = self.driver.take()?;
        match driver.await {
            Ok(reconciler) if reconciler.state().is_terminal() => Some(reconciler.state().clone()),
            Ok(_) => None,
            Err(e) => {
                debug!("Lifecycle driver for {} stopped: {}", self.session_id(), e);
                None
            }
        }
    }

    /// Releases the session. Same as dropping it.
    pub fn release(self) {}
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.subscription.take();
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }

        if self.state.borrow().is_terminal() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime to leave call {}", self.session_id());
            return;
        };
        let call = self.call.clone();
        runtime.spawn(async move {
            if let Err(e) = call.leave().await {
                debug!("Best-effort leave of {} failed: {}", call.id(), e);
            }
        });
    }
}
