use super::backend::{Notifier, VideoCall};
use super::error::SessionError;
use log::{debug, error, info, warn};
use meetcore::types::{Notification, SessionEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// In-call buttons: end call and the microphone/camera toggles.
///
/// Only one action runs at a time; a second press while one is in flight
/// returns [`SessionError::Busy`] without touching the backend.
pub struct CallControls {
    call: Arc<dyn VideoCall>,
    events: mpsc::UnboundedSender<SessionEvent>,
    notifier: Arc<dyn Notifier>,
    busy: AtomicBool,
    microphone: AtomicBool,
    camera: AtomicBool,
}

impl CallControls {
    pub(crate) fn new(
        call: Arc<dyn VideoCall>,
        events: mpsc::UnboundedSender<SessionEvent>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let microphone = call.microphone_enabled().unwrap_or(true);
        let camera = call.camera_enabled().unwrap_or(true);
        Self {
            call,
            events,
            notifier,
            busy: AtomicBool::new(false),
            microphone: AtomicBool::new(microphone),
            camera: AtomicBool::new(camera),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn microphone_enabled(&self) -> bool {
        self.microphone.load(Ordering::SeqCst)
    }

    pub fn camera_enabled(&self) -> bool {
        self.camera.load(Ordering::SeqCst)
    }

    /// Ends the call for everyone, falling back to leaving it.
    ///
    /// The outcome is reported to the lifecycle driver, which owns the
    /// notification and the navigation away from the call.
    pub async fn end_call(&self) -> Result<(), SessionError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Busy);
        }
        let _guard = scopeguard::guard((), |_| {
            self.busy.store(false, Ordering::SeqCst);
        });

        info!("Ending call {} for all participants", self.call.id());
        // The backend may echo `call.ended` to us before end_call returns.
        let _ = self.events.send(SessionEvent::LocalEndRequested);
        let outcome = match self.call.end_call().await {
            Ok(()) => Ok(()),
            Err(end_err) => {
                debug!("End call failed, trying to leave: {}", end_err);
                self.call.leave().await
            }
        };

        let _ = self.events.send(SessionEvent::LocalEnd {
            ok: outcome.is_ok(),
        });
        outcome.map_err(|e| {
            warn!("Error ending call {}: {}", self.call.id(), e);
            SessionError::Connection(e)
        })
    }

    /// Returns whether the microphone is now enabled.
    pub async fn toggle_microphone(&self) -> Result<bool, SessionError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Busy);
        }
        let _guard = scopeguard::guard((), |_| {
            self.busy.store(false, Ordering::SeqCst);
        });

        let enable = !self.microphone.load(Ordering::SeqCst);
        match self.call.set_microphone(enable).await {
            Ok(()) => {
                self.microphone.store(enable, Ordering::SeqCst);
                self.notifier.notify(Notification::success(if enable {
                    "Microphone unmuted"
                } else {
                    "Microphone muted"
                }));
                Ok(enable)
            }
            Err(e) => {
                error!("Error toggling microphone: {}", e);
                self.notifier
                    .notify(Notification::error("Error toggling microphone"));
                Err(SessionError::Connection(e))
            }
        }
    }

    /// Returns whether the camera is now enabled.
    pub async fn toggle_camera(&self) -> Result<bool, SessionError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Busy);
        }
        let _guard = scopeguard::guard((), |_| {
            self.busy.store(false, Ordering::SeqCst);
        });

        let enable = !self.camera.load(Ordering::SeqCst);
        match self.call.set_camera(enable).await {
            Ok(()) => {
                self.camera.store(enable, Ordering::SeqCst);
                self.notifier.notify(Notification::success(if enable {
                    "Camera turned on"
                } else {
                    "Camera turned off"
                }));
                Ok(enable)
            }
            Err(e) => {
                error!("Error toggling camera: {}", e);
                self.notifier.notify(Notification::error("Error toggling camera"));
                Err(SessionError::Connection(e))
            }
        }
    }
}
