//! Session lifecycle state machine.
//!
//! The video backend may report a single logical termination under several
//! event names (`call.ended`, `call.session_ended`, a last participant
//! leaving, a disconnect), in no guaranteed order. [`Reconciler`] folds them
//! into one lifecycle: the first terminal event wins, everything after it is
//! dropped, so the UI notifies and navigates exactly once.
//!
//! Time is injected as [`Instant`] so the machine stays pure.

use crate::session_id::SessionId;
use crate::types::events::{CallingState, SessionEvent};
use crate::types::navigation::NavigationTarget;
use crate::types::notification::Notification;
use crate::types::participant::Counterpart;
use log::debug;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a session reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Ended for everyone by the other side.
    RemoteEnded,
    /// The last other participant left.
    ParticipantsLeft,
    /// The backend moved our calling state to `left`.
    Left,
    /// We ended the call ourselves.
    LocalEnded,
    /// We tried to end the call and the backend refused both end and leave.
    LocalEndFailed,
    /// Abnormal connection loss.
    ConnectionLost,
    /// The backend moved our calling state to `offline`.
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionLifecycleState {
    #[default]
    Connecting,
    /// Pre-join substate, only surfaced for display.
    Ringing,
    Joined {
        joined_at: Instant,
    },
    Ended {
        reason: EndReason,
        duration: Duration,
    },
    Disconnected {
        reason: EndReason,
        duration: Duration,
    },
}

impl SessionLifecycleState {
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended { .. } | Self::Disconnected { .. })
    }

    /// Time spent in `Joined`; zero in every other state.
    pub fn duration(&self, now: Instant) -> Duration {
        match self {
            Self::Joined { joined_at } => now.saturating_duration_since(*joined_at),
            _ => Duration::ZERO,
        }
    }

    /// Status line shown under the call timer.
    pub fn status_line(&self, now: Instant) -> String {
        match self {
            Self::Joined { .. } => {
                format!("Connected • {}", format_duration(self.duration(now).as_secs()))
            }
            Self::Ringing => "Ringing...".to_string(),
            _ => "Connecting...".to_string(),
        }
    }
}

/// Side effects the UI performs for one terminal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub notification: Notification,
    pub navigation: NavigationTarget,
    /// How long to wait before navigating.
    pub delay: Duration,
}

#[derive(Debug, Clone, Error)]
#[error("{attempted:?} does not apply in state {state:?}")]
pub struct InvalidTransition {
    pub state: SessionLifecycleState,
    pub attempted: SessionEvent,
}

pub const PARTICIPANT_LEFT_DELAY: Duration = Duration::from_secs(2);
pub const OFFLINE_DELAY: Duration = Duration::from_secs(1);
pub const LOCAL_END_DELAY: Duration = Duration::from_millis(500);

/// Lifecycle of one session instance.
#[derive(Debug, Clone)]
pub struct Reconciler {
    session_id: SessionId,
    counterpart: Counterpart,
    state: SessionLifecycleState,
    /// Set once the local user asked to end the call.
    local_end_pending: bool,
}

impl Reconciler {
    pub fn new(session_id: SessionId, counterpart: Counterpart) -> Self {
        Self {
            session_id,
            counterpart,
            state: SessionLifecycleState::Connecting,
            local_end_pending: false,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn counterpart(&self) -> &Counterpart {
        &self.counterpart
    }

    pub fn state(&self) -> &SessionLifecycleState {
        &self.state
    }

    pub fn duration(&self, now: Instant) -> Duration {
        self.state.duration(now)
    }

    pub fn status_line(&self, now: Instant) -> String {
        self.state.status_line(now)
    }

    /// Applies one event. Returns the reaction when, and only when, this
    /// event is the first terminal event of the session.
    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Option<Reaction> {
        if self.state.is_terminal() {
            debug!(
                "Session {} already over, dropping {:?}",
                self.session_id, event
            );
            return None;
        }

        if event == SessionEvent::LocalEndRequested {
            self.local_end_pending = true;
            return None;
        }
        // While our own end request is in flight, the backend echoing the
        // end back to us is still our end.
        let event = match event {
            SessionEvent::Ended
            | SessionEvent::ParticipantLeft { remaining: 0 }
            | SessionEvent::CallingState(CallingState::Left)
                if self.local_end_pending =>
            {
                SessionEvent::LocalEnd { ok: true }
            }
            other => other,
        };

        if let Err(e) = self.apply(event, now) {
            debug!("Session {}: {}", self.session_id, e);
            return None;
        }

        if !self.state.is_terminal() {
            return None;
        }

        let (notification, delay) = reaction_for(event);
        Some(Reaction {
            notification,
            navigation: self.counterpart.return_target(),
            delay,
        })
    }

    fn apply(&mut self, event: SessionEvent, now: Instant) -> Result<(), InvalidTransition> {
        use SessionLifecycleState as S;

        let new_state = match (&self.state, event) {
            (S::Connecting | S::Ringing, SessionEvent::CallingState(CallingState::Joined)) => {
                S::Joined { joined_at: now }
            }
            // The timer runs from the first join, reconnects keep it.
            (S::Joined { .. }, SessionEvent::CallingState(CallingState::Joined)) => return Ok(()),
            (S::Connecting, SessionEvent::CallingState(CallingState::Ringing)) => S::Ringing,
            (
                _,
                SessionEvent::CallingState(
                    CallingState::Idle | CallingState::Joining | CallingState::Reconnecting,
                ),
            ) => return Ok(()),
            (_, SessionEvent::ParticipantLeft { remaining }) if remaining > 0 => return Ok(()),
            (current, event) if event.is_terminal() => {
                let duration = current.duration(now);
                match end_reason(event) {
                    reason @ (EndReason::ConnectionLost | EndReason::Offline) => {
                        S::Disconnected { reason, duration }
                    }
                    reason => S::Ended { reason, duration },
                }
            }
            (current, event) => {
                return Err(InvalidTransition {
                    state: current.clone(),
                    attempted: event,
                });
            }
        };
        self.state = new_state;
        Ok(())
    }
}

fn end_reason(event: SessionEvent) -> EndReason {
    match event {
        SessionEvent::Ended => EndReason::RemoteEnded,
        SessionEvent::ParticipantLeft { .. } => EndReason::ParticipantsLeft,
        SessionEvent::Disconnected => EndReason::ConnectionLost,
        SessionEvent::LocalEnd { ok: true } | SessionEvent::LocalEndRequested => {
            EndReason::LocalEnded
        }
        SessionEvent::LocalEnd { ok: false } => EndReason::LocalEndFailed,
        SessionEvent::CallingState(CallingState::Offline) => EndReason::Offline,
        SessionEvent::CallingState(_) => EndReason::Left,
    }
}

fn reaction_for(event: SessionEvent) -> (Notification, Duration) {
    match end_reason(event) {
        EndReason::RemoteEnded => (
            Notification::info("Call ended by the other participant"),
            Duration::ZERO,
        ),
        EndReason::ParticipantsLeft => (
            Notification::info("Other participant left the call"),
            PARTICIPANT_LEFT_DELAY,
        ),
        EndReason::ConnectionLost => (Notification::error("Call disconnected"), Duration::ZERO),
        EndReason::Left => (Notification::info("Call ended"), Duration::ZERO),
        EndReason::Offline => (Notification::error("Connection lost"), OFFLINE_DELAY),
        EndReason::LocalEnded => (Notification::success("Call ended"), LOCAL_END_DELAY),
        EndReason::LocalEndFailed => (Notification::error("Error ending call"), LOCAL_END_DELAY),
    }
}

/// `MM:SS`, or `HH:MM:SS` from one hour on.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours:02}:{mins:02}:{secs:02}")
    } else {
        format!("{mins:02}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::notification::NotificationKind;

    fn reconciler(counterpart: Counterpart) -> Reconciler {
        Reconciler::new(SessionId::parse("u42-u7").unwrap(), counterpart)
    }

    fn known() -> Counterpart {
        Counterpart::Known("u7".parse().unwrap())
    }

    fn joined(r: &mut Reconciler, at: Instant) {
        assert!(r
            .handle(SessionEvent::CallingState(CallingState::Joined), at)
            .is_none());
        assert!(r.state().is_joined());
    }

    #[test]
    fn connecting_to_joined_starts_the_timer() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        assert_eq!(r.duration(t0), Duration::ZERO);
        assert_eq!(r.status_line(t0), "Connecting...");

        joined(&mut r, t0);
        let later = t0 + Duration::from_secs(75);
        assert_eq!(r.duration(later), Duration::from_secs(75));
        assert_eq!(r.status_line(later), "Connected • 01:15");
    }

    #[test]
    fn repeated_join_keeps_first_join_instant() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);
        joined(&mut r, t0 + Duration::from_secs(10));
        assert_eq!(
            r.duration(t0 + Duration::from_secs(30)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn ringing_is_pre_join_only() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        r.handle(SessionEvent::CallingState(CallingState::Ringing), t0);
        assert_eq!(r.state(), &SessionLifecycleState::Ringing);
        assert_eq!(r.status_line(t0), "Ringing...");

        joined(&mut r, t0);
        r.handle(SessionEvent::CallingState(CallingState::Ringing), t0);
        assert!(r.state().is_joined());
    }

    #[test]
    fn first_terminal_event_wins() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);

        let events = [
            SessionEvent::Ended,
            SessionEvent::ParticipantLeft { remaining: 0 },
            SessionEvent::Disconnected,
        ];
        let reactions: Vec<Reaction> = events
            .into_iter()
            .filter_map(|e| r.handle(e, t0 + Duration::from_secs(5)))
            .collect();

        assert_eq!(reactions.len(), 1);
        assert_eq!(
            reactions[0].notification,
            Notification::info("Call ended by the other participant")
        );
        assert_eq!(reactions[0].navigation.path(), "/chat/u7");
        assert_eq!(
            r.state(),
            &SessionLifecycleState::Ended {
                reason: EndReason::RemoteEnded,
                duration: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn terminal_state_resets_the_counter() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);
        r.handle(SessionEvent::Disconnected, t0 + Duration::from_secs(3));
        assert_eq!(r.duration(t0 + Duration::from_secs(60)), Duration::ZERO);
        assert!(matches!(
            r.state(),
            SessionLifecycleState::Disconnected {
                reason: EndReason::ConnectionLost,
                ..
            }
        ));
    }

    #[test]
    fn participant_left_with_others_remaining_is_not_terminal() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);
        assert!(r
            .handle(SessionEvent::ParticipantLeft { remaining: 2 }, t0)
            .is_none());
        assert!(r.state().is_joined());

        let reaction = r
            .handle(SessionEvent::ParticipantLeft { remaining: 0 }, t0)
            .unwrap();
        assert_eq!(reaction.delay, PARTICIPANT_LEFT_DELAY);
    }

    #[test]
    fn unknown_counterpart_navigates_home() {
        let t0 = Instant::now();
        let mut r = reconciler(Counterpart::Unknown);
        let reaction = r
            .handle(SessionEvent::CallingState(CallingState::Offline), t0)
            .unwrap();
        assert_eq!(reaction.navigation, NavigationTarget::Home);
        assert_eq!(reaction.notification.kind, NotificationKind::Error);
        assert_eq!(reaction.delay, OFFLINE_DELAY);
    }

    #[test]
    fn local_end_suppresses_the_remote_echo() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);
        let reaction = r.handle(SessionEvent::LocalEnd { ok: true }, t0).unwrap();
        assert_eq!(reaction.notification, Notification::success("Call ended"));
        assert_eq!(reaction.delay, LOCAL_END_DELAY);
        assert!(r.handle(SessionEvent::Ended, t0).is_none());
        assert!(
            r.handle(SessionEvent::CallingState(CallingState::Left), t0)
                .is_none()
        );
    }

    #[test]
    fn remote_end_during_local_end_counts_as_local() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);
        assert!(r.handle(SessionEvent::LocalEndRequested, t0).is_none());
        assert!(r.state().is_joined());

        let reaction = r.handle(SessionEvent::Ended, t0).unwrap();
        assert_eq!(reaction.notification, Notification::success("Call ended"));
        assert_eq!(reaction.delay, LOCAL_END_DELAY);
        assert!(matches!(
            r.state(),
            SessionLifecycleState::Ended {
                reason: EndReason::LocalEnded,
                ..
            }
        ));
        assert!(r.handle(SessionEvent::LocalEnd { ok: true }, t0).is_none());
    }

    #[test]
    fn disconnect_during_local_end_is_still_an_error() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);
        r.handle(SessionEvent::LocalEndRequested, t0);
        let reaction = r.handle(SessionEvent::Disconnected, t0).unwrap();
        assert_eq!(reaction.notification, Notification::error("Call disconnected"));
    }

    #[test]
    fn invalid_transition_is_dropped() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        joined(&mut r, t0);
        let err = r
            .apply(SessionEvent::CallingState(CallingState::Ringing), t0)
            .unwrap_err();
        assert_eq!(err.attempted, SessionEvent::CallingState(CallingState::Ringing));
        assert!(err.state.is_joined());
        assert!(r.state().is_joined());
    }

    #[test]
    fn ended_before_join_is_still_terminal() {
        let t0 = Instant::now();
        let mut r = reconciler(known());
        let reaction = r.handle(SessionEvent::Ended, t0);
        assert!(reaction.is_some());
        assert!(matches!(
            r.state(),
            SessionLifecycleState::Ended {
                duration: Duration::ZERO,
                ..
            }
        ));
    }

    #[test]
    fn durations_format_like_a_call_timer() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(61), "01:01");
        assert_eq!(format_duration(3600), "01:00:00");
        assert_eq!(format_duration(3_725), "01:02:05");
    }
}
