//! Debounced alert gate.
//!
//! The gate holds the single piece of state shared between concurrent
//! detection units: the instant of the last fired alert. `try_fire` is one
//! check-then-set critical section, so however many detections race within a
//! cooldown window, exactly one of them is authorized to notify.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of one gate attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// This detection owns the notification for the current window.
    Fired,
    /// A prior alert fired less than one cooldown ago.
    Suppressed,
}

/// Cooldown-enforcing gate between detections and notifications.
///
/// Gating runs on monotonic [`Instant`]s; wall-clock time is only used for
/// rendering the message text and never feeds the cooldown arithmetic.
pub struct AlertGate {
    cooldown: Duration,
    last_fired: Mutex<Option<Instant>>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Attempt to fire an alert for a detection observed at `at`.
    ///
    /// Fires when no alert has fired yet, or when `at` is at least one
    /// cooldown after the last fired instant. A detection ordered before the
    /// last fired instant saturates to zero elapsed and is suppressed.
    pub fn try_fire(&self, at: Instant) -> GateOutcome {
        let mut last = self
            .last_fired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let allowed = match *last {
            None => true,
            Some(prev) => at.saturating_duration_since(prev) >= self.cooldown,
        };
        if allowed {
            *last = Some(at);
            GateOutcome::Fired
        } else {
            GateOutcome::Suppressed
        }
    }

    /// Instant of the last fired alert, if any.
    pub fn last_fired(&self) -> Option<Instant> {
        *self
            .last_fired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_detection_fires() {
        let gate = AlertGate::new(Duration::from_secs(180));
        assert_eq!(gate.try_fire(Instant::now()), GateOutcome::Fired);
    }

    #[test]
    fn cooldown_suppresses_then_reopens() {
        // cooldown = 3 minutes; detections at 0:00, 1:00, 4:00
        let gate = AlertGate::new(Duration::from_secs(180));
        let t0 = Instant::now();

        assert_eq!(gate.try_fire(t0), GateOutcome::Fired);
        assert_eq!(
            gate.try_fire(t0 + Duration::from_secs(60)),
            GateOutcome::Suppressed
        );
        assert_eq!(
            gate.try_fire(t0 + Duration::from_secs(240)),
            GateOutcome::Fired
        );
    }

    #[test]
    fn suppressed_attempt_does_not_extend_the_window() {
        let gate = AlertGate::new(Duration::from_secs(180));
        let t0 = Instant::now();

        assert_eq!(gate.try_fire(t0), GateOutcome::Fired);
        assert_eq!(
            gate.try_fire(t0 + Duration::from_secs(179)),
            GateOutcome::Suppressed
        );
        // The window still measures from t0, not from the suppressed attempt.
        assert_eq!(
            gate.try_fire(t0 + Duration::from_secs(180)),
            GateOutcome::Fired
        );
    }

    #[test]
    fn exact_cooldown_boundary_fires() {
        let gate = AlertGate::new(Duration::from_secs(180));
        let t0 = Instant::now();
        gate.try_fire(t0);
        assert_eq!(
            gate.try_fire(t0 + Duration::from_secs(180)),
            GateOutcome::Fired
        );
    }

    #[test]
    fn detection_older_than_last_fire_is_suppressed() {
        let gate = AlertGate::new(Duration::from_secs(180));
        let t0 = Instant::now();
        gate.try_fire(t0 + Duration::from_secs(60));
        assert_eq!(gate.try_fire(t0), GateOutcome::Suppressed);
    }

    #[test]
    fn concurrent_same_instant_detections_fire_exactly_once() {
        let gate = Arc::new(AlertGate::new(Duration::from_secs(180)));
        let at = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.try_fire(at))
            })
            .collect();

        let outcomes: Vec<GateOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let fired = outcomes
            .iter()
            .filter(|o| **o == GateOutcome::Fired)
            .count();

        assert_eq!(fired, 1);
        assert_eq!(outcomes.len() - fired, 7);
    }

    #[test]
    fn concurrent_fired_outcomes_are_a_cooldown_apart() {
        // Hammer the gate from several threads with increasing timestamps and
        // check the recorded fire instants afterwards.
        let cooldown = Duration::from_secs(30);
        let gate = Arc::new(AlertGate::new(cooldown));
        let base = Instant::now();

        let fired = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..4)
            .map(|lane| {
                let gate = gate.clone();
                let fired = fired.clone();
                std::thread::spawn(move || {
                    for step in 0..100u64 {
                        let at = base + Duration::from_secs(step) + Duration::from_millis(lane);
                        if gate.try_fire(at) == GateOutcome::Fired {
                            fired.lock().unwrap().push(at);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut fired = fired.lock().unwrap().clone();
        fired.sort();
        for pair in fired.windows(2) {
            assert!(pair[1].saturating_duration_since(pair[0]) >= cooldown);
        }
    }
}
