//! Debounced commit scheduling.

use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Default quiet window before a commit fires.
pub const DEFAULT_COMMIT_WINDOW: Duration = Duration::from_millis(100);

/// A cancellable, re-armable deadline that coalesces a burst of mutations
/// into one commit.
///
/// Widgets call [`Debouncer::schedule`] on every local mutation and
/// [`Debouncer::fire_due`] from their tick; each `schedule` replaces the
/// deadline, so only the trailing edge of a burst fires. [`Debouncer::flush`]
/// is the forced path for pointer-up: it reports whether a commit was still
/// pending so the caller can make the committed state match the last visual
/// state exactly.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// The configured quiet window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm (or re-arm) the deadline at `now + window`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// Whether a commit is pending.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire once when the deadline has passed; disarms.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm, reporting whether a commit was pending.
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMIT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_due_before_window() {
        let mut debouncer = Debouncer::default();
        let now = Instant::now();
        debouncer.schedule(now);

        assert!(!debouncer.fire_due(now));
        assert!(!debouncer.fire_due(now + Duration::from_millis(50)));
        assert!(debouncer.is_pending());
    }

    #[test]
    fn test_fires_once_after_window() {
        let mut debouncer = Debouncer::default();
        let now = Instant::now();
        debouncer.schedule(now);

        assert!(debouncer.fire_due(now + Duration::from_millis(100)));
        assert!(!debouncer.fire_due(now + Duration::from_millis(200)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_reschedule_coalesces() {
        let mut debouncer = Debouncer::default();
        let now = Instant::now();

        // Five rapid mutations, 10 ms apart: only the trailing edge fires.
        let mut fired = 0;
        for i in 0..5 {
            let t = now + Duration::from_millis(10 * i);
            debouncer.schedule(t);
            if debouncer.fire_due(t) {
                fired += 1;
            }
        }
        assert_eq!(fired, 0);
        assert!(debouncer.fire_due(now + Duration::from_millis(140)));
        assert!(!debouncer.fire_due(now + Duration::from_millis(300)));
    }

    #[test]
    fn test_flush_reports_pending() {
        let mut debouncer = Debouncer::default();
        let now = Instant::now();

        assert!(!debouncer.flush());
        debouncer.schedule(now);
        assert!(debouncer.flush());
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancel_discards_deadline() {
        let mut debouncer = Debouncer::default();
        let now = Instant::now();
        debouncer.schedule(now);
        debouncer.cancel();

        assert!(!debouncer.fire_due(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_rearm_after_fire() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        let now = Instant::now();

        debouncer.schedule(now);
        assert!(debouncer.fire_due(now + Duration::from_millis(60)));

        debouncer.schedule(now + Duration::from_millis(70));
        assert!(!debouncer.fire_due(now + Duration::from_millis(100)));
        assert!(debouncer.fire_due(now + Duration::from_millis(120)));
    }
}
