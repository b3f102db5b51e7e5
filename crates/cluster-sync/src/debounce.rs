use std::time::Duration;

/// Trailing-edge debounce over an externally supplied clock.
///
/// Time is the elapsed duration since some fixed origin, so the same
/// code runs against `egui` input time and in tests.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Duration)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a new value; any earlier pending value is replaced and the
    /// window restarts.
    pub fn call(&mut self, value: T, now: Duration) {
        self.pending = Some((value, now + self.window));
    }

    /// Take the pending value once its window has passed.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due, for scheduling a repaint.
    pub fn due_in(&self, now: Duration) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, due)| due.saturating_sub(now))
    }
}
