//! Rate-limiting primitives driven by an explicit clock.
//!
//! Both types are plain state machines: the owner feeds them events with the
//! current instant and sleeps until [`Throttle::deadline`] /
//! [`Debounce::deadline`] inside its own `select!` loop.

use std::time::Duration;

use tokio::time::Instant;

/// Leading + trailing throttle. The first event of a window fires at once;
/// further events inside the window collapse into one trailing fire at the
/// window end, which opens the next window.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    window_end: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_end: None,
            pending: false,
        }
    }

    /// Records an event; `true` means emit now.
    pub fn offer(&mut self, now: Instant) -> bool {
        match self.window_end {
            Some(end) if now < end => {
                self.pending = true;
                false
            }
            _ => {
                self.window_end = Some(now + self.window);
                self.pending = false;
                true
            }
        }
    }

    /// When the trailing emit is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending {
            self.window_end
        } else {
            None
        }
    }

    /// `true` when a trailing emit is due at `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.window_end {
            Some(end) if self.pending && now >= end => {
                self.pending = false;
                self.window_end = Some(now + self.window);
                true
            }
            _ => false,
        }
    }

    /// Drops any pending trailing emit and closes the window.
    pub fn cancel(&mut self) {
        self.pending = false;
        self.window_end = None;
    }
}

/// Quiet-period debounce with consecutive-duplicate suppression.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
    last: Option<T>,
}

impl<T: Clone + PartialEq> Debounce<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last: None,
        }
    }

    /// Replaces the pending value and restarts the quiet period.
    pub fn offer(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.quiet));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Emits the settled value, unless it equals the previous emission.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now >= *at => {}
            _ => return None,
        }
        let (value, _) = self.pending.take()?;
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value.clone());
        Some(value)
    }
}

/// Sleeps until `deadline`, or forever when there is none.
pub async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn throttle_leads_then_trails_once() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WINDOW);

        assert!(throttle.offer(start));
        assert!(!throttle.offer(start + Duration::from_millis(10)));
        assert!(!throttle.offer(start + Duration::from_millis(50)));
        assert_eq!(throttle.deadline(), Some(start + WINDOW));

        assert!(!throttle.fire(start + Duration::from_millis(99)));
        assert!(throttle.fire(start + WINDOW));
        assert!(throttle.deadline().is_none());
    }

    #[test]
    fn trailing_emit_opens_a_new_window() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        throttle.offer(start);
        throttle.offer(start + Duration::from_millis(20));
        assert!(throttle.fire(start + WINDOW));

        assert!(!throttle.offer(start + Duration::from_millis(150)));
        assert_eq!(throttle.deadline(), Some(start + 2 * WINDOW));
    }

    #[test]
    fn quiet_throttle_leads_again() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        assert!(throttle.offer(start));
        assert!(throttle.offer(start + Duration::from_millis(250)));
    }

    #[test]
    fn cancel_discards_trailing() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        throttle.offer(start);
        throttle.offer(start + Duration::from_millis(10));
        throttle.cancel();
        assert!(throttle.deadline().is_none());
        assert!(!throttle.fire(start + WINDOW));
    }

    #[test]
    fn debounce_emits_last_value_after_quiet_period() {
        let start = Instant::now();
        let quiet = Duration::from_millis(300);
        let mut debounce = Debounce::new(quiet);

        debounce.offer("s", start);
        debounce.offer("sc", start + Duration::from_millis(100));
        assert_eq!(debounce.fire(start + Duration::from_millis(300)), None);
        assert_eq!(debounce.fire(start + Duration::from_millis(400)), Some("sc"));
        assert_eq!(debounce.deadline(), None);
    }

    #[test]
    fn debounce_suppresses_consecutive_duplicates() {
        let start = Instant::now();
        let quiet = Duration::from_millis(300);
        let mut debounce = Debounce::new(quiet);

        debounce.offer("a", start);
        assert_eq!(debounce.fire(start + quiet), Some("a"));
        debounce.offer("a", start + Duration::from_secs(1));
        assert_eq!(debounce.fire(start + Duration::from_secs(2)), None);
        debounce.offer("b", start + Duration::from_secs(3));
        assert_eq!(debounce.fire(start + Duration::from_secs(4)), Some("b"));
    }
}
