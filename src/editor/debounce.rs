//! Trailing-edge debouncer.
//!
//! Every observed value restarts the quiet window. When the window elapses
//! without another change, the latest value is published and handed to the
//! settle callback. Publication always happens on a spawned task, even with a
//! zero delay, so callers never observe it synchronously from `observe`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::debug;

type SettleFn<T> = Box<dyn Fn(T) + Send + Sync>;

pub struct Debouncer<T> {
    delay: Duration,
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    on_settle: SettleFn<T>,
}

struct Slot<T> {
    latest: T,
    published: T,
    timer: Option<Timer>,
    next_ticket: u64,
    disposed: bool,
}

/// Armed timer. The ticket lets a timer that already woke up detect that it
/// was superseded before it could take the lock.
struct Timer {
    ticket: u64,
    handle: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Create a debouncer whose published value starts as `initial`.
    ///
    /// Must be used from within a tokio runtime.
    pub fn new(initial: T, delay: Duration, on_settle: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    latest: initial.clone(),
                    published: initial,
                    timer: None,
                    next_ticket: 0,
                    disposed: false,
                }),
                on_settle: Box::new(on_settle),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a new value and restart the quiet window.
    ///
    /// A value equal to the published one disarms any pending timer instead.
    pub fn observe(&self, value: T) {
        let mut slot = self.shared.slot.lock();
        if slot.disposed {
            return;
        }
        slot.cancel();
        if value == slot.published {
            slot.latest = value;
            return;
        }
        slot.latest = value;
        slot.next_ticket += 1;
        let ticket = slot.next_ticket;

        // the window starts now, not when the timer task is first polled
        let deadline = Instant::now() + self.delay;
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.fire(ticket);
        });
        slot.timer = Some(Timer { ticket, handle });
    }

    /// Publish the latest observed value now, skipping the remaining window.
    pub fn force_flush(&self) {
        let value = {
            let mut slot = self.shared.slot.lock();
            if slot.disposed {
                return;
            }
            slot.cancel();
            slot.published = slot.latest.clone();
            slot.published.clone()
        };
        debug!("editor"; "debounce flushed");
        (self.shared.on_settle)(value);
    }

    /// True while a timer is armed.
    pub fn is_pending(&self) -> bool {
        self.shared.slot.lock().timer.is_some()
    }

    /// Most recently published value.
    pub fn debounced(&self) -> T {
        self.shared.slot.lock().published.clone()
    }

    /// Cancel any pending timer and ignore all later calls.
    pub fn dispose(&self) {
        let mut slot = self.shared.slot.lock();
        slot.disposed = true;
        slot.cancel();
    }
}

impl<T> Shared<T>
where
    T: Clone,
{
    fn fire(&self, ticket: u64) {
        let value = {
            let mut slot = self.slot.lock();
            match &slot.timer {
                Some(timer) if timer.ticket == ticket && !slot.disposed => {}
                _ => return,
            }
            slot.timer = None;
            slot.published = slot.latest.clone();
            slot.published.clone()
        };
        debug!("editor"; "debounce settled (timer {})", ticket);
        (self.on_settle)(value);
    }
}

impl<T> Slot<T> {
    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        slot.disposed = true;
        slot.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::test_util::{advance, settle};

    fn recording(initial: &str, delay_ms: u64) -> (Debouncer<String>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debouncer = Debouncer::new(initial.to_string(), Duration::from_millis(delay_ms), move |v| {
            sink.lock().push(v)
        });
        (debouncer, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_collapses_rapid_changes() {
        let (debouncer, seen) = recording("", 300);
        for value in ["#", "# H", "# He", "# Hello"] {
            debouncer.observe(value.to_string());
            advance(50).await;
        }
        assert!(seen.lock().is_empty());
        assert_eq!(debouncer.debounced(), "");

        advance(300).await;
        assert_eq!(*seen.lock(), vec!["# Hello".to_string()]);
        assert_eq!(debouncer.debounced(), "# Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_after_quiet_window() {
        let (debouncer, seen) = recording("", 300);
        debouncer.observe("a".to_string());
        advance(299).await;
        assert!(seen.lock().is_empty());
        assert!(debouncer.is_pending());

        advance(1).await;
        assert_eq!(*seen.lock(), vec!["a".to_string()]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_value_is_not_armed() {
        let (debouncer, seen) = recording("same", 300);
        debouncer.observe("same".to_string());
        assert!(!debouncer.is_pending());
        advance(400).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_disarms_timer() {
        let (debouncer, seen) = recording("a", 300);
        debouncer.observe("ab".to_string());
        assert!(debouncer.is_pending());
        debouncer.observe("a".to_string());
        assert!(!debouncer.is_pending());
        advance(400).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_is_deferred() {
        let (debouncer, seen) = recording("", 0);
        debouncer.observe("x".to_string());
        assert!(seen.lock().is_empty());
        assert!(debouncer.is_pending());

        advance(1).await;
        assert_eq!(*seen.lock(), vec!["x".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_flush() {
        let (debouncer, seen) = recording("", 300);
        debouncer.observe("now".to_string());
        debouncer.force_flush();
        assert_eq!(*seen.lock(), vec!["now".to_string()]);
        assert!(!debouncer.is_pending());

        // the cancelled timer must not publish again
        advance(400).await;
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_and_ignores() {
        let (debouncer, seen) = recording("", 300);
        debouncer.observe("a".to_string());
        debouncer.dispose();
        assert!(!debouncer.is_pending());

        debouncer.observe("b".to_string());
        debouncer.force_flush();
        advance(400).await;
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (debouncer, seen) = recording("", 300);
        debouncer.observe("a".to_string());
        drop(debouncer);
        advance(400).await;
        settle().await;
        assert!(seen.lock().is_empty());
    }
}
