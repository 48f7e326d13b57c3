//! Transient holder of the most recent scanned content.
//!
//! Content stays visible for a fixed display window after each
//! [`set`](TransientResultStore::set). A newer `set` replaces the content
//! and restarts the window; the expiry scheduled by the older `set` is
//! aborted, and a generation check keeps a timer that already fired from
//! clearing newer content.
//!
//! Expiry is enforced twice: a background task clears the store and
//! notifies subscribers when the window ends, and every
//! [`current`](TransientResultStore::current) call checks the deadline, so
//! the store is correct even without a runtime to run the task.
//!
//! ```text
//! set("A") ──> gen 1, timer 1 ──┐
//! set("B") ──> gen 2, timer 2   ├─ timer 1 aborted
//!                  │            ┘
//!                  └── window elapses ──> cleared, subscribers get None
//! ```

use nfctap_core::ScannedContent;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
struct StoreState {
    content: Option<ScannedContent>,
    expires_at: Option<Instant>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl StoreState {
    /// Drop content and any pending timer. Returns whether content was held.
    fn reset(&mut self) -> bool {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation += 1;
        self.expires_at = None;
        self.content.take().is_some()
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<StoreState>,
    tx: watch::Sender<Option<ScannedContent>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        // The running timer is this task; detach instead of aborting it
        state.timer = None;
        let cleared = state.reset();
        drop(state);

        if cleared {
            debug!("Scanned content expired");
            self.tx.send_replace(None);
        }
    }
}

/// Holds at most one [`ScannedContent`] for a display window.
///
/// # Examples
///
/// ```
/// use nfctap_engine::store::TransientResultStore;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = TransientResultStore::new(Duration::from_secs(10));
/// store.set("hello");
/// assert_eq!(store.current().unwrap().text, "hello");
///
/// store.clear();
/// assert!(store.current().is_none());
/// # }
/// ```
#[derive(Debug)]
pub struct TransientResultStore {
    shared: Arc<Shared>,
    window: Duration,
}

impl TransientResultStore {
    pub fn new(window: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::default()),
                tx,
            }),
            window,
        }
    }

    /// Replace the content and restart the display window.
    pub fn set(&self, text: impl Into<String>) {
        let content = ScannedContent::new(text);
        let expires_at = Instant::now() + self.window;

        let mut state = self.shared.lock();
        state.reset();
        let generation = state.generation;
        state.content = Some(content.clone());
        state.expires_at = Some(expires_at);
        state.timer = self.spawn_expiry(generation, expires_at);
        drop(state);

        debug!(generation, "Scanned content set");
        self.shared.tx.send_replace(Some(content));
    }

    /// Empty the store now.
    pub fn clear(&self) {
        let cleared = self.shared.lock().reset();
        if cleared {
            debug!("Scanned content dismissed");
            self.shared.tx.send_replace(None);
        }
    }

    /// Content still inside its display window, if any.
    pub fn current(&self) -> Option<ScannedContent> {
        let mut state = self.shared.lock();
        if state.is_expired(Instant::now()) {
            let cleared = state.reset();
            drop(state);
            if cleared {
                self.shared.tx.send_replace(None);
            }
            return None;
        }
        state.content.clone()
    }

    /// Watch the content; receivers see `None` on expiry and dismissal.
    pub fn subscribe(&self) -> watch::Receiver<Option<ScannedContent>> {
        self.shared.tx.subscribe()
    }

    fn spawn_expiry(&self, generation: u64, expires_at: Instant) -> Option<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let shared = Arc::clone(&self.shared);
        Some(runtime.spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            shared.expire(generation);
        }))
    }
}

impl Drop for TransientResultStore {
    fn drop(&mut self) {
        if let Some(timer) = self.shared.lock().timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_without_runtime() {
        let store = TransientResultStore::new(Duration::from_secs(10));
        assert!(store.current().is_none());

        store.set("offline");
        assert_eq!(store.current().unwrap().text, "offline");

        store.clear();
        assert!(store.current().is_none());
    }

    #[test]
    fn test_zero_window_expires_immediately() {
        let store = TransientResultStore::new(Duration::ZERO);
        store.set("gone");
        assert!(store.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_restarts_window() {
        let store = TransientResultStore::new(Duration::from_secs(10));

        store.set("A");
        tokio::time::advance(Duration::from_secs(5)).await;
        store.set("B");

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.current().unwrap().text, "B");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_timer() {
        let store = TransientResultStore::new(Duration::from_secs(10));
        store.set("A");
        store.clear();
        assert!(store.shared.lock().timer.is_none());

        store.set("B");
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(store.current().unwrap().text, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_expiry() {
        let store = TransientResultStore::new(Duration::from_secs(10));
        let mut rx = store.subscribe();

        store.set("hello");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().text, "hello");

        // Paused clock auto-advances to the timer deadline
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
