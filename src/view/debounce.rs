//! Debounced search input

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Commits a search term once input has been quiet for the delay.
///
/// Each input cancels the pending commit. Dropping the debouncer cancels it too.
/// Must be used inside a tokio runtime.
pub struct SearchDebouncer {
    delay: Duration,
    committed: Arc<watch::Sender<String>>,
    pending: Option<JoinHandle<()>>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        let (committed, _) = watch::channel(String::new());
        Self {
            delay,
            committed: Arc::new(committed),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record new input, rescheduling the commit
    pub fn input(&mut self, term: impl Into<String>) {
        self.cancel();

        let term = term.into();
        let delay = self.delay;
        let committed = Arc::clone(&self.committed);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Committing search term {:?}", term);
            committed.send_replace(term);
        }));
    }

    /// Drop the pending commit, if any
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_finished())
    }

    /// The last committed term
    pub fn committed(&self) -> String {
        self.committed.borrow().clone()
    }

    /// Receiver notified on every commit
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.committed.subscribe()
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
