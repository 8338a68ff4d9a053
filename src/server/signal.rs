//! One-shot cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A flag that is set once and observed by any number of tasks.
///
/// Loops poll [`ShutdownSignal::is_triggered`] between iterations; tasks
/// blocked on I/O can race their operation against [`ShutdownSignal::triggered`].
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every waiting task. Returns `false` if it was
    /// already set.
    pub fn trigger(&self) -> bool {
        let first = !self.triggered.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once the flag is set.
    pub async fn triggered(&self) {
        // Created before the check so a concurrent trigger cannot be missed
        let notified = self.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}
