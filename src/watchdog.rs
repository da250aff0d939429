use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Per-session inactivity tracker.
///
/// The session task defers it whenever something happens (a command line
/// arrives, a chunk of data goes out) and races [`Watchdog::expired`]
/// against the work in progress.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    last_activity: Arc<Mutex<Instant>>,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_activity: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pushes the expiry back to a full timeout from now.
    pub fn defer(&self) {
        *self.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.lock().elapsed()
    }

    /// Completes once no activity has been recorded for the whole timeout.
    /// A timeout too large to represent as a deadline never expires.
    pub async fn expired(&self) {
        loop {
            let last_activity = *self.lock();
            let deadline = match last_activity.checked_add(self.timeout) {
                Some(deadline) => deadline,
                None => return std::future::pending().await,
            };
            if Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep_until(deadline).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
