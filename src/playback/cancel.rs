// Cooperative cancellation shared by one play cycle's workers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable stop flag. A fresh token is created for every play cycle, so a
/// cancelled token never needs clearing.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep until `deadline` in slices of at most `poll`.
    /// Returns `false` as soon as the token is cancelled.
    pub fn sleep_until(&self, deadline: Instant, poll: Duration) -> bool {
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(poll.min(deadline - now));
        }
    }

    pub fn sleep_for(&self, duration: Duration, poll: Duration) -> bool {
        self.sleep_until(Instant::now() + duration, poll)
    }
}
