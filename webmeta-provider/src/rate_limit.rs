use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Duration, Instant};

/// Enforces a minimum gap between requests to one provider.
///
/// The permit returned by [`acquire`](Self::acquire) holds the lock for the
/// whole request, so calls through one limiter never overlap. The gap is
/// measured from the end of the previous request.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        let start = Instant::now()
            .checked_sub(interval)
            .unwrap_or_else(Instant::now);
        Self {
            interval,
            last_request: Arc::new(Mutex::new(start)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the interval since the last request has passed.
    pub async fn acquire(&self) -> RatePermit<'_> {
        let last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.interval {
            tokio::time::sleep(self.interval - elapsed).await;
        }
        RatePermit { last }
    }
}

/// Held for the duration of one request.
pub struct RatePermit<'a> {
    last: MutexGuard<'a, Instant>,
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        *self.last = Instant::now();
    }
}
