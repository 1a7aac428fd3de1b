//! Token bucket throttle for chart requests.
//!
//! A batch fans out one request per symbol at once; the bucket spreads
//! those requests so the whole scan stays within the configured budget.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Requests-per-minute budget with a one-second burst.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    /// Burst size in requests
    capacity: f64,
    /// Tokens regained per second
    per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_minute` requests.
    pub fn new(name: impl Into<String>, requests_per_minute: u32) -> Self {
        let per_second = f64::from(requests_per_minute.max(1)) / 60.0;
        let capacity = per_second.ceil().max(1.0);

        Self {
            name: name.into(),
            capacity,
            per_second,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Wait until one request may be sent.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                let missing = 1.0 - bucket.tokens;
                Duration::from_secs_f64(missing / self.per_second)
            };

            debug!(
                limiter = %self.name,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, waiting for token"
            );
            tokio::time::sleep(wait.max(Duration::from_millis(5))).await;
        }
    }

    /// Take a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut bucket) = self.bucket.try_lock() else {
            return false;
        };
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.capacity);
        bucket.refilled_at = now;
    }

    /// Burst size in requests.
    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }
}

/// Limiter shared between repository clones.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Create a shared rate limiter.
pub fn shared_limiter(name: impl Into<String>, requests_per_minute: u32) -> SharedRateLimiter {
    Arc::new(RateLimiter::new(name, requests_per_minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_from_rpm() {
        assert_eq!(RateLimiter::new("chart", 600).capacity(), 10);
        assert_eq!(RateLimiter::new("chart", 30).capacity(), 1);
    }

    #[test]
    fn test_try_acquire_exhausts_burst() {
        let limiter = RateLimiter::new("chart", 60);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_refill() {
        let limiter = RateLimiter::new("chart", 6000);
        while limiter.try_acquire() {}

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_shared_limiter_spends_one_bucket() {
        let limiter = shared_limiter("chart", 120);
        let clone = Arc::clone(&limiter);

        tokio_test::block_on(limiter.acquire());
        tokio_test::block_on(clone.acquire());
        assert!(!limiter.try_acquire());
    }
}
