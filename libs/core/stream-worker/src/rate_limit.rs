//! Token bucket rate limiter.
//!
//! Used by outbound transports (the pooled SMTP sender) to cap sends per
//! time window. Exceeding the window surfaces as a rate-limited error, which
//! the worker retries with backoff.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Simple token bucket: `max_tokens` operations per `window_ms`.
pub struct RateLimiter {
    max_tokens: u32,
    tokens: AtomicU32,
    window_ms: u64,
    last_refill: RwLock<Instant>,
}

impl RateLimiter {
    /// Create a rate limiter allowing `max_tokens` operations per window.
    pub fn with_window(max_tokens: u32, window_ms: u64) -> Self {
        Self {
            max_tokens,
            tokens: AtomicU32::new(max_tokens),
            window_ms,
            last_refill: RwLock::new(Instant::now()),
        }
    }

    /// Try to acquire a token.
    ///
    /// Returns `true` if a token was acquired, `false` if rate limited.
    pub fn try_acquire(&self) -> bool {
        self.refill_if_needed();

        loop {
            let current = self.tokens.load(Ordering::SeqCst);
            if current == 0 {
                return false;
            }

            if self
                .tokens
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Get the number of available tokens.
    pub fn available_tokens(&self) -> u32 {
        self.refill_if_needed();
        self.tokens.load(Ordering::SeqCst)
    }

    fn refill_if_needed(&self) {
        let mut last_refill = self.last_refill.write().unwrap();
        let elapsed = last_refill.elapsed().as_millis() as u64;

        if elapsed >= self.window_ms {
            self.tokens.store(self.max_tokens, Ordering::SeqCst);
            *last_refill = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_until_exhausted() {
        let limiter = RateLimiter::with_window(3, 60_000);

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.available_tokens(), 0);
    }

    #[test]
    fn test_refill_after_window() {
        let limiter = RateLimiter::with_window(1, 10);

        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        std::thread::sleep(std::time::Duration::from_millis(20));

        assert!(limiter.try_acquire());
    }
}
