use crate::error::{CourierError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Per-key sliding-window admission control.
///
/// Each key holds the timestamps of its admitted requests inside the trailing
/// window; stale entries are pruned lazily on every check. Keys are created on
/// first use and never evicted.
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Admit one request for `key`, returning false when the window is full.
    pub fn admit(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut windows = self.windows.write().map_err(|_| {
            CourierError::Internal("failed to acquire write lock on rate windows".to_string())
        })?;

        let requests = windows.entry(key.to_string()).or_default();
        requests.retain(|t| now.duration_since(*t) < self.window);

        if requests.len() >= self.max_requests {
            return Ok(false);
        }

        requests.push(now);
        Ok(true)
    }

    /// Remaining admissions for `key` in the current window, floored at 0.
    pub fn remaining(&self, key: &str) -> Result<usize> {
        let now = Instant::now();
        let mut windows = self.windows.write().map_err(|_| {
            CourierError::Internal("failed to acquire write lock on rate windows".to_string())
        })?;

        match windows.get_mut(key) {
            Some(requests) => {
                requests.retain(|t| now.duration_since(*t) < self.window);
                Ok(self.max_requests.saturating_sub(requests.len()))
            }
            None => Ok(self.max_requests),
        }
    }

    pub fn limit(&self) -> usize {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.admit("sender@example.com").unwrap());
        assert!(limiter.admit("sender@example.com").unwrap());
        assert!(limiter.admit("sender@example.com").unwrap());
        assert!(!limiter.admit("sender@example.com").unwrap());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.admit("a@example.com").unwrap());
        assert!(!limiter.admit("a@example.com").unwrap());
        assert!(limiter.admit("b@example.com").unwrap());
    }

    #[test]
    fn test_readmits_after_window_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));

        assert!(limiter.admit("sender@example.com").unwrap());
        assert!(!limiter.admit("sender@example.com").unwrap());

        thread::sleep(Duration::from_millis(70));

        assert!(limiter.admit("sender@example.com").unwrap());
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));

        assert_eq!(limiter.remaining("sender@example.com").unwrap(), 2);
        limiter.admit("sender@example.com").unwrap();
        assert_eq!(limiter.remaining("sender@example.com").unwrap(), 1);
        limiter.admit("sender@example.com").unwrap();
        assert_eq!(limiter.remaining("sender@example.com").unwrap(), 0);
        // Denied admission does not go below zero
        limiter.admit("sender@example.com").unwrap();
        assert_eq!(limiter.remaining("sender@example.com").unwrap(), 0);
    }

    #[test]
    fn test_remaining_prunes_stale_entries() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50));

        limiter.admit("sender@example.com").unwrap();
        limiter.admit("sender@example.com").unwrap();
        assert_eq!(limiter.remaining("sender@example.com").unwrap(), 0);

        thread::sleep(Duration::from_millis(70));

        assert_eq!(limiter.remaining("sender@example.com").unwrap(), 2);
    }

    #[test]
    fn test_unseen_key_has_full_allowance() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        assert_eq!(limiter.remaining("never-seen").unwrap(), 5);
    }
}
