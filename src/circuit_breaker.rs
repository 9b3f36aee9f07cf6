//! Per-provider failure isolation.
//!
//! Tracks consecutive failures and transitions between closed, open, and
//! half-open states. State lives in atomics; only the drain loop drives
//! calls through a given breaker.

use crate::error::{CourierError, Result};
use crate::message::now_millis;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

pub struct CircuitBreaker {
    /// Consecutive failures since the last success.
    failures: AtomicU32,
    /// Epoch millis of the most recent failure, 0 when none recorded.
    last_failure_ms: AtomicU64,
    state: AtomicU8,
    threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, timeout: Duration) -> Self {
        Self {
            failures: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(0),
            state: AtomicU8::new(STATE_CLOSED),
            threshold,
            timeout,
        }
    }

    /// Run `op` through the breaker.
    ///
    /// Fails with `BreakerOpen` without invoking `op` while the breaker is
    /// open and the cooldown has not elapsed; otherwise propagates the
    /// operation's own outcome and records it.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.try_acquire()?;

        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    pub fn state(&self) -> BreakerState {
        match self.state.load(Ordering::SeqCst) {
            STATE_OPEN => BreakerState::Open,
            STATE_HALF_OPEN => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }

    /// Gate a call: open breakers reject until the cooldown elapses, at which
    /// point one trial call proceeds in half-open state.
    fn try_acquire(&self) -> Result<()> {
        if self.state.load(Ordering::SeqCst) == STATE_OPEN {
            let last_failure = self.last_failure_ms.load(Ordering::SeqCst);
            let elapsed = now_millis().saturating_sub(last_failure);

            if elapsed > self.timeout.as_millis() as u64 {
                self.state.store(STATE_HALF_OPEN, Ordering::SeqCst);
            } else {
                return Err(CourierError::BreakerOpen);
            }
        }

        Ok(())
    }

    fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
        self.state.store(STATE_CLOSED, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        self.last_failure_ms.store(now_millis(), Ordering::SeqCst);

        if failures >= self.threshold {
            self.state.store(STATE_OPEN, Ordering::SeqCst);
        }
    }
}
