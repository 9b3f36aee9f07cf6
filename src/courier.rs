use crate::attempt::{AttemptRecord, AttemptStatus, AttemptStore};
use crate::circuit_breaker::{BreakerState, CircuitBreaker};
use crate::config::{Config, DeliveryPolicy};
use crate::error::{CourierError, Result};
use crate::message::EmailMessage;
use crate::providers::{DeliveryResult, EmailProvider};
use crate::queue::DeliveryQueue;
use crate::rate_limiter::RateLimiter;
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

struct ProviderSlot {
    provider: Arc<dyn EmailProvider>,
    breaker: CircuitBreaker,
}

/// Breaker state of one configured provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub circuit_breaker_state: BreakerState,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub remaining: usize,
    pub limit: usize,
}

/// The delivery orchestration engine.
///
/// Admits messages through idempotency and rate-limit checks, queues them,
/// and drives a single background drain task that retries each message
/// across providers behind their circuit breakers until it reaches a
/// terminal state.
#[derive(Clone)]
pub struct Courier {
    slots: Arc<Vec<ProviderSlot>>,
    attempts: AttemptStore,
    rate_limiter: RateLimiter,
    queue: Arc<DeliveryQueue>,
    /// Accepted messages not yet in a terminal state (backlog + in-flight).
    pending: Arc<AtomicUsize>,
    policy: DeliveryPolicy,
}

impl Courier {
    /// Build the engine and spawn its drain task. Providers are tried in the
    /// order given, each behind its own breaker.
    pub fn new(providers: Vec<Arc<dyn EmailProvider>>, config: &Config) -> Self {
        let slots = providers
            .into_iter()
            .map(|provider| ProviderSlot {
                breaker: CircuitBreaker::new(config.breaker.threshold, config.breaker.timeout),
                provider,
            })
            .collect();

        let courier = Self {
            slots: Arc::new(slots),
            attempts: AttemptStore::new(),
            rate_limiter: RateLimiter::new(
                config.rate_limit.max_requests,
                config.rate_limit.window,
            ),
            queue: Arc::new(DeliveryQueue::new()),
            pending: Arc::new(AtomicUsize::new(0)),
            policy: config.delivery.clone(),
        };

        let worker = courier.clone();
        tokio::spawn(async move { worker.drain_loop().await });

        courier
    }

    /// Accept a message for delivery.
    ///
    /// Resubmitting a known message id returns the existing record unchanged.
    /// Rate-limited submissions fail without creating a record. Acceptance
    /// returns immediately; delivery happens on the drain task.
    pub fn submit(&self, message: EmailMessage) -> Result<AttemptRecord> {
        if let Some(existing) = self.attempts.get(&message.id)? {
            info!(message_id = %message.id, "duplicate email send attempt blocked");
            return Ok(existing);
        }

        if !self.rate_limiter.admit(&message.from)? {
            warn!(from = %message.from, "rate limit exceeded");
            return Err(CourierError::RateLimitExceeded);
        }

        let (record, existed) = self
            .attempts
            .get_or_create(&message.id, || AttemptRecord::new(&message.id))?;
        if existed {
            return Ok(record);
        }

        info!(message_id = %message.id, "email queued for sending");
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.queue.push(message);

        Ok(record)
    }

    async fn drain_loop(self) {
        loop {
            let message = self.queue.pop().await;
            if let Err(err) = self.process_message(&message).await {
                error!(message_id = %message.id, error = %err, "delivery processing error");
            }
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    async fn process_message(&self, message: &EmailMessage) -> Result<()> {
        self.attempts
            .update(&message.id, |record| record.status = AttemptStatus::Sending)?;

        match self.send_with_retry(message).await {
            Ok(result) => {
                self.attempts.update(&message.id, |record| {
                    record.status = AttemptStatus::Sent;
                    record.provider = Some(result.provider.clone());
                })?;
                info!(
                    message_id = %message.id,
                    provider = %result.provider,
                    "email sent successfully"
                );
            }
            Err(err) => {
                self.attempts.update(&message.id, |record| {
                    record.status = AttemptStatus::Failed;
                    record.last_error = Some(err.to_string());
                })?;
                error!(message_id = %message.id, error = %err, "email failed to send");
            }
        }

        Ok(())
    }

    /// Retry rounds over the provider list. First success wins; a round where
    /// every provider fails leads to a backoff sleep and another round, until
    /// retries are exhausted.
    async fn send_with_retry(&self, message: &EmailMessage) -> Result<DeliveryResult> {
        let mut last_error: Option<CourierError> = None;

        for round in 0..=self.policy.max_retries {
            self.attempts
                .update(&message.id, |record| record.attempts = round + 1)?;

            if round > 0 {
                self.attempts
                    .update(&message.id, |record| record.status = AttemptStatus::Retrying)?;

                let delay = backoff_delay(self.policy.base_delay, self.policy.max_delay, round);
                info!(
                    message_id = %message.id,
                    round = round + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying email send"
                );
                tokio::time::sleep(delay).await;
            }

            for slot in self.slots.iter() {
                match slot.breaker.execute(|| slot.provider.send(message)).await {
                    Ok(result) => {
                        info!(
                            message_id = %message.id,
                            provider = slot.provider.name(),
                            round = round + 1,
                            "email sent via provider"
                        );
                        return Ok(result);
                    }
                    Err(err) => {
                        warn!(
                            message_id = %message.id,
                            provider = slot.provider.name(),
                            error = %err,
                            breaker_state = %slot.breaker.state(),
                            "provider failed"
                        );
                        last_error = Some(err);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(CourierError::AllProvidersExhausted))
    }

    pub fn status(&self, message_id: &str) -> Result<Option<AttemptRecord>> {
        self.attempts.get(message_id)
    }

    pub fn provider_states(&self) -> Vec<ProviderStatus> {
        self.slots
            .iter()
            .map(|slot| ProviderStatus {
                name: slot.provider.name().to_string(),
                circuit_breaker_state: slot.breaker.state(),
            })
            .collect()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn all_attempts(&self) -> Result<Vec<AttemptRecord>> {
        self.attempts.all()
    }

    pub fn total_attempts(&self) -> Result<usize> {
        self.attempts.len()
    }

    pub fn rate_limit_status(&self, key: &str) -> Result<RateLimitStatus> {
        Ok(RateLimitStatus {
            remaining: self.rate_limiter.remaining(key)?,
            limit: self.rate_limiter.limit(),
        })
    }

    /// Block until the backlog and any in-flight delivery complete.
    pub async fn wait_until_idle(&self) {
        while self.pending.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// Backoff for retry round `round` (1-based): `base * 2^(round-1)` plus a
/// uniform jitter of up to 10%, capped at `cap`.
pub fn backoff_delay(base: Duration, cap: Duration, round: u32) -> Duration {
    let exponential = base.as_millis() as f64 * 2f64.powi(round.saturating_sub(1) as i32);
    let jitter = rand::rng().random_range(0.0..0.1) * exponential;
    Duration::from_millis((exponential + jitter) as u64).min(cap)
}
