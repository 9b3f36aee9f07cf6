use super::{DeliveryResult, EmailProvider};
use crate::error::{CourierError, Result};
use crate::message::{now_millis, EmailMessage};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use uuid::Uuid;

/// Simulated transport with configurable latency and failure rate.
///
/// A failure rate of 0.0 always delivers and 1.0 always fails, which makes
/// the provider deterministic for tests.
pub struct MockProvider {
    name: String,
    failure_rate: f64,
    latency: Duration,
}

impl MockProvider {
    pub fn new(name: &str, failure_rate: f64, latency: Duration) -> Self {
        Self {
            name: name.to_string(),
            failure_rate,
            latency,
        }
    }
}

#[async_trait]
impl EmailProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _message: &EmailMessage) -> Result<DeliveryResult> {
        tokio::time::sleep(self.latency).await;

        if rand::rng().random_range(0.0..1.0) < self.failure_rate {
            return Err(CourierError::Provider(format!(
                "{} provider failed to send email",
                self.name
            )));
        }

        Ok(DeliveryResult {
            success: true,
            message_id: format!("{}-{}", self.name, Uuid::new_v4()),
            provider: self.name.clone(),
            timestamp: now_millis(),
        })
    }
}
