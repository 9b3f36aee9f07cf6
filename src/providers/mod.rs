pub mod mock;

pub use mock::MockProvider;

use crate::error::Result;
use crate::message::EmailMessage;
use async_trait::async_trait;
use serde::Serialize;

/// Outcome of a provider delivery, carrying the transport-assigned id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub success: bool,
    pub message_id: String,
    pub provider: String,
    pub timestamp: u64,
}

/// An interchangeable transport capable of attempting delivery of a message.
///
/// The orchestrator treats all providers polymorphically over this single
/// capability; failures are reported as errors and retried per policy.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &EmailMessage) -> Result<DeliveryResult>;
}
