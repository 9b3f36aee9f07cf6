use crate::attempt::AttemptStatus;
use crate::courier::ProviderStatus;
use crate::message::now_millis;
use serde::Serialize;

/// Body of a 202 acceptance response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub attempt_id: String,
    pub message_id: String,
    pub status: AttemptStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOverview {
    pub providers: Vec<ProviderStatus>,
    pub queue_size: usize,
    pub total_attempts: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: now_millis() / 1000,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
