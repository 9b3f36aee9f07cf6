use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::courier::Courier;
use crate::error::CourierError;
use crate::message::{EmailMessage, Priority};
use crate::response::{HealthResponse, StatusOverview, SubmitResponse};

/// Shared application state
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub courier: Courier,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub to: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub from: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub subject: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub body: String,
    pub priority: Option<Priority>,
}

/// Accept an email for delivery
pub async fn send_email(
    State(state): State<SharedState>,
    Json(payload): Json<SendEmailRequest>,
) -> Result<impl IntoResponse, CourierError> {
    payload.validate().map_err(|_| {
        CourierError::InvalidRequest("Missing required fields: to, from, subject, body".to_string())
    })?;

    let message = EmailMessage {
        id: format!("email-{}", Uuid::new_v4()),
        to: payload.to,
        from: payload.from,
        subject: payload.subject,
        body: payload.body,
        priority: payload.priority.unwrap_or_default(),
    };
    let message_id = message.id.clone();

    let attempt = state.courier.submit(message)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            message: "Email queued for sending".to_string(),
            attempt_id: attempt.id,
            message_id,
            status: attempt.status,
        }),
    ))
}

/// Look up the attempt record for a message id
pub async fn get_email_status(
    State(state): State<SharedState>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, CourierError> {
    let record = state
        .courier
        .status(&message_id)?
        .ok_or(CourierError::NotFound)?;

    Ok(Json(record))
}

/// Service-wide overview: breaker states, queue depth, attempt count
pub async fn get_service_status(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, CourierError> {
    let overview = StatusOverview {
        providers: state.courier.provider_states(),
        queue_size: state.courier.queue_depth(),
        total_attempts: state.courier.total_attempts()?,
    };

    Ok(Json(overview))
}

/// Remaining admissions for a rate-limit key
pub async fn get_rate_limit_status(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, CourierError> {
    let status = state.courier.rate_limit_status(&key)?;
    Ok(Json(status))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}
