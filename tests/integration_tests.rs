use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use courier::config::{Config, RateLimitPolicy};
use courier::courier::Courier;
use courier::handlers::{AppState, SharedState};
use courier::providers::{EmailProvider, MockProvider};
use courier::server::create_app;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_state(config: Config) -> SharedState {
    let providers: Vec<Arc<dyn EmailProvider>> = vec![
        Arc::new(MockProvider::new("SendGrid", 0.0, Duration::from_millis(10))),
        Arc::new(MockProvider::new("Mailgun", 0.0, Duration::from_millis(10))),
    ];
    Arc::new(AppState {
        courier: Courier::new(providers, &config),
    })
}

async fn post_email(app: Router, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/emails")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

fn valid_email() -> Value {
    json!({
        "to": "test@example.com",
        "from": "sender@example.com",
        "subject": "Test Subject",
        "body": "Test Body"
    })
}

#[tokio::test]
async fn test_submit_accepts_valid_email() {
    let state = test_state(Config::default());
    let (status, body) = post_email(create_app(state), valid_email()).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Email queued for sending");
    assert_eq!(body["status"], "queued");
    assert!(body["attemptId"].as_str().unwrap().starts_with("attempt-"));
    assert!(body["messageId"].as_str().unwrap().starts_with("email-"));
}

#[tokio::test]
async fn test_submit_rejects_missing_fields() {
    let state = test_state(Config::default());
    let payload = json!({
        "to": "test@example.com",
        "subject": "Test Subject",
        "body": "Test Body"
    });

    let (status, body) = post_email(create_app(state), payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Missing required fields"));
}

#[tokio::test]
async fn test_submit_rejects_empty_fields() {
    let state = test_state(Config::default());
    let mut payload = valid_email();
    payload["body"] = json!("");

    let (status, _) = post_email(create_app(state), payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_rate_limited() {
    let config = Config {
        rate_limit: RateLimitPolicy {
            max_requests: 1,
            window: Duration::from_secs(60),
        },
        ..Config::default()
    };
    let state = test_state(config);
    let app = create_app(state.clone());

    let (first, _) = post_email(app.clone(), valid_email()).await;
    assert_eq!(first, StatusCode::ACCEPTED);

    let (second, body) = post_email(app, valid_email()).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");

    state.courier.wait_until_idle().await;
}

#[tokio::test]
async fn test_status_returns_attempt_record() {
    let state = test_state(Config::default());
    let app = create_app(state.clone());

    let (_, submitted) = post_email(app.clone(), valid_email()).await;
    let message_id = submitted["messageId"].as_str().unwrap().to_string();

    state.courier.wait_until_idle().await;

    let (status, body) = get_json(app, &format!("/api/emails/{}/status", message_id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messageId"], message_id.as_str());
    assert_eq!(body["status"], "sent");
    assert_eq!(body["provider"], "SendGrid");
    assert_eq!(body["attempts"], 1);
}

#[tokio::test]
async fn test_status_unknown_message_returns_404() {
    let state = test_state(Config::default());

    let (status, body) = get_json(create_app(state), "/api/emails/no-such-id/status").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Email not found");
}

#[tokio::test]
async fn test_service_status_overview() {
    let state = test_state(Config::default());
    let app = create_app(state.clone());

    let (_, submitted) = post_email(app.clone(), valid_email()).await;
    assert!(submitted["messageId"].is_string());
    state.courier.wait_until_idle().await;

    let (status, body) = get_json(app, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0]["name"], "SendGrid");
    assert_eq!(providers[0]["circuitBreakerState"], "closed");
    assert_eq!(body["queueSize"], 0);
    assert_eq!(body["totalAttempts"], 1);
}

#[tokio::test]
async fn test_rate_limit_status_endpoint() {
    let config = Config {
        rate_limit: RateLimitPolicy {
            max_requests: 5,
            window: Duration::from_secs(60),
        },
        ..Config::default()
    };
    let state = test_state(config);
    let app = create_app(state.clone());

    let (status, body) = get_json(app.clone(), "/api/rate-limit/sender@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 5);
    assert_eq!(body["limit"], 5);

    let (accepted, _) = post_email(app.clone(), valid_email()).await;
    assert_eq!(accepted, StatusCode::ACCEPTED);

    let (_, after) = get_json(app, "/api/rate-limit/sender@example.com").await;
    assert_eq!(after["remaining"], 4);

    state.courier.wait_until_idle().await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = test_state(Config::default());

    let (status, body) = get_json(create_app(state), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}
