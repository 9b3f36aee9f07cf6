use crate::config::Config;
use crate::courier::Courier;
use crate::handlers::{
    get_email_status, get_rate_limit_status, get_service_status, health_check, send_email,
    AppState, SharedState,
};
use crate::middleware::logging_middleware;
use crate::providers::{EmailProvider, MockProvider};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the API router over the given state.
pub fn create_app(state: SharedState) -> Router {
    Router::new()
        .route("/api/emails", post(send_email))
        .route("/api/emails/:message_id/status", get(get_email_status))
        .route("/api/status", get(get_service_status))
        .route("/api/rate-limit/:key", get(get_rate_limit_status))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        )
}

pub struct Server {
    config: Config,
    state: SharedState,
}

impl Server {
    /// Wire the engine with the default simulated transports.
    pub fn new(config: Config) -> Self {
        let providers: Vec<Arc<dyn EmailProvider>> = vec![
            Arc::new(MockProvider::new("SendGrid", 0.1, Duration::from_millis(500))),
            Arc::new(MockProvider::new("Mailgun", 0.15, Duration::from_millis(800))),
        ];

        Self::with_providers(config, providers)
    }

    pub fn with_providers(config: Config, providers: Vec<Arc<dyn EmailProvider>>) -> Self {
        let courier = Courier::new(providers, &config);
        let state = Arc::new(AppState { courier });

        Self { config, state }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = create_app(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!("courier server starting on {}", self.config.bind_addr);
        tracing::info!("email API available at /api/emails");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, initiating graceful shutdown");
        },
    }
}
