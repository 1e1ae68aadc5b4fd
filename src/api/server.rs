//! HTTP server setup: webhook intake, health check, and operational routes.

use crate::config::Config;
use crate::conversation::ConversationHandler;
use crate::llm::GeminiClient;
use crate::messaging::ZaloClient;
use crate::messaging::zalo::WebhookUpdate;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use std::net::SocketAddr;
use std::sync::Arc;

/// Header Zalo echoes the shared secret back in on every webhook call.
const SECRET_TOKEN_HEADER: &str = "x-bot-api-secret-token";

/// Shared state behind every route.
pub struct AppState {
    pub handler: Arc<ConversationHandler<GeminiClient, ZaloClient>>,
    pub zalo: Arc<ZaloClient>,
    pub config: Arc<Config>,
    pub started_at: std::time::Instant,
}

// -- Response types --

#[derive(Serialize)]
struct WebhookAck {
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime_seconds: u64,
    webhook_url: Option<String>,
    bot_token_configured: bool,
    gemini_configured: bool,
}

#[derive(Serialize)]
struct SetupWebhookResponse {
    success: bool,
}

#[derive(Deserialize)]
struct TestSendRequest {
    chat_id: String,
    message: String,
}

#[derive(Serialize)]
struct TestSendResponse {
    success: bool,
}

/// Start the HTTP server on the given address.
pub async fn start_http_server(
    bind: SocketAddr,
    state: Arc<AppState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/setup-webhook", post(setup_webhook))
        .route("/test-send", post(test_send))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        if let Err(error) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
        {
            tracing::error!(%error, "HTTP server exited with error");
        }
    });

    Ok(handle)
}

// -- Handlers --

/// Webhook intake. Verifies the shared secret, acks immediately, and
/// spawns event handling so slow generation never blocks the Bot API.
async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<WebhookUpdate>,
) -> Result<Json<WebhookAck>, StatusCode> {
    let received = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if !secret_matches(received, &state.config.secret_token) {
        tracing::warn!("webhook rejected: bad secret token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let event_name = update.event_name.clone();
    match update.into_event() {
        Some(event) => {
            let handler = state.handler.clone();
            tokio::spawn(async move {
                if let Err(error) = handler.handle_event(event).await {
                    tracing::warn!(%error, "failed to deliver reply");
                }
            });
        }
        None => {
            tracing::debug!(event = %event_name, "ignoring unhandled webhook event");
        }
    }

    Ok(Json(WebhookAck { status: "success" }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        webhook_url: state.config.webhook_url.clone(),
        bot_token_configured: !state.config.bot_token.is_empty(),
        gemini_configured: !state.config.gemini_api_key.is_empty(),
    })
}

/// Manually register the webhook; fallback for when automatic setup at
/// startup was skipped or failed.
async fn setup_webhook(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SetupWebhookResponse>, StatusCode> {
    let url = state.config.webhook_url.as_deref().ok_or_else(|| {
        tracing::warn!("webhook setup requested but WEBHOOK_URL is not configured");
        StatusCode::BAD_REQUEST
    })?;

    state
        .zalo
        .set_webhook(url, &state.config.secret_token)
        .await
        .map_err(|error| {
            tracing::warn!(%error, "webhook setup failed");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(SetupWebhookResponse { success: true }))
}

/// Send a message directly, bypassing the conversation flow. Smoke-test
/// helper for deployments.
async fn test_send(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestSendRequest>,
) -> Result<Json<TestSendResponse>, StatusCode> {
    state
        .zalo
        .send_message(&request.chat_id, &request.message)
        .await
        .map_err(|error| {
            tracing::warn!(%error, chat_id = %request.chat_id, "test send failed");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(TestSendResponse { success: true }))
}

fn secret_matches(received: Option<&str>, expected: &str) -> bool {
    received == Some(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches_requires_exact_header() {
        assert!(secret_matches(Some("s3cret"), "s3cret"));
        assert!(!secret_matches(Some("wrong"), "s3cret"));
        assert!(!secret_matches(Some(""), "s3cret"));
        assert!(!secret_matches(None, "s3cret"));
    }
}
