//! Webhook server for the LINE bot
//!
//! Handles incoming webhooks from LINE Messaging API

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::handler::EventHandler;
use crate::types::WebhookBody;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the base64 HMAC-SHA256 of the raw body
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub channel_secret: String,
    pub handler: Arc<EventHandler>,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/callback", post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Handle incoming webhook
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing x-line-signature header");
            StatusCode::BAD_REQUEST
        })?;

    if !verify_signature(&state.channel_secret, &body, signature) {
        warn!("Invalid signature");
        return Err(StatusCode::BAD_REQUEST);
    }

    // A signed body that is not a webhook envelope has no events to dispatch.
    // It is answered with 400 like any other malformed request.
    let webhook: WebhookBody = serde_json::from_slice(&body).map_err(|e| {
        warn!("Failed to parse webhook body: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    debug!(
        "Received {} events for destination: {}",
        webhook.events.len(),
        webhook.destination
    );

    for event in &webhook.events {
        if let Err(e) = state.handler.process_event(event).await {
            error!("Error processing event: {}", e);
            // Continue processing other events
        }
    }

    Ok((StatusCode::OK, "OK"))
}

/// Verify LINE signature in constant time
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
