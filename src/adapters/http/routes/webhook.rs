use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use secrecy::ExposeSecret;
use serde_json::json;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    infra::webhook_signature,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(receive_webhook))
}

/// POST /webhook
///
/// Answers as soon as the signature checks out. Dispatch runs on the event
/// queue and its failures never reach the provider.
async fn receive_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let secret = app_state
        .config
        .stripe_webhook_secret
        .as_ref()
        .ok_or(AppError::NotConfigured("STRIPE_WEBHOOK_SECRET"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = webhook_signature::verify(
        &body,
        signature,
        secret.expose_secret(),
        chrono::Utc::now().timestamp(),
    )?;

    tracing::info!(event_id = %event.id, event_type = %event.kind, "Webhook verified");

    app_state.event_queue.enqueue(event).await;

    Ok(Json(json!({ "received": true })))
}
