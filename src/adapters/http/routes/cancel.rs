use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
    routing::post,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
};

#[derive(Serialize)]
struct CancelSubscriptionResponse {
    success: bool,
    message: &'static str,
    cancel_at: Option<DateTime<Utc>>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/cancel-subscription", post(cancel_subscription))
}

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// POST /cancel-subscription
async fn cancel_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let token = bearer_token(&headers)?;

    let result = app_state
        .cancellation_use_cases
        .cancel_for_user(token)
        .await?;

    Ok(Json(CancelSubscriptionResponse {
        success: true,
        message: "Subscription will be canceled at the end of the billing period",
        cancel_at: result.cancel_at,
    }))
}
