use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::use_cases::checkout::CheckoutRequest,
    domain::entities::checkout_mode::CheckoutMode,
};

#[derive(Deserialize)]
struct CheckoutPayload {
    price_id: Option<String>,
    success_url: Option<String>,
    cancel_url: Option<String>,
    customer_email: Option<String>,
    user_id: Option<String>,
    mode: Option<String>,
}

impl CheckoutPayload {
    fn into_request(self) -> AppResult<CheckoutRequest> {
        let price_id = non_empty(self.price_id)
            .ok_or_else(|| AppError::InvalidInput("price_id is required".into()))?;

        let user_id = non_empty(self.user_id)
            .map(|raw| {
                Uuid::parse_str(&raw)
                    .map_err(|_| AppError::InvalidInput("user_id must be a UUID".into()))
            })
            .transpose()?;

        let mode = non_empty(self.mode)
            .map(|raw| raw.parse::<CheckoutMode>().map_err(AppError::InvalidInput))
            .transpose()?;

        Ok(CheckoutRequest {
            user_id,
            price_id,
            success_url: non_empty(self.success_url),
            cancel_url: non_empty(self.cancel_url),
            customer_email: non_empty(self.customer_email),
            mode,
        })
    }
}

/// Blank strings count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/checkout", post(create_checkout))
}

/// POST /checkout
async fn create_checkout(
    State(app_state): State<AppState>,
    payload: Result<Json<CheckoutPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let request = payload.into_request()?;
    let response = app_state.checkout_use_cases.create_checkout(request).await?;
    Ok(Json(response))
}
