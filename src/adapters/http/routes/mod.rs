pub mod cancel;
pub mod checkout;
pub mod health;
pub mod webhook;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(webhook::router())
        .merge(checkout::router())
        .merge(cancel::router())
        .merge(health::router())
}

