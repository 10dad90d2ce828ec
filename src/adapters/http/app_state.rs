use std::sync::Arc;

use crate::{
    application::use_cases::{cancellation::CancellationUseCases, checkout::CheckoutUseCases},
    infra::{config::AppConfig, event_worker::EventQueue},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub event_queue: Arc<EventQueue>,
    pub checkout_use_cases: Arc<CheckoutUseCases>,
    pub cancellation_use_cases: Arc<CancellationUseCases>,
}
