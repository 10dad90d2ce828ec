use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{checkout_mode::CheckoutMode, subscription_status::SubscriptionStatus},
};

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Unique identifier for a customer in the billing provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription in the billing provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authoritative subscription snapshot as reported by the provider.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionInfo {
    pub subscription_id: SubscriptionId,
    pub customer_id: CustomerId,
    /// Raw provider status (`active`, `trialing`, `past_due`, ...)
    pub provider_status: String,
    pub cancel_at_period_end: bool,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    /// Price of the first subscription item
    pub price_id: Option<String>,
    /// Unit amount of the first item, in minor currency units
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
}

impl SubscriptionInfo {
    pub fn local_status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_provider(&self.provider_status, self.cancel_at_period_end)
    }

    /// Still billing or able to resume billing. Terminal and never-started
    /// subscriptions are not live.
    pub fn is_live(&self) -> bool {
        matches!(
            self.provider_status.as_str(),
            "active" | "trialing" | "past_due" | "unpaid"
        )
    }
}

/// Parameters for a hosted checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub mode: CheckoutMode,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Existing provider customer; when absent the provider creates one.
    pub customer: Option<CustomerId>,
    pub customer_email: Option<String>,
    pub client_reference_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Result of creating a checkout session
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionResult {
    pub session_id: String,
    pub url: String,
}

// ============================================================================
// Billing Provider Port
// ============================================================================

/// Billing provider port - the provider calls the billing sync needs.
#[async_trait]
pub trait BillingProviderPort: Send + Sync {
    /// List a customer's subscriptions in every status, most recent first.
    async fn list_subscriptions(
        &self,
        customer: &CustomerId,
        limit: u32,
    ) -> AppResult<Vec<SubscriptionInfo>>;

    /// Cancel immediately, or schedule cancellation at the end of the paid period.
    async fn cancel_subscription(
        &self,
        subscription: &SubscriptionId,
        at_period_end: bool,
    ) -> AppResult<SubscriptionInfo>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSessionResult>;

    /// Price of the first line item of a completed checkout session.
    async fn checkout_line_item_price(&self, session_id: &str) -> AppResult<Option<String>>;
}

/// Provider handle that may be absent when `STRIPE_SECRET_KEY` is unset.
pub type OptionalProvider = Option<Arc<dyn BillingProviderPort>>;

pub fn require_provider(provider: &OptionalProvider) -> AppResult<&Arc<dyn BillingProviderPort>> {
    provider
        .as_ref()
        .ok_or(AppError::NotConfigured("STRIPE_SECRET_KEY"))
}
