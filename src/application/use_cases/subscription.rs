use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{billing_period::BillingPeriod, subscription_status::SubscriptionStatus},
};

// ============================================================================
// Profile Types
// ============================================================================

/// Local projection of a user's subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionProfile {
    pub id: Uuid,
    /// Absent only for the not-started row keyed by customer id.
    pub user_id: Option<Uuid>,
    pub stripe_customer_id: String,
    /// Absent for lifetime grants and not-started rows.
    pub stripe_subscription_id: Option<String>,
    pub plan_name: String,
    pub billing_period: BillingPeriod,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    /// Amount paid in major currency units
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionProfile {
    /// An active one-time purchase. Period-based events never change it.
    pub fn is_lifetime_grant(&self) -> bool {
        self.billing_period.is_lifetime() && self.status == SubscriptionStatus::Active
    }
}

/// Full replacement of a user's subscription row.
#[derive(Debug, Clone)]
pub struct UpsertSubscriptionInput {
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: Option<String>,
    pub plan_name: String,
    pub billing_period: BillingPeriod,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

/// Narrow status change applied by subscription id.
#[derive(Debug, Clone)]
pub struct SubscriptionStatusUpdate {
    pub status: SubscriptionStatus,
    /// `None` leaves the stored flag as is.
    pub cancel_at_period_end: Option<bool>,
    /// `None` leaves the stored timestamp as is.
    pub canceled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub checkout_session_id: String,
    pub price_id: Option<String>,
    pub plan_name: String,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionProfile>>;

    /// Atomic insert-or-replace keyed by user id. An existing active lifetime
    /// row is only replaced by another lifetime grant; otherwise it is kept and
    /// `None` is returned.
    async fn upsert_for_user(
        &self,
        input: &UpsertSubscriptionInput,
    ) -> AppResult<Option<SubscriptionProfile>>;

    /// Records that a customer has no subscription. Keyed by user id when the
    /// mapping is known, else by customer id. Lifetime rows are left untouched
    /// and yield `None`.
    async fn upsert_not_started(
        &self,
        stripe_customer_id: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<Option<SubscriptionProfile>>;

    /// Status change for the row holding `stripe_subscription_id`. Lifetime rows
    /// never match. Returns `None` when nothing was updated.
    async fn update_by_subscription_id(
        &self,
        stripe_subscription_id: &str,
        update: &SubscriptionStatusUpdate,
    ) -> AppResult<Option<SubscriptionProfile>>;
}

#[async_trait]
pub trait CustomerRepo: Send + Sync {
    async fn get_customer_id(&self, user_id: Uuid) -> AppResult<Option<String>>;
    async fn get_user_id(&self, stripe_customer_id: &str) -> AppResult<Option<Uuid>>;
    /// Binds a user to a provider customer. Rebinding replaces the old customer id.
    async fn upsert(&self, user_id: Uuid, stripe_customer_id: &str) -> AppResult<()>;
}

#[async_trait]
pub trait OrderRepo: Send + Sync {
    /// Inserts the order unless one exists for the same checkout session.
    /// Returns true when a new row was written.
    async fn record(&self, input: &CreateOrderInput) -> AppResult<bool>;
}
