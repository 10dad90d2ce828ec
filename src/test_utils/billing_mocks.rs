//! In-memory mock implementations for the billing repository traits and the
//! billing provider port.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_provider::{
            BillingProviderPort, CheckoutSessionRequest, CheckoutSessionResult, CustomerId,
            SubscriptionId, SubscriptionInfo,
        },
        use_cases::subscription::{
            CreateOrderInput, CustomerRepo, OrderRepo, SubscriptionProfile, SubscriptionRepo,
            SubscriptionStatusUpdate, UpsertSubscriptionInput,
        },
    },
    domain::entities::{plan::Plan, subscription_status::SubscriptionStatus},
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// Mirrors the conflict rules of the Postgres implementation.
#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub rows: Mutex<Vec<SubscriptionProfile>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, row: SubscriptionProfile) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn all(&self) -> Vec<SubscriptionProfile> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == Some(user_id))
            .cloned())
    }

    async fn upsert_for_user(
        &self,
        input: &UpsertSubscriptionInput,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        if let Some(row) = rows.iter_mut().find(|r| r.user_id == Some(input.user_id)) {
            if row.is_lifetime_grant() && !input.billing_period.is_lifetime() {
                return Ok(None);
            }
            row.stripe_customer_id = input.stripe_customer_id.clone();
            row.stripe_subscription_id = input.stripe_subscription_id.clone();
            row.plan_name = input.plan_name.clone();
            row.billing_period = input.billing_period;
            row.status = input.status;
            row.current_period_start = input.current_period_start;
            row.current_period_end = input.current_period_end;
            row.cancel_at_period_end = input.cancel_at_period_end;
            row.canceled_at = input.canceled_at;
            row.amount = input.amount;
            row.currency = input.currency.clone();
            row.updated_at = now;
            return Ok(Some(row.clone()));
        }

        let row = SubscriptionProfile {
            id: Uuid::new_v4(),
            user_id: Some(input.user_id),
            stripe_customer_id: input.stripe_customer_id.clone(),
            stripe_subscription_id: input.stripe_subscription_id.clone(),
            plan_name: input.plan_name.clone(),
            billing_period: input.billing_period,
            status: input.status,
            current_period_start: input.current_period_start,
            current_period_end: input.current_period_end,
            cancel_at_period_end: input.cancel_at_period_end,
            canceled_at: input.canceled_at,
            amount: input.amount,
            currency: input.currency.clone(),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(Some(row))
    }

    async fn upsert_not_started(
        &self,
        stripe_customer_id: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();

        let existing = rows.iter_mut().find(|r| match user_id {
            Some(user_id) => r.user_id == Some(user_id),
            None => r.user_id.is_none() && r.stripe_customer_id == stripe_customer_id,
        });

        if let Some(row) = existing {
            if row.is_lifetime_grant() {
                return Ok(None);
            }
            row.stripe_customer_id = stripe_customer_id.to_string();
            row.status = SubscriptionStatus::NotStarted;
            row.updated_at = now;
            return Ok(Some(row.clone()));
        }

        let plan = Plan::unknown();
        let row = SubscriptionProfile {
            id: Uuid::new_v4(),
            user_id,
            stripe_customer_id: stripe_customer_id.to_string(),
            stripe_subscription_id: None,
            plan_name: plan.name,
            billing_period: plan.billing_period,
            status: SubscriptionStatus::NotStarted,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            canceled_at: None,
            amount: None,
            currency: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(Some(row))
    }

    async fn update_by_subscription_id(
        &self,
        stripe_subscription_id: &str,
        update: &SubscriptionStatusUpdate,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| {
            r.stripe_subscription_id.as_deref() == Some(stripe_subscription_id)
                && !r.billing_period.is_lifetime()
        }) else {
            return Ok(None);
        };

        row.status = update.status;
        if let Some(flag) = update.cancel_at_period_end {
            row.cancel_at_period_end = flag;
        }
        if let Some(at) = update.canceled_at {
            row.canceled_at = Some(at);
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }
}

// ============================================================================
// InMemoryCustomerRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryCustomerRepo {
    pub customers: Mutex<HashMap<Uuid, String>>,
}

impl InMemoryCustomerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: Uuid, stripe_customer_id: &str) {
        self.customers
            .lock()
            .unwrap()
            .insert(user_id, stripe_customer_id.to_string());
    }
}

#[async_trait]
impl CustomerRepo for InMemoryCustomerRepo {
    async fn get_customer_id(&self, user_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.customers.lock().unwrap().get(&user_id).cloned())
    }

    async fn get_user_id(&self, stripe_customer_id: &str) -> AppResult<Option<Uuid>> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|(_, customer)| customer.as_str() == stripe_customer_id)
            .map(|(user_id, _)| *user_id))
    }

    async fn upsert(&self, user_id: Uuid, stripe_customer_id: &str) -> AppResult<()> {
        let mut customers = self.customers.lock().unwrap();
        let taken = customers
            .iter()
            .any(|(other, customer)| *other != user_id && customer.as_str() == stripe_customer_id);
        if taken {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }
        customers.insert(user_id, stripe_customer_id.to_string());
        Ok(())
    }
}

// ============================================================================
// InMemoryOrderRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderRepo {
    pub orders: Mutex<Vec<CreateOrderInput>>,
}

impl InMemoryOrderRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<CreateOrderInput> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderRepo for InMemoryOrderRepo {
    async fn record(&self, input: &CreateOrderInput) -> AppResult<bool> {
        let mut orders = self.orders.lock().unwrap();
        if orders
            .iter()
            .any(|o| o.checkout_session_id == input.checkout_session_id)
        {
            return Ok(false);
        }
        orders.push(input.clone());
        Ok(true)
    }

}

// ============================================================================
// FakeBillingProvider
// ============================================================================

/// A provider call, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    ListSubscriptions {
        customer: String,
        limit: u32,
    },
    Cancel {
        subscription: String,
        at_period_end: bool,
    },
    CreateCheckout(CheckoutSessionRequest),
    LineItems {
        session_id: String,
    },
}

#[derive(Default)]
struct FakeProviderState {
    /// Creation order; the last entry is the most recent.
    subscriptions: Vec<SubscriptionInfo>,
    line_item_prices: HashMap<String, String>,
    calls: Vec<ProviderCall>,
    sessions_created: u32,
    fail_next: Option<String>,
}

/// Holds authoritative subscription state the way the real provider does.
#[derive(Default)]
pub struct FakeBillingProvider {
    state: Mutex<FakeProviderState>,
}

impl FakeBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscription(&self, subscription: SubscriptionInfo) {
        self.state.lock().unwrap().subscriptions.push(subscription);
    }

    pub fn set_status(&self, subscription_id: &str, status: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(sub) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.subscription_id.as_str() == subscription_id)
        {
            sub.provider_status = status.to_string();
        }
    }

    pub fn set_line_item_price(&self, session_id: &str, price_id: &str) {
        self.state
            .lock()
            .unwrap()
            .line_item_prices
            .insert(session_id.to_string(), price_id.to_string());
    }

    /// The next call fails with a provider error carrying `message`.
    pub fn fail_next(&self, message: &str) {
        self.state.lock().unwrap().fail_next = Some(message.to_string());
    }

    pub fn subscription(&self, subscription_id: &str) -> Option<SubscriptionInfo> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.subscription_id.as_str() == subscription_id)
            .cloned()
    }

    /// Subscriptions the provider would keep billing.
    pub fn active_subscriptions(&self, customer_id: &str) -> Vec<SubscriptionInfo> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|s| s.customer_id.as_str() == customer_id && s.is_live())
            .cloned()
            .collect()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn begin(&self, call: ProviderCall) -> AppResult<std::sync::MutexGuard<'_, FakeProviderState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(message) => Err(AppError::Provider(message)),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl BillingProviderPort for FakeBillingProvider {
    async fn list_subscriptions(
        &self,
        customer: &CustomerId,
        limit: u32,
    ) -> AppResult<Vec<SubscriptionInfo>> {
        let state = self.begin(ProviderCall::ListSubscriptions {
            customer: customer.to_string(),
            limit,
        })?;
        Ok(state
            .subscriptions
            .iter()
            .rev()
            .filter(|s| &s.customer_id == customer)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn cancel_subscription(
        &self,
        subscription: &SubscriptionId,
        at_period_end: bool,
    ) -> AppResult<SubscriptionInfo> {
        let mut state = self.begin(ProviderCall::Cancel {
            subscription: subscription.to_string(),
            at_period_end,
        })?;
        let sub = state
            .subscriptions
            .iter_mut()
            .find(|s| &s.subscription_id == subscription)
            .ok_or_else(|| AppError::Provider(format!("No such subscription: {}", subscription)))?;

        if at_period_end {
            sub.cancel_at_period_end = true;
        } else {
            sub.provider_status = "canceled".to_string();
            sub.cancel_at_period_end = false;
            sub.canceled_at = Some(Utc::now());
        }
        Ok(sub.clone())
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSessionResult> {
        let mut state = self.begin(ProviderCall::CreateCheckout(request.clone()))?;
        state.sessions_created += 1;
        let session_id = format!("cs_test_{}", state.sessions_created);
        Ok(CheckoutSessionResult {
            url: format!("https://checkout.stripe.test/c/pay/{}", session_id),
            session_id,
        })
    }

    async fn checkout_line_item_price(&self, session_id: &str) -> AppResult<Option<String>> {
        let state = self.begin(ProviderCall::LineItems {
            session_id: session_id.to_string(),
        })?;
        Ok(state.line_item_prices.get(session_id).cloned())
    }
}
