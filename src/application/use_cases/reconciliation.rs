use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        plan_catalog::PlanCatalog,
        ports::payment_provider::{CustomerId, OptionalProvider, SubscriptionInfo, require_provider},
        use_cases::subscription::{CustomerRepo, SubscriptionRepo, UpsertSubscriptionInput},
    },
    domain::entities::{plan::Plan, subscription_status::SubscriptionStatus},
};

/// What a reconciliation pass did to the local projection.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The user's row now mirrors the provider's latest subscription.
    Synced {
        user_id: Uuid,
        status: SubscriptionStatus,
    },
    /// The provider has no subscription for the customer.
    NotStarted,
    /// The customer is not bound to a user yet, so there is no row to write.
    NoUserMapping,
    /// The user holds an active lifetime grant, which reconciliation never overwrites.
    LifetimePreserved,
}

/// Refetches a customer's billing state from the provider and overwrites the
/// local projection with it. Safe to run any number of times, in any order.
#[derive(Clone)]
pub struct ReconciliationUseCases {
    provider: OptionalProvider,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    customer_repo: Arc<dyn CustomerRepo>,
    catalog: Arc<PlanCatalog>,
}

impl ReconciliationUseCases {
    pub fn new(
        provider: OptionalProvider,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        customer_repo: Arc<dyn CustomerRepo>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            provider,
            subscription_repo,
            customer_repo,
            catalog,
        }
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn reconcile(&self, customer_id: &CustomerId) -> AppResult<ReconcileOutcome> {
        let provider = require_provider(&self.provider)?;

        let latest = provider
            .list_subscriptions(customer_id, 1)
            .await?
            .into_iter()
            .next();

        let user_id = self.customer_repo.get_user_id(customer_id.as_str()).await?;

        let Some(subscription) = latest else {
            let written = self
                .subscription_repo
                .upsert_not_started(customer_id.as_str(), user_id)
                .await?;
            return Ok(match written {
                Some(_) => {
                    tracing::info!(user_id = ?user_id, "Customer has no subscription");
                    ReconcileOutcome::NotStarted
                }
                None => {
                    tracing::info!(user_id = ?user_id, "Lifetime grant kept, no subscription at provider");
                    ReconcileOutcome::LifetimePreserved
                }
            });
        };

        let Some(user_id) = user_id else {
            tracing::warn!(
                subscription_id = %subscription.subscription_id,
                "No user mapped to customer, skipping reconciliation"
            );
            return Ok(ReconcileOutcome::NoUserMapping);
        };

        let input = self.to_upsert_input(user_id, customer_id, &subscription);
        let status = input.status;

        match self.subscription_repo.upsert_for_user(&input).await? {
            Some(_) => {
                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %subscription.subscription_id,
                    status = %status,
                    plan = %input.plan_name,
                    "Subscription reconciled"
                );
                Ok(ReconcileOutcome::Synced { user_id, status })
            }
            None => {
                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %subscription.subscription_id,
                    "User holds a lifetime grant, provider subscription not applied"
                );
                Ok(ReconcileOutcome::LifetimePreserved)
            }
        }
    }

    fn to_upsert_input(
        &self,
        user_id: Uuid,
        customer_id: &CustomerId,
        subscription: &SubscriptionInfo,
    ) -> UpsertSubscriptionInput {
        let plan = subscription
            .price_id
            .as_deref()
            .map(|price_id| self.catalog.resolve(price_id))
            .unwrap_or_else(Plan::unknown);

        UpsertSubscriptionInput {
            user_id,
            stripe_customer_id: customer_id.as_str().to_string(),
            stripe_subscription_id: Some(subscription.subscription_id.as_str().to_string()),
            plan_name: plan.name,
            billing_period: plan.billing_period,
            status: subscription.local_status(),
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            cancel_at_period_end: subscription.cancel_at_period_end,
            canceled_at: subscription.canceled_at,
            amount: subscription.unit_amount.map(minor_to_major),
            currency: subscription.currency.as_deref().map(str::to_uppercase),
        }
    }
}

/// Provider amounts are in minor units (cents).
pub fn minor_to_major(amount: i64) -> f64 {
    amount as f64 / 100.0
}
