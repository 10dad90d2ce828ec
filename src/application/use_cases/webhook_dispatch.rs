use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        plan_catalog::PlanCatalog,
        ports::payment_provider::{CustomerId, OptionalProvider, SubscriptionId},
        use_cases::{
            reconciliation::{ReconcileOutcome, ReconciliationUseCases, minor_to_major},
            subscription::{
                CreateOrderInput, CustomerRepo, OrderRepo, SubscriptionRepo,
                SubscriptionStatusUpdate, UpsertSubscriptionInput,
            },
        },
    },
    domain::entities::{
        billing_event::{BillingEvent, BillingEventKind, CheckoutSessionObject},
        billing_period::BillingPeriod,
        checkout_mode::CheckoutMode,
        plan::Plan,
        subscription_status::SubscriptionStatus,
    },
};

/// What handling a single event did.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Reconciled(ReconcileOutcome),
    Canceled,
    MarkedPastDue,
    LifetimeGranted,
    /// Nothing changed: informational event, unhandled kind or missing fields.
    Ignored,
}

/// Routes verified provider events to a reconciliation pass or a narrow local update.
#[derive(Clone)]
pub struct WebhookDispatchUseCases {
    reconciliation: ReconciliationUseCases,
    provider: OptionalProvider,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    customer_repo: Arc<dyn CustomerRepo>,
    order_repo: Arc<dyn OrderRepo>,
    catalog: Arc<PlanCatalog>,
    /// Wait before reconciling a completed checkout so the provider has
    /// finished attaching the subscription to the customer.
    settle_delay: Duration,
}

impl WebhookDispatchUseCases {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reconciliation: ReconciliationUseCases,
        provider: OptionalProvider,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        customer_repo: Arc<dyn CustomerRepo>,
        order_repo: Arc<dyn OrderRepo>,
        catalog: Arc<PlanCatalog>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            reconciliation,
            provider,
            subscription_repo,
            customer_repo,
            order_repo,
            catalog,
            settle_delay,
        }
    }

    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.kind))]
    pub async fn dispatch(&self, event: &BillingEvent) -> AppResult<DispatchOutcome> {
        match &event.kind {
            BillingEventKind::CheckoutSessionCompleted => self.handle_checkout_completed(event).await,
            BillingEventKind::SubscriptionCreated | BillingEventKind::SubscriptionUpdated => {
                self.handle_subscription_changed(event).await
            }
            BillingEventKind::SubscriptionDeleted => self.handle_subscription_deleted(event).await,
            BillingEventKind::InvoicePaymentFailed => self.handle_payment_failed(event).await,
            BillingEventKind::InvoicePaymentSucceeded | BillingEventKind::InvoicePaid => {
                if let Some(invoice) = event.invoice() {
                    tracing::info!(
                        invoice_id = %invoice.id,
                        subscription_id = ?invoice.subscription_id(),
                        "Invoice paid"
                    );
                }
                Ok(DispatchOutcome::Ignored)
            }
            BillingEventKind::Other(kind) => {
                tracing::debug!(kind = %kind, "Unhandled event type");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    // ========================================================================
    // Checkout
    // ========================================================================

    async fn handle_checkout_completed(&self, event: &BillingEvent) -> AppResult<DispatchOutcome> {
        let Some(session) = event.checkout_session() else {
            tracing::warn!("Checkout event without a session object");
            return Ok(DispatchOutcome::Ignored);
        };

        let user_id = parse_user_ref(&session);

        match session.mode.as_deref().map(str::parse::<CheckoutMode>) {
            Some(Ok(CheckoutMode::Subscription)) => {
                self.complete_subscription_checkout(&session, user_id).await
            }
            Some(Ok(CheckoutMode::Payment)) => self.complete_payment_checkout(&session, user_id).await,
            _ => {
                tracing::info!(session_id = %session.id, mode = ?session.mode, "Skipping checkout session");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    async fn complete_subscription_checkout(
        &self,
        session: &CheckoutSessionObject,
        user_id: Option<Uuid>,
    ) -> AppResult<DispatchOutcome> {
        let (Some(customer_id), Some(subscription_id)) =
            (session.customer.as_deref(), session.subscription.as_deref())
        else {
            tracing::warn!(session_id = %session.id, "Subscription checkout without customer or subscription");
            return Ok(DispatchOutcome::Ignored);
        };

        if let Some(user_id) = user_id {
            self.customer_repo.upsert(user_id, customer_id).await?;
        }

        tracing::info!(
            customer_id = %customer_id,
            subscription_id = %subscription_id,
            user_id = ?user_id,
            "Subscription checkout completed"
        );

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let outcome = self
            .reconciliation
            .reconcile(&CustomerId::new(customer_id))
            .await?;
        Ok(DispatchOutcome::Reconciled(outcome))
    }

    async fn complete_payment_checkout(
        &self,
        session: &CheckoutSessionObject,
        user_id: Option<Uuid>,
    ) -> AppResult<DispatchOutcome> {
        if !session.is_paid() {
            tracing::info!(
                session_id = %session.id,
                payment_status = ?session.payment_status,
                "Payment checkout not paid yet"
            );
            return Ok(DispatchOutcome::Ignored);
        }

        let (Some(user_id), Some(customer_id)) = (user_id, session.customer.as_deref()) else {
            tracing::warn!(session_id = %session.id, "Paid checkout without user or customer");
            return Ok(DispatchOutcome::Ignored);
        };

        self.customer_repo.upsert(user_id, customer_id).await?;

        let price_id = self.checkout_price_id(session).await;
        let plan = price_id
            .as_deref()
            .map(|id| self.catalog.resolve(id))
            .unwrap_or_else(Plan::unknown)
            .as_lifetime();
        let amount = session.amount_total.map(minor_to_major);
        let currency = session.currency.as_deref().map(str::to_uppercase);

        let created = self
            .order_repo
            .record(&CreateOrderInput {
                user_id,
                stripe_customer_id: customer_id.to_string(),
                checkout_session_id: session.id.clone(),
                price_id: price_id.clone(),
                plan_name: plan.name.clone(),
                amount,
                currency: currency.clone(),
            })
            .await?;
        if !created {
            tracing::info!(session_id = %session.id, "Order already recorded");
        }

        self.release_recurring_subscription(user_id).await?;

        self.subscription_repo
            .upsert_for_user(&UpsertSubscriptionInput {
                user_id,
                stripe_customer_id: customer_id.to_string(),
                stripe_subscription_id: None,
                plan_name: plan.name.clone(),
                billing_period: BillingPeriod::Lifetime,
                status: SubscriptionStatus::Active,
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
                canceled_at: None,
                amount,
                currency,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            customer_id = %customer_id,
            plan = %plan.name,
            "Lifetime plan granted"
        );
        Ok(DispatchOutcome::LifetimeGranted)
    }

    /// The lifetime grant replaces the user's row, so a recurring subscription
    /// still billing on the provider side is scheduled to end with its period.
    /// Provider failures are logged and do not block the grant.
    async fn release_recurring_subscription(&self, user_id: Uuid) -> AppResult<()> {
        let Some(row) = self.subscription_repo.get_by_user(user_id).await? else {
            return Ok(());
        };
        let Some(subscription_id) = row.stripe_subscription_id.as_deref() else {
            return Ok(());
        };
        let billing = matches!(
            row.status,
            SubscriptionStatus::Active | SubscriptionStatus::PastDue
        );
        if !row.billing_period.is_recurring() || !billing {
            return Ok(());
        }

        tracing::warn!(
            user_id = %user_id,
            subscription_id = %subscription_id,
            "Lifetime purchase supersedes a recurring subscription"
        );

        let Some(provider) = &self.provider else {
            tracing::warn!(
                subscription_id = %subscription_id,
                "No billing provider, recurring subscription left running"
            );
            return Ok(());
        };

        match provider
            .cancel_subscription(&SubscriptionId::new(subscription_id), true)
            .await
        {
            Ok(_) => tracing::info!(
                subscription_id = %subscription_id,
                "Superseded subscription set to cancel at period end"
            ),
            Err(e) => tracing::error!(
                user_id = %user_id,
                subscription_id = %subscription_id,
                error = %e,
                "Failed to cancel superseded subscription"
            ),
        }
        Ok(())
    }

    /// Expanded line items first, then a provider lookup, then checkout metadata.
    async fn checkout_price_id(&self, session: &CheckoutSessionObject) -> Option<String> {
        if let Some(price_id) = session.line_item_price_id() {
            return Some(price_id.to_string());
        }

        if let Some(provider) = &self.provider {
            match provider.checkout_line_item_price(&session.id).await {
                Ok(Some(price_id)) => return Some(price_id),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Line item lookup failed");
                }
            }
        }

        session.metadata_value("price_id").map(str::to_string)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    async fn handle_subscription_changed(&self, event: &BillingEvent) -> AppResult<DispatchOutcome> {
        let Some(customer_id) = event.subscription().and_then(|s| s.customer) else {
            tracing::warn!("Subscription event without customer");
            return Ok(DispatchOutcome::Ignored);
        };

        let outcome = self
            .reconciliation
            .reconcile(&CustomerId::new(customer_id))
            .await?;
        Ok(DispatchOutcome::Reconciled(outcome))
    }

    async fn handle_subscription_deleted(&self, event: &BillingEvent) -> AppResult<DispatchOutcome> {
        let Some(subscription) = event.subscription() else {
            tracing::warn!("Subscription deleted event without subscription object");
            return Ok(DispatchOutcome::Ignored);
        };

        let canceled_at = subscription
            .canceled_at
            .or(subscription.ended_at)
            .and_then(from_unix)
            .unwrap_or_else(Utc::now);

        let update = SubscriptionStatusUpdate {
            status: SubscriptionStatus::Canceled,
            cancel_at_period_end: Some(false),
            canceled_at: Some(canceled_at),
        };

        match self
            .subscription_repo
            .update_by_subscription_id(&subscription.id, &update)
            .await?
        {
            Some(row) => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    user_id = ?row.user_id,
                    "Subscription canceled"
                );
                Ok(DispatchOutcome::Canceled)
            }
            None => {
                tracing::info!(subscription_id = %subscription.id, "No local subscription to cancel");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    // ========================================================================
    // Invoices
    // ========================================================================

    async fn handle_payment_failed(&self, event: &BillingEvent) -> AppResult<DispatchOutcome> {
        let Some(invoice) = event.invoice() else {
            tracing::warn!("Invoice event without invoice object");
            return Ok(DispatchOutcome::Ignored);
        };
        let Some(subscription_id) = invoice.subscription_id() else {
            tracing::info!(invoice_id = %invoice.id, "Failed invoice is not tied to a subscription");
            return Ok(DispatchOutcome::Ignored);
        };

        let update = SubscriptionStatusUpdate {
            status: SubscriptionStatus::PastDue,
            cancel_at_period_end: None,
            canceled_at: None,
        };

        match self
            .subscription_repo
            .update_by_subscription_id(subscription_id, &update)
            .await?
        {
            Some(_) => {
                tracing::warn!(
                    invoice_id = %invoice.id,
                    subscription_id = %subscription_id,
                    "Invoice payment failed, subscription past due"
                );
                Ok(DispatchOutcome::MarkedPastDue)
            }
            None => {
                tracing::info!(subscription_id = %subscription_id, "No local subscription for failed invoice");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }
}

fn parse_user_ref(session: &CheckoutSessionObject) -> Option<Uuid> {
    let raw = session.user_ref()?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!(session_id = %session.id, user_ref = %raw, "Checkout user reference is not a UUID");
            None
        }
    }
}

fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
