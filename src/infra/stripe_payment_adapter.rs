use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{
        BillingProviderPort, CheckoutSessionRequest, CheckoutSessionResult, CustomerId,
        SubscriptionId, SubscriptionInfo,
    },
    infra::stripe_client::{StripeClient, StripeSubscription},
};

/// Adapter that wraps StripeClient to implement BillingProviderPort.
#[derive(Clone)]
pub struct StripePaymentAdapter {
    client: StripeClient,
}

impl StripePaymentAdapter {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            client: StripeClient::new(secret_key),
        }
    }

    fn opt_timestamp_to_datetime(ts: Option<i64>) -> Option<DateTime<Utc>> {
        ts.and_then(|t| Utc.timestamp_opt(t, 0).single())
    }

    fn to_subscription_info(sub: StripeSubscription) -> SubscriptionInfo {
        let price = sub.price();
        SubscriptionInfo {
            subscription_id: SubscriptionId::new(sub.id.clone()),
            customer_id: CustomerId::new(sub.customer.clone()),
            provider_status: sub.status.clone(),
            cancel_at_period_end: sub.cancel_at_period_end,
            current_period_start: Self::opt_timestamp_to_datetime(sub.period_start()),
            current_period_end: Self::opt_timestamp_to_datetime(sub.period_end()),
            canceled_at: Self::opt_timestamp_to_datetime(sub.canceled_at),
            price_id: price.map(|p| p.id.clone()),
            unit_amount: price.and_then(|p| p.unit_amount),
            currency: price.and_then(|p| p.currency.clone()),
        }
    }
}

#[async_trait]
impl BillingProviderPort for StripePaymentAdapter {
    async fn list_subscriptions(
        &self,
        customer: &CustomerId,
        limit: u32,
    ) -> AppResult<Vec<SubscriptionInfo>> {
        let subs = self
            .client
            .list_subscriptions(customer.as_str(), limit)
            .await?;
        Ok(subs.into_iter().map(Self::to_subscription_info).collect())
    }

    async fn cancel_subscription(
        &self,
        subscription: &SubscriptionId,
        at_period_end: bool,
    ) -> AppResult<SubscriptionInfo> {
        let sub = self
            .client
            .cancel_subscription(subscription.as_str(), at_period_end)
            .await?;
        Ok(Self::to_subscription_info(sub))
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSessionResult> {
        let session = self.client.create_checkout_session(request).await?;
        let url = session
            .url
            .ok_or_else(|| AppError::Provider("Checkout session has no URL".into()))?;

        Ok(CheckoutSessionResult {
            session_id: session.id,
            url,
        })
    }

    async fn checkout_line_item_price(&self, session_id: &str) -> AppResult<Option<String>> {
        let items = self.client.list_checkout_line_items(session_id).await?;
        Ok(items
            .into_iter()
            .next()
            .and_then(|item| item.price)
            .map(|price| price.id))
    }
}
