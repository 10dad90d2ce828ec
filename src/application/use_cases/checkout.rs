use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        plan_catalog::PlanCatalog,
        ports::payment_provider::{
            CheckoutSessionRequest, CustomerId, OptionalProvider, SubscriptionInfo,
            require_provider,
        },
        use_cases::subscription::CustomerRepo,
    },
    domain::entities::checkout_mode::CheckoutMode,
};

/// Placeholder the provider substitutes with the real session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Upper bound on subscriptions fetched before a recurring checkout.
const EXISTING_SUBSCRIPTIONS_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub user_id: Option<Uuid>,
    pub price_id: String,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub customer_email: Option<String>,
    /// Falls back to the catalog: lifetime plans check out as one-time payments.
    pub mode: Option<CheckoutMode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Clone)]
pub struct CheckoutUseCases {
    provider: OptionalProvider,
    customer_repo: Arc<dyn CustomerRepo>,
    catalog: Arc<PlanCatalog>,
    app_origin: Url,
}

impl CheckoutUseCases {
    pub fn new(
        provider: OptionalProvider,
        customer_repo: Arc<dyn CustomerRepo>,
        catalog: Arc<PlanCatalog>,
        app_origin: Url,
    ) -> Self {
        Self {
            provider,
            customer_repo,
            catalog,
            app_origin,
        }
    }

    /// Creates a hosted checkout session. Recurring checkouts first cancel the
    /// user's active subscriptions so the new one ends up the only one.
    /// Nothing is persisted here; the webhook path records the outcome.
    #[instrument(skip(self, request), fields(user_id = ?request.user_id, price_id = %request.price_id))]
    pub async fn create_checkout(&self, request: CheckoutRequest) -> AppResult<CheckoutResponse> {
        let price_id = request.price_id.trim();
        if price_id.is_empty() {
            return Err(AppError::InvalidInput("price_id is required".into()));
        }

        let provider = require_provider(&self.provider)?;

        let plan = self.catalog.resolve(price_id);
        let mode = request.mode.unwrap_or(if plan.billing_period.is_lifetime() {
            CheckoutMode::Payment
        } else {
            CheckoutMode::Subscription
        });

        let customer = match request.user_id {
            Some(user_id) => self
                .customer_repo
                .get_customer_id(user_id)
                .await?
                .map(CustomerId::new),
            None => None,
        };

        if let (true, Some(customer)) = (mode.is_recurring(), &customer) {
            let live = provider
                .list_subscriptions(customer, EXISTING_SUBSCRIPTIONS_LIMIT)
                .await?
                .into_iter()
                .filter(SubscriptionInfo::is_live);
            for subscription in live {
                tracing::info!(
                    customer_id = %customer,
                    subscription_id = %subscription.subscription_id,
                    provider_status = %subscription.provider_status,
                    "Canceling existing subscription before checkout"
                );
                provider
                    .cancel_subscription(&subscription.subscription_id, false)
                    .await?;
            }
        }

        let mut metadata = HashMap::from([("price_id".to_string(), price_id.to_string())]);
        if let Some(user_id) = request.user_id {
            metadata.insert("user_id".to_string(), user_id.to_string());
        }

        let session_request = CheckoutSessionRequest {
            mode,
            price_id: price_id.to_string(),
            success_url: non_empty(request.success_url).unwrap_or_else(|| self.default_success_url()),
            cancel_url: non_empty(request.cancel_url).unwrap_or_else(|| self.default_cancel_url()),
            // The provider rejects an email alongside an existing customer
            customer_email: match customer {
                Some(_) => None,
                None => non_empty(request.customer_email),
            },
            customer,
            client_reference_id: request.user_id.map(|id| id.to_string()),
            metadata,
        };

        let session = provider.create_checkout_session(&session_request).await?;

        tracing::info!(
            session_id = %session.session_id,
            mode = %mode,
            plan = %plan.name,
            "Checkout session created"
        );

        Ok(CheckoutResponse {
            url: session.url,
            session_id: session.session_id,
        })
    }

    fn origin(&self) -> &str {
        self.app_origin.as_str().trim_end_matches('/')
    }

    fn default_success_url(&self) -> String {
        format!(
            "{}/billing/success?session_id={}",
            self.origin(),
            SESSION_ID_PLACEHOLDER
        )
    }

    fn default_cancel_url(&self) -> String {
        format!("{}/billing/cancel", self.origin())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
