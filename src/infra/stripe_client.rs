use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::payment_provider::CheckoutSessionRequest;
use crate::domain::entities::checkout_mode::CheckoutMode;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url: STRIPE_API_BASE.to_string(),
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Lists subscriptions in every status, including canceled ones. Newest first.
    pub async fn list_subscriptions(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> AppResult<Vec<StripeSubscription>> {
        let query = [
            ("customer", customer_id.to_string()),
            ("status", "all".to_string()),
            ("limit", limit.to_string()),
        ];

        let response = self
            .client
            .get(format!("{}/subscriptions", self.base_url))
            .header("Authorization", self.auth_header())
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe request failed: {}", e)))?;

        let list: StripeList<StripeSubscription> = self.handle_response(response).await?;
        Ok(list.data)
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> AppResult<StripeSubscription> {
        let request = if at_period_end {
            self.client
                .post(format!("{}/subscriptions/{}", self.base_url, subscription_id))
                .form(&[("cancel_at_period_end", "true")])
        } else {
            self.client
                .delete(format!("{}/subscriptions/{}", self.base_url, subscription_id))
        };

        let response = request
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Checkout Sessions
    // ========================================================================

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<StripeCheckoutSession> {
        let params = checkout_session_params(request);

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    pub async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> AppResult<Vec<StripeLineItem>> {
        let response = self
            .client
            .get(format!(
                "{}/checkout/sessions/{}/line_items",
                self.base_url, session_id
            ))
            .header("Authorization", self.auth_header())
            .query(&[("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe request failed: {}", e)))?;

        let list: StripeList<StripeLineItem> = self.handle_response(response).await?;
        Ok(list.data)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::Provider(format!(
                    "Stripe error: {}",
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Provider(format!(
                "Stripe API error: {}",
                status
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Stripe response");
            AppError::Provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Form fields for `POST /checkout/sessions`.
fn checkout_session_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("mode".to_string(), request.mode.as_str().to_string()),
        ("line_items[0][price]".to_string(), request.price_id.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    match (&request.customer, &request.customer_email) {
        (Some(customer), _) => {
            params.push(("customer".to_string(), customer.as_str().to_string()));
        }
        (None, Some(email)) => {
            params.push(("customer_email".to_string(), email.clone()));
        }
        (None, None) => {}
    }

    // One-time payments only get a customer object when asked for one
    if request.customer.is_none() && request.mode == CheckoutMode::Payment {
        params.push(("customer_creation".to_string(), "always".to_string()));
    }

    if let Some(ref_id) = &request.client_reference_id {
        params.push(("client_reference_id".to_string(), ref_id.clone()));
    }

    let mut metadata: Vec<_> = request.metadata.iter().collect();
    metadata.sort();
    for (key, value) in metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
        if request.mode.is_recurring() {
            params.push((
                format!("subscription_data[metadata][{}]", key),
                value.clone(),
            ));
        }
    }

    params
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeLineItem {
    pub price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
    pub items: StripeList<StripeSubscriptionItem>,
}

impl StripeSubscription {
    fn first_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.data.first()
    }

    pub fn price(&self) -> Option<&StripePrice> {
        self.first_item().map(|item| &item.price)
    }

    /// Newer API versions report billing periods per item only.
    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| self.first_item().and_then(|i| i.current_period_start))
    }

    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.first_item().and_then(|i| i.current_period_end))
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
}
