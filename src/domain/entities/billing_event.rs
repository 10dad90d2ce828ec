//! Typed view over verified provider webhook events.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Event types the dispatcher distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    CheckoutSessionCompleted,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentFailed,
    InvoicePaymentSucceeded,
    InvoicePaid,
    Other(String),
}

impl BillingEventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => BillingEventKind::CheckoutSessionCompleted,
            "customer.subscription.created" => BillingEventKind::SubscriptionCreated,
            "customer.subscription.updated" => BillingEventKind::SubscriptionUpdated,
            "customer.subscription.deleted" => BillingEventKind::SubscriptionDeleted,
            "invoice.payment_failed" => BillingEventKind::InvoicePaymentFailed,
            "invoice.payment_succeeded" => BillingEventKind::InvoicePaymentSucceeded,
            "invoice.paid" => BillingEventKind::InvoicePaid,
            other => BillingEventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BillingEventKind::CheckoutSessionCompleted => "checkout.session.completed",
            BillingEventKind::SubscriptionCreated => "customer.subscription.created",
            BillingEventKind::SubscriptionUpdated => "customer.subscription.updated",
            BillingEventKind::SubscriptionDeleted => "customer.subscription.deleted",
            BillingEventKind::InvoicePaymentFailed => "invoice.payment_failed",
            BillingEventKind::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            BillingEventKind::InvoicePaid => "invoice.paid",
            BillingEventKind::Other(s) => s,
        }
    }
}

impl std::fmt::Display for BillingEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wire shape of a provider event envelope.
#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// A verified webhook event. `object` is the loosely-typed snapshot whose shape
/// depends on `kind`; use the typed accessors to read it.
#[derive(Debug, Clone)]
pub struct BillingEvent {
    pub id: String,
    pub kind: BillingEventKind,
    pub object: serde_json::Value,
}

impl BillingEvent {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_slice(bytes)?;
        Ok(Self {
            id: raw.id,
            kind: BillingEventKind::parse(&raw.event_type),
            object: raw.data.object,
        })
    }

    pub fn checkout_session(&self) -> Option<CheckoutSessionObject> {
        serde_json::from_value(self.object.clone()).ok()
    }

    pub fn subscription(&self) -> Option<SubscriptionObject> {
        serde_json::from_value(self.object.clone()).ok()
    }

    pub fn invoice(&self) -> Option<InvoiceObject> {
        serde_json::from_value(self.object.clone()).ok()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub line_items: Option<LineItemList>,
}

impl CheckoutSessionObject {
    /// Internal user id carried by the session, if any.
    pub fn user_ref(&self) -> Option<&str> {
        self.client_reference_id
            .as_deref()
            .or_else(|| self.metadata_value("user_id"))
            .filter(|s| !s.is_empty())
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    /// Price of the first expanded line item, if the payload carries them.
    pub fn line_item_price_id(&self) -> Option<&str> {
        self.line_items
            .as_ref()
            .and_then(|items| items.data.first())
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItemList {
    #[serde(default)]
    pub data: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub price: Option<PriceRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub parent: Option<InvoiceParent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceParent {
    #[serde(default)]
    pub subscription_details: Option<InvoiceSubscriptionDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSubscriptionDetails {
    #[serde(default)]
    pub subscription: Option<String>,
}

impl InvoiceObject {
    /// Subscription id, from either the legacy top-level field or the newer
    /// `parent.subscription_details` location.
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription
            .as_deref()
            .or_else(|| {
                self.parent
                    .as_ref()
                    .and_then(|p| p.subscription_details.as_ref())
                    .and_then(|d| d.subscription.as_deref())
            })
            .filter(|s| !s.is_empty())
    }
}
