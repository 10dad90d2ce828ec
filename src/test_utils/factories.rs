//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, TimeZone, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    application::{
        jwt,
        plan_catalog::PlanCatalog,
        ports::payment_provider::{CustomerId, SubscriptionId, SubscriptionInfo},
        use_cases::subscription::SubscriptionProfile,
    },
    domain::entities::{
        billing_event::BillingEvent, billing_period::BillingPeriod,
        subscription_status::SubscriptionStatus,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret_for_billing";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Built-in catalog plus the premier prices used across tests.
pub fn test_catalog() -> PlanCatalog {
    PlanCatalog::with_overrides(
        "price_premier_monthly=premier:monthly;\
         price_premier_yearly=premier:yearly;\
         price_premier_lifetime=premier:lifetime",
    )
}

/// Create a local subscription row: an active monthly odbornik plan.
pub fn create_test_subscription(
    overrides: impl FnOnce(&mut SubscriptionProfile),
) -> SubscriptionProfile {
    let mut subscription = SubscriptionProfile {
        id: Uuid::new_v4(),
        user_id: Some(Uuid::new_v4()),
        stripe_customer_id: "cus_test_1".to_string(),
        stripe_subscription_id: Some("sub_test_1".to_string()),
        plan_name: "odbornik".to_string(),
        billing_period: BillingPeriod::Monthly,
        status: SubscriptionStatus::Active,
        current_period_start: Some(test_datetime()),
        current_period_end: Some(test_datetime() + Duration::days(30)),
        cancel_at_period_end: false,
        canceled_at: None,
        amount: Some(9.9),
        currency: Some("EUR".to_string()),
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut subscription);
    subscription
}

/// Create a provider-side subscription: active, built-in odbornik price.
pub fn create_test_subscription_info(
    overrides: impl FnOnce(&mut SubscriptionInfo),
) -> SubscriptionInfo {
    let mut info = SubscriptionInfo {
        subscription_id: SubscriptionId::new("sub_test_1"),
        customer_id: CustomerId::new("cus_test_1"),
        provider_status: "active".to_string(),
        cancel_at_period_end: false,
        current_period_start: Some(test_datetime()),
        current_period_end: Some(test_datetime() + Duration::days(30)),
        canceled_at: None,
        price_id: Some("price_1SNKxAFUTMN3g7t4IS59w1Gc".to_string()),
        unit_amount: Some(990),
        currency: Some("eur".to_string()),
    };
    overrides(&mut info);
    info
}

/// Wrap `object` in a provider event envelope of the given type.
pub fn create_test_event(event_type: &str, object: serde_json::Value) -> BillingEvent {
    let body = test_event_body(event_type, object);
    BillingEvent::from_json(body.as_bytes()).expect("test event should decode")
}

/// Raw JSON body of a provider event, as it arrives on the webhook.
pub fn test_event_body(event_type: &str, object: serde_json::Value) -> String {
    serde_json::json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "object": "event",
        "type": event_type,
        "created": Utc::now().timestamp(),
        "data": { "object": object }
    })
    .to_string()
}

/// Bearer token for `user_id`, signed with `TEST_JWT_SECRET`.
pub fn test_token(user_id: Uuid) -> String {
    jwt::issue(user_id, &test_jwt_secret(), time::Duration::hours(1))
        .expect("test token should encode")
}

pub fn test_jwt_secret() -> SecretString {
    SecretString::new(TEST_JWT_SECRET.to_string().into())
}

/// Fixed datetime for deterministic tests.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}
