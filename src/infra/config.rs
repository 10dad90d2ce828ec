use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Base for the default checkout redirect URLs.
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    /// Provider API key. Checkout and cancellation answer 500 while unset.
    pub stripe_secret_key: Option<SecretString>,
    /// Webhook signing secret. The webhook answers 500 while unset.
    pub stripe_webhook_secret: Option<SecretString>,
    /// Verifies bearer tokens issued by the marketplace's user system.
    pub jwt_secret: SecretString,
    pub checkout_settle_delay: Duration,
    pub webhook_worker_concurrency: usize,
    pub webhook_queue_capacity: usize,
    /// Extra plan catalog entries, `price_id=name:period;...`
    pub plan_catalog: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let app_origin: Url = get_env_default(
            "APP_ORIGIN",
            Url::parse("http://localhost:3000").expect("default APP_ORIGIN is a valid URL"),
        );
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let stripe_secret_key = optional_secret("STRIPE_SECRET_KEY");
        let stripe_webhook_secret = optional_secret("STRIPE_WEBHOOK_SECRET");

        let checkout_settle_delay_ms: u64 = get_env_default("CHECKOUT_SETTLE_DELAY_MS", 2_000);
        let webhook_worker_concurrency: usize = get_env_default("WEBHOOK_WORKER_CONCURRENCY", 8);
        let webhook_queue_capacity: usize = get_env_default("WEBHOOK_QUEUE_CAPACITY", 256);
        let plan_catalog: String = get_env_default("PLAN_CATALOG", String::new());

        if stripe_secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY not set, checkout and cancellation are disabled");
        }
        if stripe_webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, webhooks will be rejected");
        }

        Self {
            database_url,
            bind_addr,
            app_origin,
            cors_origin,
            stripe_secret_key,
            stripe_webhook_secret,
            jwt_secret,
            checkout_settle_delay: Duration::from_millis(checkout_settle_delay_ms),
            webhook_worker_concurrency: webhook_worker_concurrency.max(1),
            webhook_queue_capacity: webhook_queue_capacity.max(1),
            plan_catalog,
        }
    }
}

/// Unset and empty both count as missing.
fn optional_secret(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| SecretString::new(v.into()))
}
