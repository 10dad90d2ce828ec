//! Wires the in-memory mocks into use cases and into a full `AppState`
//! for HTTP-level tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        plan_catalog::PlanCatalog,
        ports::payment_provider::{BillingProviderPort, OptionalProvider},
        use_cases::{
            cancellation::CancellationUseCases, checkout::CheckoutUseCases,
            reconciliation::ReconciliationUseCases, webhook_dispatch::WebhookDispatchUseCases,
        },
    },
    infra::{config::AppConfig, event_worker::EventQueue},
    test_utils::{
        FakeBillingProvider, InMemoryCustomerRepo, InMemoryOrderRepo, InMemorySubscriptionRepo,
        TEST_JWT_SECRET, TEST_WEBHOOK_SECRET, test_catalog, test_jwt_secret,
    },
};

const TEST_ORIGIN: &str = "http://localhost:3000";

/// Shared in-memory collaborators. Use cases built from the same mocks see
/// each other's writes.
#[derive(Clone)]
pub struct BillingMocks {
    pub provider: Arc<FakeBillingProvider>,
    pub subscriptions: Arc<InMemorySubscriptionRepo>,
    pub customers: Arc<InMemoryCustomerRepo>,
    pub orders: Arc<InMemoryOrderRepo>,
    pub catalog: Arc<PlanCatalog>,
}

impl BillingMocks {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(FakeBillingProvider::new()),
            subscriptions: Arc::new(InMemorySubscriptionRepo::new()),
            customers: Arc::new(InMemoryCustomerRepo::new()),
            orders: Arc::new(InMemoryOrderRepo::new()),
            catalog: Arc::new(test_catalog()),
        }
    }

    fn provider_handle(&self) -> OptionalProvider {
        let provider: Arc<dyn BillingProviderPort> = self.provider.clone();
        Some(provider)
    }

    fn reconciliation_with(&self, provider: OptionalProvider) -> ReconciliationUseCases {
        ReconciliationUseCases::new(
            provider,
            self.subscriptions.clone(),
            self.customers.clone(),
            self.catalog.clone(),
        )
    }

    fn dispatcher_with(&self, provider: OptionalProvider) -> WebhookDispatchUseCases {
        WebhookDispatchUseCases::new(
            self.reconciliation_with(provider.clone()),
            provider,
            self.subscriptions.clone(),
            self.customers.clone(),
            self.orders.clone(),
            self.catalog.clone(),
            std::time::Duration::ZERO,
        )
    }

    pub fn reconciliation(&self) -> ReconciliationUseCases {
        self.reconciliation_with(self.provider_handle())
    }

    /// Dispatcher without the checkout settle delay.
    pub fn dispatcher(&self) -> WebhookDispatchUseCases {
        self.dispatcher_with(self.provider_handle())
    }

    pub fn dispatcher_without_provider(&self) -> WebhookDispatchUseCases {
        self.dispatcher_with(None)
    }

    pub fn checkout(&self) -> CheckoutUseCases {
        CheckoutUseCases::new(
            self.provider_handle(),
            self.customers.clone(),
            self.catalog.clone(),
            test_origin(),
        )
    }

    pub fn cancellation(&self) -> CancellationUseCases {
        CancellationUseCases::new(
            self.provider_handle(),
            self.subscriptions.clone(),
            test_jwt_secret(),
        )
    }
}

impl Default for BillingMocks {
    fn default() -> Self {
        Self::new()
    }
}

fn test_origin() -> Url {
    Url::parse(TEST_ORIGIN).unwrap()
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// Events are dispatched inline so assertions can run right after the
/// webhook request returns.
///
/// ```ignore
/// let builder = TestAppStateBuilder::new();
/// let mocks = builder.mocks().clone();
/// let server = TestServer::new(create_app(builder.build())).unwrap();
/// ```
pub struct TestAppStateBuilder {
    mocks: BillingMocks,
    webhook_secret: Option<String>,
    with_provider: bool,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            mocks: BillingMocks::new(),
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
            with_provider: true,
        }
    }

    pub fn mocks(&self) -> &BillingMocks {
        &self.mocks
    }

    /// Simulates a deployment without `STRIPE_WEBHOOK_SECRET`.
    pub fn without_webhook_secret(mut self) -> Self {
        self.webhook_secret = None;
        self
    }

    /// Simulates a deployment without `STRIPE_SECRET_KEY`.
    pub fn without_provider(mut self) -> Self {
        self.with_provider = false;
        self
    }

    pub fn build(self) -> AppState {
        let mocks = self.mocks;
        let provider = if self.with_provider {
            mocks.provider_handle()
        } else {
            None
        };

        let event_queue = EventQueue::inline(Arc::new(mocks.dispatcher_with(provider.clone())));

        let checkout_use_cases = Arc::new(CheckoutUseCases::new(
            provider.clone(),
            mocks.customers.clone(),
            mocks.catalog.clone(),
            test_origin(),
        ));

        let cancellation_use_cases = Arc::new(CancellationUseCases::new(
            provider,
            mocks.subscriptions.clone(),
            test_jwt_secret(),
        ));

        let config = Arc::new(AppConfig {
            database_url: String::new(),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            app_origin: test_origin(),
            cors_origin: HeaderValue::from_static(TEST_ORIGIN),
            stripe_secret_key: self
                .with_provider
                .then(|| SecretString::new("sk_test_unused".into())),
            stripe_webhook_secret: self.webhook_secret.map(|s| SecretString::new(s.into())),
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            checkout_settle_delay: std::time::Duration::ZERO,
            webhook_worker_concurrency: 1,
            webhook_queue_capacity: 1,
            plan_catalog: String::new(),
        });

        AppState {
            config,
            event_queue: Arc::new(event_queue),
            checkout_use_cases,
            cancellation_use_cases,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
