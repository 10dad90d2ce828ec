use crate::{
    adapters::http::app_state::AppState,
    application::{
        plan_catalog::PlanCatalog,
        ports::payment_provider::{BillingProviderPort, OptionalProvider},
        use_cases::{
            cancellation::CancellationUseCases,
            checkout::CheckoutUseCases,
            reconciliation::ReconciliationUseCases,
            subscription::{CustomerRepo, OrderRepo, SubscriptionRepo},
            webhook_dispatch::WebhookDispatchUseCases,
        },
    },
    infra::{
        config::AppConfig, event_worker::spawn_event_worker, postgres_persistence,
        stripe_payment_adapter::StripePaymentAdapter,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Builds every collaborator once and starts the billing event worker.
/// Must run inside the tokio runtime.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;
    let customer_repo = postgres_arc.clone() as Arc<dyn CustomerRepo>;
    let order_repo = postgres_arc.clone() as Arc<dyn OrderRepo>;

    let catalog = Arc::new(PlanCatalog::with_overrides(&config.plan_catalog));
    tracing::info!(entries = catalog.len(), "Plan catalog loaded");

    let provider: OptionalProvider = config.stripe_secret_key.clone().map(|key| {
        Arc::new(StripePaymentAdapter::new(key)) as Arc<dyn BillingProviderPort>
    });

    let reconciliation = ReconciliationUseCases::new(
        provider.clone(),
        subscription_repo.clone(),
        customer_repo.clone(),
        catalog.clone(),
    );

    let dispatcher = Arc::new(WebhookDispatchUseCases::new(
        reconciliation,
        provider.clone(),
        subscription_repo.clone(),
        customer_repo.clone(),
        order_repo,
        catalog.clone(),
        config.checkout_settle_delay,
    ));

    let event_queue = spawn_event_worker(
        dispatcher,
        config.webhook_queue_capacity,
        config.webhook_worker_concurrency,
    );

    let checkout_use_cases = CheckoutUseCases::new(
        provider.clone(),
        customer_repo,
        catalog,
        config.app_origin.clone(),
    );

    let cancellation_use_cases =
        CancellationUseCases::new(provider, subscription_repo, config.jwt_secret.clone());

    Ok(AppState {
        config: Arc::new(config),
        event_queue: Arc::new(event_queue),
        checkout_use_cases: Arc::new(checkout_use_cases),
        cancellation_use_cases: Arc::new(cancellation_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "craft_billing=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don't show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
