use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info, warn};

use crate::app_error::AppError;
use crate::application::use_cases::webhook_dispatch::WebhookDispatchUseCases;
use crate::domain::entities::billing_event::BillingEvent;

/// Hands verified events to the dispatcher without holding up the webhook response.
#[derive(Clone)]
pub struct EventQueue {
    dispatcher: Arc<WebhookDispatchUseCases>,
    sender: Option<mpsc::Sender<BillingEvent>>,
}

impl EventQueue {
    /// Dispatches on the caller's task. Used by tests that assert on side effects.
    pub fn inline(dispatcher: Arc<WebhookDispatchUseCases>) -> Self {
        Self {
            dispatcher,
            sender: None,
        }
    }

    pub async fn enqueue(&self, event: BillingEvent) {
        let Some(sender) = &self.sender else {
            process_event(&self.dispatcher, event).await;
            return;
        };

        match sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(event_id = %event.id, "Event queue full, dispatching on a detached task");
                let uc = Arc::clone(&self.dispatcher);
                tokio::spawn(async move { process_event(&uc, event).await });
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                error!(event_id = %event.id, "Event worker stopped, dispatching on a detached task");
                let uc = Arc::clone(&self.dispatcher);
                tokio::spawn(async move { process_event(&uc, event).await });
            }
        }
    }
}

/// Starts the background worker and returns the queue feeding it.
pub fn spawn_event_worker(
    dispatcher: Arc<WebhookDispatchUseCases>,
    capacity: usize,
    concurrency: usize,
) -> EventQueue {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    tokio::spawn(run_event_worker(
        Arc::clone(&dispatcher),
        receiver,
        concurrency.max(1),
    ));

    EventQueue {
        dispatcher,
        sender: Some(sender),
    }
}

async fn run_event_worker(
    dispatcher: Arc<WebhookDispatchUseCases>,
    mut receiver: mpsc::Receiver<BillingEvent>,
    concurrency: usize,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));

    info!("Billing event worker started (max {} concurrent)", concurrency);

    while let Some(event) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let uc = Arc::clone(&dispatcher);

        tokio::spawn(async move {
            let _permit = permit;
            process_event(&uc, event).await;
        });
    }

    info!("Billing event worker stopped");
}

/// Failures are logged and dropped; the provider already got its acknowledgement.
async fn process_event(dispatcher: &WebhookDispatchUseCases, event: BillingEvent) {
    match dispatcher.dispatch(&event).await {
        Ok(outcome) => {
            info!(event_id = %event.id, event_type = %event.kind, outcome = ?outcome, "Billing event processed");
        }
        Err(e) if is_expected_failure(&e) => {
            warn!(event_id = %event.id, event_type = %event.kind, error = %e, "Billing event not applied");
        }
        Err(e) => {
            error!(event_id = %event.id, event_type = %event.kind, error = %e, "Billing event processing failed");
        }
    }
}

fn is_expected_failure(e: &AppError) -> bool {
    e.is_client_error() || matches!(e, AppError::NotConfigured(_))
}
