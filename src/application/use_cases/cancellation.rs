use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        jwt,
        ports::payment_provider::{OptionalProvider, SubscriptionId, require_provider},
        use_cases::subscription::{SubscriptionRepo, SubscriptionStatusUpdate},
    },
    domain::entities::subscription_status::SubscriptionStatus,
};

#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// When access ends. The provider's period end, else the locally stored one.
    pub cancel_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CancellationUseCases {
    provider: OptionalProvider,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    jwt_secret: SecretString,
}

impl CancellationUseCases {
    pub fn new(
        provider: OptionalProvider,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        jwt_secret: SecretString,
    ) -> Self {
        Self {
            provider,
            subscription_repo,
            jwt_secret,
        }
    }

    /// Schedules the caller's active subscription to end with the paid period.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn cancel_for_user(&self, bearer_token: &str) -> AppResult<CancelResponse> {
        let user_id = jwt::verify(bearer_token, &self.jwt_secret)?.user_id()?;
        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        let subscription = self
            .subscription_repo
            .get_by_user(user_id)
            .await?
            .filter(|s| s.status == SubscriptionStatus::Active)
            .ok_or(AppError::NotFound)?;

        if subscription.billing_period.is_lifetime() {
            return Err(AppError::InvalidInput(
                "Lifetime plans cannot be canceled".into(),
            ));
        }
        let Some(subscription_id) = subscription.stripe_subscription_id.clone() else {
            return Err(AppError::InvalidInput(
                "Subscription has no provider subscription".into(),
            ));
        };

        let provider = require_provider(&self.provider)?;
        let remote = provider
            .cancel_subscription(&SubscriptionId::new(subscription_id.clone()), true)
            .await?;

        self.subscription_repo
            .update_by_subscription_id(
                &subscription_id,
                &SubscriptionStatusUpdate {
                    status: SubscriptionStatus::Canceling,
                    cancel_at_period_end: Some(true),
                    canceled_at: None,
                },
            )
            .await?;

        let cancel_at = remote
            .current_period_end
            .or(subscription.current_period_end);

        tracing::info!(
            user_id = %user_id,
            subscription_id = %subscription_id,
            cancel_at = ?cancel_at,
            "Subscription set to cancel at period end"
        );

        Ok(CancelResponse { cancel_at })
    }
}
