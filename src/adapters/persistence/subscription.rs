use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{
        SubscriptionProfile, SubscriptionRepo, SubscriptionStatusUpdate, UpsertSubscriptionInput,
    },
    domain::entities::{plan::Plan, subscription_status::SubscriptionStatus},
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> SubscriptionProfile {
    SubscriptionProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        plan_name: row.get("plan_name"),
        billing_period: row.get("billing_period"),
        status: row.get("status"),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        cancel_at_period_end: row.get("cancel_at_period_end"),
        canceled_at: row.get("canceled_at"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, stripe_customer_id, stripe_subscription_id, plan_name,
    billing_period, status, current_period_start, current_period_end,
    cancel_at_period_end, canceled_at, amount, currency, created_at, updated_at
"#;

/// An existing row may be overwritten unless it is an active lifetime grant.
const NOT_LIFETIME_GRANT: &str =
    "NOT (subscriptions.billing_period = 'lifetime' AND subscriptions.status = 'active')";

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn upsert_for_user(
        &self,
        input: &UpsertSubscriptionInput,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, stripe_customer_id, stripe_subscription_id, plan_name,
                billing_period, status, current_period_start, current_period_end,
                cancel_at_period_end, canceled_at, amount, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                plan_name = EXCLUDED.plan_name,
                billing_period = EXCLUDED.billing_period,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                canceled_at = EXCLUDED.canceled_at,
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                updated_at = NOW()
            WHERE {} OR EXCLUDED.billing_period = 'lifetime'
            RETURNING {}
            "#,
            NOT_LIFETIME_GRANT, SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.stripe_customer_id)
        .bind(&input.stripe_subscription_id)
        .bind(&input.plan_name)
        .bind(input.billing_period)
        .bind(input.status)
        .bind(input.current_period_start)
        .bind(input.current_period_end)
        .bind(input.cancel_at_period_end)
        .bind(input.canceled_at)
        .bind(input.amount)
        .bind(&input.currency)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn upsert_not_started(
        &self,
        stripe_customer_id: &str,
        user_id: Option<Uuid>,
    ) -> AppResult<Option<SubscriptionProfile>> {
        // Sentinel rows without a user are keyed by the partial unique index on customer id
        let conflict = match user_id {
            Some(_) => format!(
                "ON CONFLICT (user_id) DO UPDATE SET \
                 stripe_customer_id = EXCLUDED.stripe_customer_id, \
                 status = EXCLUDED.status, updated_at = NOW() \
                 WHERE {}",
                NOT_LIFETIME_GRANT
            ),
            None => "ON CONFLICT (stripe_customer_id) WHERE user_id IS NULL DO UPDATE SET \
                     status = EXCLUDED.status, updated_at = NOW()"
                .to_string(),
        };

        let plan = Plan::unknown();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (
                id, user_id, stripe_customer_id, plan_name, billing_period, status
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            {}
            RETURNING {}
            "#,
            conflict, SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(stripe_customer_id)
        .bind(&plan.name)
        .bind(plan.billing_period)
        .bind(SubscriptionStatus::NotStarted)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn update_by_subscription_id(
        &self,
        stripe_subscription_id: &str,
        update: &SubscriptionStatusUpdate,
    ) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions SET
                status = $2,
                cancel_at_period_end = COALESCE($3, cancel_at_period_end),
                canceled_at = COALESCE($4, canceled_at),
                updated_at = NOW()
            WHERE stripe_subscription_id = $1 AND billing_period <> 'lifetime'
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(stripe_subscription_id)
        .bind(update.status)
        .bind(update.cancel_at_period_end)
        .bind(update.canceled_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }
}
