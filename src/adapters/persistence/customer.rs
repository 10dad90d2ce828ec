use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::CustomerRepo,
};

#[async_trait]
impl CustomerRepo for PostgresPersistence {
    async fn get_customer_id(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let row = sqlx::query("SELECT stripe_customer_id FROM billing_customers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(|r| r.get("stripe_customer_id")))
    }

    async fn get_user_id(&self, stripe_customer_id: &str) -> AppResult<Option<Uuid>> {
        let row = sqlx::query("SELECT user_id FROM billing_customers WHERE stripe_customer_id = $1")
            .bind(stripe_customer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(|r| r.get("user_id")))
    }

    async fn upsert(&self, user_id: Uuid, stripe_customer_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO billing_customers (user_id, stripe_customer_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(stripe_customer_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
