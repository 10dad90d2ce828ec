use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{CreateOrderInput, OrderRepo},
};

#[async_trait]
impl OrderRepo for PostgresPersistence {
    async fn record(&self, input: &CreateOrderInput) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO billing_orders (
                id, user_id, stripe_customer_id, checkout_session_id,
                price_id, plan_name, amount, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (checkout_session_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.stripe_customer_id)
        .bind(&input.checkout_session_id)
        .bind(&input.price_id)
        .bind(&input.plan_name)
        .bind(input.amount)
        .bind(&input.currency)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() == 1)
    }
}
