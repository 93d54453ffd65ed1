//! PostgreSQL order history
//!
//! Reads the marketplace's `orders` and `customers` tables. The engine never
//! writes to them.

use super::{phone_key, OrderHistoryProvider};
use crate::error::ProviderResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Order history backed by PostgreSQL
#[derive(Clone)]
pub struct PgOrderHistory {
    pool: PgPool,
}

impl PgOrderHistory {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        PgOrderHistory { pool }
    }

    /// Open a pool against `url`
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> crate::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| crate::Error::ProviderSetup(format!("postgres connect: {}", e)))?;

        info!("Connected order history pool ({} connections)", max_connections);
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl OrderHistoryProvider for PgOrderHistory {
    async fn count_recent_orders(
        &self,
        customer_id: &str,
        since: DateTime<Utc>,
    ) -> ProviderResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders
             WHERE customer_id = $1
             AND created_at >= $2",
        )
        .bind(customer_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u32)
    }

    async fn average_order_value(&self, customer_id: &str) -> ProviderResult<Option<Decimal>> {
        let average: Option<Decimal> = sqlx::query_scalar(
            "SELECT AVG(total_amount) FROM orders
             WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(average)
    }

    async fn account_created_at(&self, customer_id: &str) -> ProviderResult<Option<DateTime<Utc>>> {
        let created_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT created_at FROM customers
             WHERE id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(created_at)
    }

    async fn cancelled_order_count_by_phone(&self, phone: &str) -> ProviderResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders
             WHERE regexp_replace(customer_phone, '[^0-9+]', '', 'g') = $1
             AND status = 'cancelled'",
        )
        .bind(phone_key(phone))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u32)
    }
}
