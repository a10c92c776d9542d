use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use crate::events::messages::QueueMessage;
use crate::events::queue::{Delivery, MessageQueue, QueueError};

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: i64,
    body: String,
    delivery_count: i32,
}

/// Queue backed by the `queue_messages` table
///
/// Concurrent workers claim rows with `FOR UPDATE SKIP LOCKED`, so a
/// visible message is handed to exactly one receiver per visibility window.
pub struct PostgresQueue {
    pool: PgPool,
}

impl PostgresQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        QueueError::Backend(err.to_string())
    }
}

#[async_trait]
impl MessageQueue for PostgresQueue {
    async fn publish(&self, message: &QueueMessage) -> Result<(), QueueError> {
        sqlx::query("INSERT INTO queue_messages (body) VALUES ($1)")
            .bind(message.to_json()?)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn receive(&self, max: usize, visibility: Duration) -> Result<Vec<Delivery>, QueueError> {
        let mut rows: Vec<DeliveryRow> = sqlx::query_as(
            r#"
            UPDATE queue_messages
            SET delivery_count = delivery_count + 1,
                visible_at = NOW() + make_interval(secs => $2)
            WHERE id IN (
                SELECT id
                FROM queue_messages
                WHERE visible_at <= NOW()
                ORDER BY id
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, body, delivery_count
            "#,
        )
        .bind(max as i64)
        .bind(visibility.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        rows.sort_by_key(|row| row.id);

        let deliveries = rows
            .into_iter()
            .map(|row| Delivery {
                receipt: format!("{}:{}", row.id, row.delivery_count),
                body: row.body,
                delivery_count: row.delivery_count.max(0) as u32,
            })
            .collect();

        Ok(deliveries)
    }

    async fn delete(&self, receipt: &str) -> Result<(), QueueError> {
        let (id, count) = super::parse_receipt(receipt)?;

        let result = sqlx::query("DELETE FROM queue_messages WHERE id = $1 AND delivery_count = $2")
            .bind(id as i64)
            .bind(count as i32)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::UnknownReceipt(receipt.to_string()));
        }
        Ok(())
    }
}
