//! Redis MessageQueue implementation.

use super::error::QueueError;
use super::pool::RedisPool;
use crate::ports::{BatchOutcome, MessageQueue, QueueMessage};
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

/// A Redis list fed with LPUSH; consumers RPOP in arrival order.
#[derive(Clone)]
pub struct RedisQueue {
    pub(super) pool: RedisPool,
    pub(super) key: String,
}

#[async_trait]
impl MessageQueue for RedisQueue {
    async fn send_batch(&self, messages: &[QueueMessage]) -> anyhow::Result<BatchOutcome> {
        if messages.is_empty() {
            return Ok(BatchOutcome::default());
        }
        let mut conn = self.pool.pool.get().await.map_err(QueueError::from)?;

        // A single multi-value LPUSH, so the batch lands whole or not at all.
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        conn.lpush::<_, _, ()>(&self.key, bodies)
            .await
            .map_err(QueueError::from)?;

        Ok(BatchOutcome {
            sent: messages.iter().map(|m| m.id.clone()).collect(),
            failed: Vec::new(),
        })
    }
}
