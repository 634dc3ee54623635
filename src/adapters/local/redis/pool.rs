//! Redis connection pool.

use super::error::QueueError;
use super::queue::RedisQueue;
use deadpool_redis::{Config, Pool, Runtime};

/// Shared connection pool; hands out queues bound to a list key.
#[derive(Clone)]
pub struct RedisPool {
    pub(super) pool: Pool,
}

impl RedisPool {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    pub fn queue(&self, key: impl Into<String>) -> RedisQueue {
        RedisQueue {
            pool: self.clone(),
            key: key.into(),
        }
    }
}
