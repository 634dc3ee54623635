//! Redis adapter for local deployment.
//!
//! Outbound and notification queues are plain Redis lists.

mod error;
mod pool;
mod queue;

pub use error::QueueError;
pub use pool::RedisPool;
pub use queue::RedisQueue;
