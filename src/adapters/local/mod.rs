//! Local adapters: exports and ledger on disk, queues in Redis.

pub mod fs;
pub mod redis;

pub use fs::{FsExportStore, FsLedger, FsStatusLog};
pub use redis::{RedisPool, RedisQueue};
