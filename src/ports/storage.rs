use crate::domain::ExportRef;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object {0} not found")]
    NotFound(String),
    #[error("access to {location} failed: {reason}")]
    Access { location: String, reason: String },
    #[error("object {location} is {size} bytes, limit is {limit}")]
    TooLarge {
        location: String,
        size: u64,
        limit: u64,
    },
    #[error("object {location} holds malformed data: {reason}")]
    Malformed { location: String, reason: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExportStore: Send + Sync {
    /// Read a whole export, refusing objects larger than `max_bytes`.
    async fn fetch(&self, location: &ExportRef, max_bytes: u64) -> Result<Vec<u8>, StorageError>;
}
