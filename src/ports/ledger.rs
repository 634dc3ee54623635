use super::storage::StorageError;
use crate::domain::KnownIdentifierSet;
use async_trait::async_trait;

/// Durable record of every video id already sent downstream.
///
/// Updates are whole-set writes with no locking, so two concurrent runs can
/// both publish the same id. Consumers of the outbound queue must tolerate
/// duplicates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnownIdStore: Send + Sync {
    /// Load the current set. A ledger that does not exist yet is empty.
    async fn load(&self) -> Result<KnownIdentifierSet, StorageError>;

    async fn persist(&self, known: &KnownIdentifierSet) -> Result<(), StorageError>;
}
