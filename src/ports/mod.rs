//! Ports - Trait definitions for the external collaborators of a run.

pub mod ledger;
pub mod queue;
pub mod repository;
pub mod storage;

pub use ledger::KnownIdStore;
pub use queue::{
    fifo_id, BatchOutcome, MessageQueue, QueueMessage, MAX_BATCH_SIZE, MAX_FIFO_ID_LEN,
};
pub use repository::FileStatusRepository;
pub use storage::{ExportStore, StorageError};
