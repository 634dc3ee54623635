//! In-process adapters.
//!
//! Used by tests and by `local_ingest --dry-run`. Clones share state, so a
//! handle kept outside the service can inspect what a run did.

use crate::domain::{ExportRef, FileStatus, KnownIdentifierSet};
use crate::ports::{
    BatchOutcome, ExportStore, FileStatusRepository, KnownIdStore, MessageQueue, QueueMessage,
    StorageError,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MemoryExportStore {
    objects: Arc<Mutex<HashMap<ExportRef, Vec<u8>>>>,
}

impl MemoryExportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, location: ExportRef, body: impl Into<Vec<u8>>) {
        self.objects.lock().await.insert(location, body.into());
    }
}

#[async_trait]
impl ExportStore for MemoryExportStore {
    async fn fetch(&self, location: &ExportRef, max_bytes: u64) -> Result<Vec<u8>, StorageError> {
        let objects = self.objects.lock().await;
        let body = objects
            .get(location)
            .ok_or_else(|| StorageError::NotFound(location.to_string()))?;
        if body.len() as u64 > max_bytes {
            return Err(StorageError::TooLarge {
                location: location.to_string(),
                size: body.len() as u64,
                limit: max_bytes,
            });
        }
        Ok(body.clone())
    }
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    known: Arc<Mutex<KnownIdentifierSet>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryLedger {
    pub fn new(known: KnownIdentifierSet) -> Self {
        Self {
            known: Arc::new(Mutex::new(known)),
            writes: Arc::default(),
        }
    }

    pub async fn snapshot(&self) -> KnownIdentifierSet {
        self.known.lock().await.clone()
    }

    /// Number of `persist` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnownIdStore for MemoryLedger {
    async fn load(&self) -> Result<KnownIdentifierSet, StorageError> {
        Ok(self.snapshot().await)
    }

    async fn persist(&self, known: &KnownIdentifierSet) -> Result<(), StorageError> {
        *self.known.lock().await = known.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Queue that keeps delivered messages and permanently rejects chosen ids.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    delivered: Arc<Mutex<Vec<QueueMessage>>>,
    rejected: Arc<HashSet<String>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            delivered: Arc::default(),
            rejected: Arc::new(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub async fn delivered(&self) -> Vec<QueueMessage> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn send_batch(&self, messages: &[QueueMessage]) -> anyhow::Result<BatchOutcome> {
        let mut delivered = self.delivered.lock().await;
        let mut outcome = BatchOutcome::default();
        for message in messages {
            if self.rejected.contains(&message.id) {
                outcome.failed.push(message.id.clone());
            } else {
                delivered.push(message.clone());
                outcome.sent.push(message.id.clone());
            }
        }
        Ok(outcome)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStatusRepository {
    records: Arc<Mutex<Vec<FileStatus>>>,
}

impl MemoryStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<FileStatus> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl FileStatusRepository for MemoryStatusRepository {
    async fn record(&self, status: &FileStatus) -> anyhow::Result<()> {
        let mut records = self.records.lock().await;
        records.retain(|existing| existing.file_id != status.file_id);
        records.push(status.clone());
        Ok(())
    }
}
