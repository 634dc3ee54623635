//! Errors surfaced by a pipeline run.

use crate::domain::{ExportRef, ParseError};
use crate::ports::StorageError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("export {0} not found")]
    NotFound(ExportRef),
    #[error("cannot read export {location}: {reason}")]
    Access { location: ExportRef, reason: String },
    #[error("export {location} is {size} bytes, limit is {limit}")]
    TooLarge {
        location: ExportRef,
        size: u64,
        limit: u64,
    },
    #[error("fetching export {location} timed out after {timeout:?}")]
    Timeout {
        location: ExportRef,
        timeout: Duration,
    },
    #[error("no export format configured for bucket {0}")]
    UnknownSource(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("known-id ledger unavailable")]
    Ledger(#[source] StorageError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("failed to record file status")]
    Status(#[source] anyhow::Error),
}

impl IngestError {
    pub(crate) fn from_fetch(location: &ExportRef, err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => IngestError::NotFound(location.clone()),
            StorageError::TooLarge { size, limit, .. } => IngestError::TooLarge {
                location: location.clone(),
                size,
                limit,
            },
            StorageError::Access { reason, .. } | StorageError::Malformed { reason, .. } => {
                IngestError::Access {
                    location: location.clone(),
                    reason,
                }
            }
        }
    }
}

/// Messages still undelivered after the queue client gave up.
///
/// Messages that did go out stay sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "{} of {} messages failed to publish: {}",
    .failed.len(),
    .attempted,
    .failed.join(", ")
)]
pub struct PublishError {
    pub attempted: usize,
    pub failed: Vec<String>,
}
