use crate::domain::{ExportRef, FileStatus, KnownIdentifierSet};
use crate::ports::{ExportStore, FileStatusRepository, KnownIdStore, StorageError};
use anyhow::Context;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Exports on disk, laid out as `<root>/<bucket>/<key>`.
#[derive(Clone)]
pub struct FsExportStore {
    root: PathBuf,
}

impl FsExportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_of(&self, location: &ExportRef) -> PathBuf {
        self.root.join(&location.bucket).join(&location.key)
    }
}

#[async_trait]
impl ExportStore for FsExportStore {
    async fn fetch(&self, location: &ExportRef, max_bytes: u64) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(location);
        let access = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(location.to_string()),
            _ => StorageError::Access {
                location: path.display().to_string(),
                reason: e.to_string(),
            },
        };

        let size = tokio::fs::metadata(&path).await.map_err(access)?.len();
        if size > max_bytes {
            return Err(StorageError::TooLarge {
                location: location.to_string(),
                size,
                limit: max_bytes,
            });
        }
        tokio::fs::read(&path).await.map_err(access)
    }
}

/// Known-id ledger kept as a JSON array in a single file.
#[derive(Clone)]
pub struct FsLedger {
    path: PathBuf,
}

impl FsLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl KnownIdStore for FsLedger {
    async fn load(&self) -> Result<KnownIdentifierSet, StorageError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %self.location(), "ledger not found, starting empty");
                return Ok(KnownIdentifierSet::new());
            }
            Err(e) => {
                return Err(StorageError::Access {
                    location: self.location(),
                    reason: e.to_string(),
                })
            }
        };
        serde_json::from_slice(&raw).map_err(|e| StorageError::Malformed {
            location: self.location(),
            reason: e.to_string(),
        })
    }

    async fn persist(&self, known: &KnownIdentifierSet) -> Result<(), StorageError> {
        let access = |e: std::io::Error| StorageError::Access {
            location: self.location(),
            reason: e.to_string(),
        };
        let body = serde_json::to_vec_pretty(known).map_err(|e| StorageError::Malformed {
            location: self.location(),
            reason: e.to_string(),
        })?;

        // Write beside the target, then rename over it.
        let staging = self.path.with_extension("json.tmp");
        ensure_parent(&self.path).await.map_err(access)?;
        tokio::fs::write(&staging, body).await.map_err(access)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(access)?;
        Ok(())
    }
}

/// Appends one JSON object per status record.
#[derive(Clone)]
pub struct FsStatusLog {
    path: PathBuf,
}

impl FsStatusLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FileStatusRepository for FsStatusLog {
    async fn record(&self, status: &FileStatus) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(status)?;
        line.push(b'\n');

        ensure_parent(&self.path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("could not open {}", self.path.display()))?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}
