use crate::domain::FileStatus;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStatusRepository: Send + Sync {
    /// Insert or replace the status record of a file
    async fn record(&self, status: &FileStatus) -> anyhow::Result<()>;
}
