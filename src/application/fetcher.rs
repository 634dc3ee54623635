use crate::config::PipelineSettings;
use crate::domain::ExportRef;
use crate::error::IngestError;
use crate::ports::ExportStore;

/// Reads an export within the configured size and time bounds.
pub struct Fetcher<'a, S> {
    store: &'a S,
    settings: &'a PipelineSettings,
}

impl<'a, S> Fetcher<'a, S>
where
    S: ExportStore,
{
    pub fn new(store: &'a S, settings: &'a PipelineSettings) -> Self {
        Self { store, settings }
    }

    #[tracing::instrument(skip(self), fields(location = %location))]
    pub async fn fetch(&self, location: &ExportRef) -> Result<Vec<u8>, IngestError> {
        let limit = self.settings.max_export_bytes;
        let read = self.store.fetch(location, limit);

        let raw = tokio::time::timeout(self.settings.fetch_timeout, read)
            .await
            .map_err(|_| IngestError::Timeout {
                location: location.clone(),
                timeout: self.settings.fetch_timeout,
            })?
            .map_err(|e| IngestError::from_fetch(location, e))?;

        // Stores that cannot report a size up front still get checked here.
        let size = raw.len() as u64;
        if size > limit {
            return Err(IngestError::TooLarge {
                location: location.clone(),
                size,
                limit,
            });
        }

        tracing::debug!(bytes = size, "fetched export");
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::storage::MockExportStore;
    use crate::ports::StorageError;
    use async_trait::async_trait;
    use std::time::Duration;

    fn settings(max_export_bytes: u64) -> PipelineSettings {
        PipelineSettings {
            max_export_bytes,
            fetch_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut store = MockExportStore::new();
        store
            .expect_fetch()
            .withf(|location, limit| location.key == "a.json" && *limit == 100)
            .returning(|_, _| Ok(b"[]".to_vec()));
        let settings = settings(100);

        let raw = Fetcher::new(&store, &settings)
            .fetch(&ExportRef::new("b", "a.json"))
            .await
            .unwrap();

        assert_eq!(raw, b"[]");
    }

    #[tokio::test]
    async fn test_fetch_maps_not_found() {
        let mut store = MockExportStore::new();
        store
            .expect_fetch()
            .returning(|location, _| Err(StorageError::NotFound(location.to_string())));
        let settings = settings(100);

        let err = Fetcher::new(&store, &settings)
            .fetch(&ExportRef::new("b", "missing.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_enforces_limit_on_body() {
        let mut store = MockExportStore::new();
        store
            .expect_fetch()
            .returning(|_, _| Ok(vec![b' '; 64]));
        let settings = settings(10);

        let err = Fetcher::new(&store, &settings)
            .fetch(&ExportRef::new("b", "big.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::TooLarge { size: 64, limit: 10, .. }));
    }

    struct StalledStore;

    #[async_trait]
    impl ExportStore for StalledStore {
        async fn fetch(&self, _: &ExportRef, _: u64) -> Result<Vec<u8>, StorageError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let settings = PipelineSettings {
            max_export_bytes: 100,
            fetch_timeout: Duration::from_millis(20),
        };

        let err = Fetcher::new(&StalledStore, &settings)
            .fetch(&ExportRef::new("b", "slow.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Timeout { .. }));
    }
}
