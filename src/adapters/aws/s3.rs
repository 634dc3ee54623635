use crate::domain::{ExportRef, KnownIdentifierSet};
use crate::ports::{ExportStore, KnownIdStore, StorageError};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

/// S3ExportStore implements ExportStore for exports dropped in S3.
#[derive(Clone)]
pub struct S3ExportStore {
    client: Client,
}

impl S3ExportStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExportStore for S3ExportStore {
    async fn fetch(&self, location: &ExportRef, max_bytes: u64) -> Result<Vec<u8>, StorageError> {
        let resp = get_object(&self.client, &location.bucket, &location.key)
            .await?
            .ok_or_else(|| StorageError::NotFound(location.to_string()))?;

        let size = resp.content_length().unwrap_or_default().max(0) as u64;
        if size > max_bytes {
            return Err(StorageError::TooLarge {
                location: location.to_string(),
                size,
                limit: max_bytes,
            });
        }

        read_body(resp, &location.to_string()).await
    }
}

/// S3Ledger keeps the known-id set as one JSON array object.
#[derive(Clone)]
pub struct S3Ledger {
    client: Client,
    bucket: String,
    key: String,
}

impl S3Ledger {
    pub fn new(client: Client, bucket: String, key: String) -> Self {
        Self {
            client,
            bucket,
            key,
        }
    }

    fn location(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

#[async_trait]
impl KnownIdStore for S3Ledger {
    async fn load(&self) -> Result<KnownIdentifierSet, StorageError> {
        let Some(resp) = get_object(&self.client, &self.bucket, &self.key).await? else {
            tracing::warn!(location = %self.location(), "ledger not found, starting empty");
            return Ok(KnownIdentifierSet::new());
        };

        let body = read_body(resp, &self.location()).await?;
        serde_json::from_slice(&body).map_err(|e| StorageError::Malformed {
            location: self.location(),
            reason: e.to_string(),
        })
    }

    async fn persist(&self, known: &KnownIdentifierSet) -> Result<(), StorageError> {
        let body = serde_json::to_vec(known).map_err(|e| StorageError::Malformed {
            location: self.location(),
            reason: e.to_string(),
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::Access {
                location: self.location(),
                reason: DisplayErrorContext(e).to_string(),
            })?;

        tracing::debug!(ids = known.len(), "ledger written");
        Ok(())
    }
}

/// `None` when the key does not exist.
async fn get_object(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<Option<GetObjectOutput>, StorageError> {
    match client.get_object().bucket(bucket).key(key).send().await {
        Ok(resp) => Ok(Some(resp)),
        Err(e) if e.as_service_error().is_some_and(GetObjectError::is_no_such_key) => Ok(None),
        Err(e) => Err(StorageError::Access {
            location: format!("{bucket}/{key}"),
            reason: DisplayErrorContext(e).to_string(),
        }),
    }
}

async fn read_body(resp: GetObjectOutput, location: &str) -> Result<Vec<u8>, StorageError> {
    let body = resp.body.collect().await.map_err(|e| StorageError::Access {
        location: location.to_string(),
        reason: e.to_string(),
    })?;
    Ok(body.into_bytes().to_vec())
}
