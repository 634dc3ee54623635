use crate::domain::FileStatus;
use crate::ports::FileStatusRepository;
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;

/// DynamoStatusRepository implements FileStatusRepository for AWS DynamoDB.
#[derive(Clone)]
pub struct DynamoStatusRepository {
    client: Client,
    table_name: String,
}

impl DynamoStatusRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl FileStatusRepository for DynamoStatusRepository {
    async fn record(&self, status: &FileStatus) -> anyhow::Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(status_item(status)))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(DisplayErrorContext(e).to_string()))
            .with_context(|| format!("could not record status of {}", status.file_id))?;
        Ok(())
    }
}

fn status_item(status: &FileStatus) -> HashMap<String, AttributeValue> {
    let n = |value: usize| AttributeValue::N(value.to_string());
    let mut item = HashMap::from([
        ("file_id".to_string(), AttributeValue::S(status.file_id.clone())),
        (
            "source_bucket".to_string(),
            AttributeValue::S(status.source_bucket.clone()),
        ),
        (
            "first_processed_at".to_string(),
            AttributeValue::S(status.first_processed_at.to_rfc3339()),
        ),
        ("unique_videos".to_string(), n(status.unique_videos)),
        ("known_before".to_string(), n(status.known_before)),
        ("known_after".to_string(), n(status.known_after)),
        ("added".to_string(), n(status.added)),
        ("duplicates".to_string(), n(status.duplicates)),
        ("messages_sent".to_string(), n(status.messages_sent)),
    ]);
    if let Some(at) = status.last_processed_at {
        item.insert(
            "last_processed_at".to_string(),
            AttributeValue::S(at.to_rfc3339()),
        );
    }
    item
}
