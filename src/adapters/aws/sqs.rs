use crate::ports::{BatchOutcome, MessageQueue, QueueMessage};
use anyhow::Context;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::config::retry::RetryConfig;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{BatchResultErrorEntry, SendMessageBatchRequestEntry};
use aws_sdk_sqs::Client;
use std::collections::HashSet;
use std::future::Future;

/// SqsAdapter implements MessageQueue for AWS SQS.
///
/// Entries SQS rejects without blaming the sender are resubmitted until
/// `max_attempts` is reached.
#[derive(Clone)]
pub struct SqsAdapter {
    client: Client,
    queue_url: String,
    max_attempts: u32,
}

impl SqsAdapter {
    pub fn new(client: Client, queue_url: String, max_attempts: u32) -> Self {
        Self {
            client,
            queue_url,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Client config whose request retries stop after `max_attempts`.
    ///
    /// `sdk_config` itself is left alone, so other clients built from it keep
    /// the SDK default.
    pub fn config(sdk_config: &SdkConfig, max_attempts: u32) -> aws_sdk_sqs::Config {
        aws_sdk_sqs::config::Builder::from(sdk_config)
            .retry_config(RetryConfig::standard().with_max_attempts(max_attempts.max(1)))
            .build()
    }
}

#[async_trait]
impl MessageQueue for SqsAdapter {
    #[tracing::instrument(skip_all, fields(queue_url = %self.queue_url, messages = messages.len()))]
    async fn send_batch(&self, messages: &[QueueMessage]) -> anyhow::Result<BatchOutcome> {
        send_with_resubmission(messages, self.max_attempts, |entries| {
            let request = self
                .client
                .send_message_batch()
                .queue_url(&self.queue_url)
                .set_entries(Some(entries));
            async move {
                let resp = request
                    .send()
                    .await
                    .map_err(|e| anyhow::anyhow!(DisplayErrorContext(e).to_string()))?;
                Ok(AttemptResult {
                    successful: resp.successful().iter().map(|e| e.id().to_string()).collect(),
                    failed: resp.failed().to_vec(),
                })
            }
        })
        .await
    }
}

/// What one `send_message_batch` call reported.
struct AttemptResult {
    successful: Vec<String>,
    failed: Vec<BatchResultErrorEntry>,
}

async fn send_with_resubmission<F, Fut>(
    messages: &[QueueMessage],
    max_attempts: u32,
    mut send: F,
) -> anyhow::Result<BatchOutcome>
where
    F: FnMut(Vec<SendMessageBatchRequestEntry>) -> Fut,
    Fut: Future<Output = anyhow::Result<AttemptResult>>,
{
    let mut outcome = BatchOutcome::default();
    let mut pending: Vec<&QueueMessage> = messages.iter().collect();
    let mut attempt = 0;

    while !pending.is_empty() {
        attempt += 1;
        let entries = pending
            .iter()
            .map(|message| batch_entry(message))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let result = match send(entries).await {
            Ok(result) => result,
            Err(e) if attempt == 1 => return Err(e).context("send_message_batch failed"),
            Err(e) => {
                // Earlier attempts delivered some entries; only the rest failed.
                tracing::error!(error = ?e, attempt, "resubmission failed");
                outcome.failed.extend(pending.iter().map(|m| m.id.clone()));
                break;
            }
        };

        outcome.sent.extend(result.successful);

        let (retry, permanent) = split_failures(&result.failed);
        outcome.failed.extend(permanent);
        if retry.is_empty() {
            break;
        }
        if attempt >= max_attempts {
            tracing::warn!(attempt, failed = retry.len(), "giving up on entries");
            outcome.failed.extend(retry);
            break;
        }

        tracing::warn!(attempt, retrying = retry.len(), "resubmitting entries");
        let retry: HashSet<String> = retry.into_iter().collect();
        pending.retain(|message| retry.contains(&message.id));
    }

    Ok(outcome)
}

fn batch_entry(message: &QueueMessage) -> anyhow::Result<SendMessageBatchRequestEntry> {
    SendMessageBatchRequestEntry::builder()
        .id(&message.id)
        .message_body(&message.body)
        .set_message_group_id(message.group_id.clone())
        .set_message_deduplication_id(message.deduplication_id.clone())
        .build()
        .with_context(|| format!("invalid batch entry {}", message.id))
}

/// Split rejected entries into (worth retrying, permanent).
fn split_failures(failed: &[BatchResultErrorEntry]) -> (Vec<String>, Vec<String>) {
    let mut retry = Vec::new();
    let mut permanent = Vec::new();
    for entry in failed {
        tracing::debug!(
            id = entry.id(),
            code = entry.code(),
            message = entry.message().unwrap_or_default(),
            sender_fault = entry.sender_fault(),
            "entry rejected"
        );
        if entry.sender_fault() {
            permanent.push(entry.id().to_string());
        } else {
            retry.push(entry.id().to_string());
        }
    }
    (retry, permanent)
}
