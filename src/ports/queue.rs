use crate::domain::OutboundMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Largest batch a single `send_batch` call accepts (the SQS limit).
pub const MAX_BATCH_SIZE: usize = 10;

/// Longest group or deduplication id a FIFO queue accepts.
pub const MAX_FIFO_ID_LEN: usize = 128;

/// Make `raw` usable as a FIFO group or deduplication id.
///
/// Anything outside printable ASCII becomes `_` and the result is cut to
/// `max_len` characters.
pub fn fifo_id(raw: &str, max_len: usize) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_graphic() { c } else { '_' })
        .take(max_len)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Unique within a batch; reported back in `BatchOutcome`.
    pub id: String,
    pub body: String,
    /// Required by FIFO queues, ignored elsewhere.
    pub group_id: Option<String>,
    pub deduplication_id: Option<String>,
}

impl QueueMessage {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            group_id: None,
            deduplication_id: None,
        }
    }

    pub fn with_group(
        mut self,
        group_id: impl Into<String>,
        deduplication_id: impl Into<String>,
    ) -> Self {
        self.group_id = Some(group_id.into());
        self.deduplication_id = Some(deduplication_id.into());
        self
    }
}

impl TryFrom<&OutboundMessage> for QueueMessage {
    type Error = serde_json::Error;

    fn try_from(message: &OutboundMessage) -> Result<Self, Self::Error> {
        Ok(QueueMessage::new(message.video_id.clone(), message.body()?))
    }
}

/// Ids of one batch split by final delivery result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Send up to `MAX_BATCH_SIZE` messages.
    ///
    /// Per-message failures come back in the outcome once the adapter's own
    /// retries are exhausted. An error means no message of the batch is known
    /// to have been delivered.
    async fn send_batch(&self, messages: &[QueueMessage]) -> anyhow::Result<BatchOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_id_replaces_spaces_and_non_ascii() {
        assert_eq!(fifo_id("user 42/watch\tlog é.json", 128), "user_42/watch_log__.json");
    }

    #[test]
    fn test_fifo_id_keeps_punctuation() {
        assert_eq!(fifo_id("exports/u1-(2024)!", 128), "exports/u1-(2024)!");
    }

    #[test]
    fn test_fifo_id_truncates() {
        let long = "a".repeat(300);

        assert_eq!(fifo_id(&long, MAX_FIFO_ID_LEN).len(), MAX_FIFO_ID_LEN);
        assert_eq!(fifo_id("abcdef", 3), "abc");
    }
}
