use crate::domain::OutboundMessage;
use crate::ports::{MessageQueue, QueueMessage, MAX_BATCH_SIZE};
use std::collections::HashSet;

/// Final delivery result per video id, in publishing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

/// Sends outbound messages in queue-sized batches.
///
/// A failing batch does not stop the ones after it, and nothing already
/// sent is taken back.
pub struct Publisher<'a, Q> {
    queue: &'a Q,
}

impl<'a, Q> Publisher<'a, Q>
where
    Q: MessageQueue,
{
    pub fn new(queue: &'a Q) -> Self {
        Self { queue }
    }

    #[tracing::instrument(skip_all, fields(messages = messages.len()))]
    pub async fn publish(&self, messages: &[OutboundMessage]) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();

        for chunk in messages.chunks(MAX_BATCH_SIZE) {
            let mut batch = Vec::with_capacity(chunk.len());
            for message in chunk {
                match QueueMessage::try_from(message) {
                    Ok(queued) => batch.push(queued),
                    Err(e) => {
                        tracing::error!(
                            error = ?e,
                            video_id = %message.video_id,
                            "could not encode message"
                        );
                        outcome.failed.push(message.video_id.clone());
                    }
                }
            }
            if batch.is_empty() {
                continue;
            }

            match self.queue.send_batch(&batch).await {
                Ok(result) => {
                    // Anything the queue did not confirm counts as failed.
                    let confirmed: HashSet<String> = result.sent.into_iter().collect();
                    for queued in batch {
                        if confirmed.contains(&queued.id) {
                            outcome.sent.push(queued.id);
                        } else {
                            outcome.failed.push(queued.id);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, batch_size = batch.len(), "batch send failed");
                    outcome.failed.extend(batch.into_iter().map(|queued| queued.id));
                }
            }
        }

        tracing::debug!(
            sent = outcome.sent.len(),
            failed = outcome.failed.len(),
            "publish finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::build_messages;
    use crate::domain::WatchEntry;
    use crate::ports::queue::MockMessageQueue;
    use crate::ports::BatchOutcome;
    use chrono::{TimeZone, Utc};

    fn messages(count: usize) -> Vec<OutboundMessage> {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entries = (0..count)
            .map(|i| WatchEntry::new(format!("video{i:06}"), at))
            .collect();
        build_messages("exports/u1", entries)
    }

    fn ids(messages: &[QueueMessage]) -> Vec<String> {
        messages.iter().map(|m| m.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_one_permanent_failure_among_five() {
        let mut queue = MockMessageQueue::new();
        queue.expect_send_batch().times(1).returning(|batch| {
            let (failed, sent): (Vec<_>, Vec<_>) =
                ids(batch).into_iter().partition(|id| id == "video000002");
            Ok(BatchOutcome { sent, failed })
        });
        let messages = messages(5);

        let outcome = Publisher::new(&queue).publish(&messages).await;

        assert_eq!(outcome.sent.len(), 4);
        assert_eq!(outcome.failed, vec!["video000002".to_string()]);
    }

    #[tokio::test]
    async fn test_batches_of_ten() {
        let mut queue = MockMessageQueue::new();
        queue
            .expect_send_batch()
            .times(3)
            .withf(|batch| batch.len() <= MAX_BATCH_SIZE)
            .returning(|batch| {
                Ok(BatchOutcome {
                    sent: ids(batch),
                    failed: Vec::new(),
                })
            });
        let messages = messages(25);

        let outcome = Publisher::new(&queue).publish(&messages).await;

        assert_eq!(outcome.sent.len(), 25);
        assert!(outcome.failed.is_empty());
        let expected: Vec<String> = messages.iter().map(|m| m.video_id.clone()).collect();
        assert_eq!(outcome.sent, expected);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_next() {
        let mut queue = MockMessageQueue::new();
        let mut calls = 0;
        queue.expect_send_batch().times(2).returning(move |batch| {
            calls += 1;
            if calls == 1 {
                Err(anyhow::anyhow!("connection reset"))
            } else {
                Ok(BatchOutcome {
                    sent: ids(batch),
                    failed: Vec::new(),
                })
            }
        });
        let messages = messages(12);

        let outcome = Publisher::new(&queue).publish(&messages).await;

        assert_eq!(outcome.failed.len(), 10);
        assert_eq!(outcome.sent, vec!["video000010", "video000011"]);
    }

    #[tokio::test]
    async fn test_unconfirmed_ids_count_as_failed() {
        let mut queue = MockMessageQueue::new();
        queue
            .expect_send_batch()
            .returning(|_| Ok(BatchOutcome::default()));
        let messages = messages(2);

        let outcome = Publisher::new(&queue).publish(&messages).await;

        assert!(outcome.sent.is_empty());
        assert_eq!(outcome.failed.len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_to_publish() {
        let mut queue = MockMessageQueue::new();
        queue.expect_send_batch().never();

        let outcome = Publisher::new(&queue).publish(&[]).await;

        assert_eq!(outcome, PublishOutcome::default());
    }
}
