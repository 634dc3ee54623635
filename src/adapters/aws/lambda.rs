use crate::application::pipeline::IngestService;
use crate::config::SourceBuckets;
use crate::ports::{ExportStore, FileStatusRepository, KnownIdStore, MessageQueue};
use crate::trigger::{Trigger, TriggerError};
use aws_lambda_events::event::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent};
use lambda_runtime::{Error, LambdaEvent};
use tracing::Instrument;

/// Lambda entry point: one invocation, one or more queued S3 notifications.
///
/// Failed messages are reported back individually, so the event source
/// mapping must have `ReportBatchItemFailures` enabled.
pub async fn handler<S, L, Q, R>(
    service: &IngestService<S, L, Q, R>,
    sources: &SourceBuckets,
    event: LambdaEvent<SqsEvent>,
) -> Result<SqsBatchResponse, Error>
where
    S: ExportStore,
    L: KnownIdStore,
    Q: MessageQueue,
    R: FileStatusRepository,
{
    let config = &event.context.env_config;
    let span = tracing::info_span!(
        "invocation",
        request_id = %event.context.request_id,
        function_name = %config.function_name,
        function_version = %config.version,
        memory_mb = config.memory,
        log_group = %config.log_group,
        log_stream = %config.log_stream,
    );

    process_event(service, sources, event.payload)
        .instrument(span)
        .await
}

/// Process every record and list the ones that failed.
///
/// Only failed messages go back to the queue. A failure on a record without a
/// message id cannot be reported that way and fails the whole invocation,
/// after every record was tried.
pub async fn process_event<S, L, Q, R>(
    service: &IngestService<S, L, Q, R>,
    sources: &SourceBuckets,
    event: SqsEvent,
) -> Result<SqsBatchResponse, Error>
where
    S: ExportStore,
    L: KnownIdStore,
    Q: MessageQueue,
    R: FileStatusRepository,
{
    let mut response = SqsBatchResponse::default();
    let mut unreported: Option<Error> = None;

    for record in event.records {
        let message_id = record.message_id;
        let trigger = record
            .body
            .ok_or(TriggerError::MissingBody)
            .and_then(Trigger::from_body);
        let result = match trigger {
            Ok(trigger) => service
                .run_trigger(&trigger, sources)
                .await
                .map_err(Error::from),
            Err(e) => {
                tracing::error!(error = ?e, message_id = ?message_id, "unusable trigger message");
                Err(Error::from(e))
            }
        };

        match (result, message_id) {
            (Ok(reports), message_id) => {
                let exports = reports.len();
                tracing::info!(message_id = ?message_id, exports, "message processed");
            }
            (Err(e), Some(message_id)) => {
                tracing::warn!(error = %e, message_id = %message_id, "message returned to queue");
                let mut failure = BatchItemFailure::default();
                failure.item_identifier = message_id;
                response.batch_item_failures.push(failure);
            }
            (Err(e), None) => {
                tracing::error!(error = %e, "failed message has no id");
                unreported.get_or_insert(e);
            }
        }
    }

    match unreported {
        Some(e) => Err(e),
        None => Ok(response),
    }
}
