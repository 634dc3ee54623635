use super::fetcher::Fetcher;
use super::publisher::Publisher;
use crate::config::{PipelineSettings, SourceBuckets};
use crate::domain::message::build_messages;
use crate::domain::{Deduplicator, ExportFormat, ExportRef, FileStatus, InvocationReport, Stage};
use crate::error::{IngestError, PublishError};
use crate::ports::{
    fifo_id, ExportStore, FileStatusRepository, KnownIdStore, MessageQueue, QueueMessage,
    MAX_FIFO_ID_LEN,
};
use crate::trigger::Trigger;
use chrono::{DateTime, Utc};

/// One export to process.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub location: ExportRef,
    pub format: ExportFormat,
    /// Raw trigger body, forwarded to the notification queue when set.
    pub notification: Option<String>,
}

/// Fetch → dedup → publish for one export at a time.
///
/// Runs are strictly sequential and share nothing but the ledger. Two
/// services running at once may publish the same id twice.
pub struct IngestService<S, L, Q, R> {
    storage: S,
    ledger: L,
    queue: Q,
    repo: R,
    notify: Option<Q>,
    settings: PipelineSettings,
}

impl<S, L, Q, R> IngestService<S, L, Q, R>
where
    S: ExportStore,
    L: KnownIdStore,
    Q: MessageQueue,
    R: FileStatusRepository,
{
    pub fn new(storage: S, ledger: L, queue: Q, repo: R, settings: PipelineSettings) -> Self {
        Self {
            storage,
            ledger,
            queue,
            repo,
            notify: None,
            settings,
        }
    }

    /// Forward trigger bodies to `queue` after each run.
    pub fn with_notifications(mut self, queue: Q) -> Self {
        self.notify = Some(queue);
        self
    }

    /// Process every export a trigger references, one after another.
    ///
    /// All exports are attempted; the first failure is returned once they
    /// have been.
    pub async fn run_trigger(
        &self,
        trigger: &Trigger,
        sources: &SourceBuckets,
    ) -> Result<Vec<InvocationReport>, IngestError> {
        if trigger.exports.is_empty() {
            tracing::info!("trigger references no exports, skipping");
            return Ok(Vec::new());
        }

        let mut reports = Vec::with_capacity(trigger.exports.len());
        let mut first_error = None;
        for location in &trigger.exports {
            let result = match sources.format_for(&location.bucket) {
                Some(format) => {
                    let request = IngestRequest {
                        location: location.clone(),
                        format,
                        notification: Some(trigger.body.clone()),
                    };
                    self.run(&request).await
                }
                None => {
                    tracing::error!(bucket = %location.bucket, "unknown export bucket");
                    Err(IngestError::UnknownSource(location.bucket.clone()))
                }
            };
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(
            bucket = %request.location.bucket,
            key = %request.location.key,
            file_id = %request.location.file_id(),
            format = %request.format,
        )
    )]
    pub async fn run(&self, request: &IngestRequest) -> Result<InvocationReport, IngestError> {
        let started_at = Utc::now();
        let mut report = InvocationReport {
            file_id: request.location.file_id().to_string(),
            source_bucket: request.location.bucket.clone(),
            ..Default::default()
        };
        let mut stage = Stage::Start;

        match self
            .run_stages(request, started_at, &mut report, &mut stage)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    stage = %Stage::Done,
                    total = report.total,
                    duplicates = report.duplicates(),
                    sent = report.sent,
                    failed = report.failed,
                    known_before = report.known_before,
                    known_after = report.known_after,
                    "run complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    stage = %Stage::Failed,
                    last_stage = %stage,
                    total = report.total,
                    duplicates = report.duplicates(),
                    sent = report.sent,
                    failed = report.failed,
                    error = ?e,
                    "run failed"
                );
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        request: &IngestRequest,
        started_at: DateTime<Utc>,
        report: &mut InvocationReport,
        stage: &mut Stage,
    ) -> Result<(), IngestError> {
        // 1. Fetch
        let raw = Fetcher::new(&self.storage, &self.settings)
            .fetch(&request.location)
            .await?;
        *stage = Stage::Fetched;

        // 2. Dedup against the ledger snapshot taken now
        let mut known = self.ledger.load().await.map_err(IngestError::Ledger)?;
        report.known_before = known.len();
        report.known_after = known.len();

        let deduped = Deduplicator::new(request.format).run(&raw, &known)?;
        drop(raw);
        report.total = deduped.total;
        report.skipped_rows = deduped.skipped_rows;
        report.duplicates_known = deduped.duplicates_known;
        report.duplicates_in_batch = deduped.duplicates_in_batch;
        report.new_entries = deduped.entries.len();
        *stage = Stage::Deduped;
        tracing::info!(
            total = report.total,
            skipped_rows = report.skipped_rows,
            duplicates = report.duplicates(),
            new_entries = report.new_entries,
            "deduplicated export"
        );

        // 3. Publish
        let messages = build_messages(&report.file_id, deduped.entries);
        let outcome = Publisher::new(&self.queue).publish(&messages).await;
        report.sent = outcome.sent.len();
        report.failed = outcome.failed.len();
        *stage = Stage::Published;

        // 4. Record what went out; failed ids stay unknown so a retry resends them
        if !outcome.sent.is_empty() {
            known.extend(outcome.sent.iter().cloned());
            self.ledger
                .persist(&known)
                .await
                .map_err(IngestError::Ledger)?;
        }
        report.known_after = known.len();

        let status = FileStatus::from_report(report, started_at, Utc::now());
        self.repo
            .record(&status)
            .await
            .map_err(IngestError::Status)?;

        if let Some(body) = &request.notification {
            self.forward(&report.file_id, body).await;
        }

        if !outcome.failed.is_empty() {
            return Err(PublishError {
                attempted: messages.len(),
                failed: outcome.failed,
            }
            .into());
        }
        *stage = Stage::Done;
        Ok(())
    }

    async fn forward(&self, file_id: &str, body: &str) {
        let Some(queue) = &self.notify else {
            return;
        };
        // File ids come from object keys and may hold characters FIFO ids reject.
        let millis = Utc::now().timestamp_millis().to_string();
        let group_id = fifo_id(file_id, MAX_FIFO_ID_LEN);
        let prefix = fifo_id(file_id, MAX_FIFO_ID_LEN - millis.len() - 1);
        let message = QueueMessage::new("notification", body)
            .with_group(group_id, format!("{prefix}_{millis}"));

        match queue.send_batch(std::slice::from_ref(&message)).await {
            Ok(outcome) if outcome.failed.is_empty() => {
                tracing::info!(file_id, "forwarded trigger to notification queue");
            }
            Ok(_) => tracing::error!(file_id, "notification queue rejected the trigger"),
            Err(e) => tracing::error!(error = ?e, file_id, "failed to forward trigger"),
        }
    }
}
