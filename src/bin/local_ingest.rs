//! Local Ingest Binary
//!
//! Runs the pipeline once against an export on disk, for development and
//! manual backfills. Exports are read from `<EXPORT_ROOT>/<bucket>/<key>`,
//! new videos are pushed to a Redis list and the ledger is a JSON file.
//!
//! With `--dry-run` nothing is written: messages are printed to stdout and
//! the ledger file is only read.
//!
//! Environment Variables (or `.env`):
//! - REDIS_URL: Redis connection URL
//! - EXPORT_ROOT: directory holding one sub-directory per bucket
//! - LEDGER_PATH: JSON file with the known video ids
//! - STATUS_LOG_PATH: JSON-lines file receiving file status records
//! - OUTBOUND_QUEUE_KEY: Redis list receiving outbound messages
//! - NOTIFY_QUEUE_KEY: optional Redis list receiving the trigger

use anyhow::Context;
use clap::Parser;
use tracing::Instrument;
use uuid::Uuid;
use watch_ingest::adapters::local::{FsExportStore, FsLedger, FsStatusLog, RedisPool};
use watch_ingest::adapters::memory::{MemoryLedger, MemoryQueue, MemoryStatusRepository};
use watch_ingest::domain::{ExportFormat, ExportRef, InvocationReport};
use watch_ingest::observability::{init_tracing, LogFormat};
use watch_ingest::ports::{ExportStore, FileStatusRepository, KnownIdStore, MessageQueue};
use watch_ingest::{IngestRequest, IngestService, LocalConfig};

#[derive(Parser)]
#[command(name = "local_ingest")]
#[command(about = "Publish the new videos of one watch-history export")]
struct Args {
    /// Bucket directory under EXPORT_ROOT
    bucket: String,
    /// Object key inside the bucket
    key: String,
    #[arg(long, default_value = "takeout", help = "Export format: takeout or light")]
    format: ExportFormat,
    #[arg(long, help = "Print messages instead of publishing them")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(LogFormat::from_env_or(LogFormat::Pretty));

    let config = LocalConfig::from_env()?;
    let location = ExportRef::new(&args.bucket, &args.key);
    let request = IngestRequest {
        notification: Some(notification_for(&location)),
        location,
        format: args.format,
    };

    let storage = FsExportStore::new(&config.export_root);
    let ledger = FsLedger::new(&config.ledger_path);
    let span = tracing::info_span!("local_run", run_id = %Uuid::new_v4(), dry_run = args.dry_run);

    let report = if args.dry_run {
        let known = ledger.load().await.context("could not read the ledger")?;
        let queue = MemoryQueue::new();
        let service = IngestService::new(
            storage,
            MemoryLedger::new(known),
            queue.clone(),
            MemoryStatusRepository::new(),
            config.settings.clone(),
        );
        let report = execute(&service, &request).instrument(span).await?;
        for message in queue.delivered().await {
            println!("{}", message.body);
        }
        report
    } else {
        let pool = RedisPool::new(&config.redis_url).context("could not create Redis pool")?;
        let mut service = IngestService::new(
            storage,
            ledger,
            pool.queue(&config.outbound_queue_key),
            FsStatusLog::new(&config.status_log_path),
            config.settings.clone(),
        );
        if let Some(key) = &config.notify_queue_key {
            service = service.with_notifications(pool.queue(key));
        }
        execute(&service, &request).instrument(span).await?
    };

    eprintln!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn execute<S, L, Q, R>(
    service: &IngestService<S, L, Q, R>,
    request: &IngestRequest,
) -> anyhow::Result<InvocationReport>
where
    S: ExportStore,
    L: KnownIdStore,
    Q: MessageQueue,
    R: FileStatusRepository,
{
    service
        .run(request)
        .await
        .with_context(|| format!("ingest of {} failed", request.location))
}

/// The S3 event notification a real upload of `location` would produce.
fn notification_for(location: &ExportRef) -> String {
    serde_json::json!({
        "Records": [{
            "eventSource": "local",
            "s3": {
                "bucket": { "name": location.bucket },
                "object": { "key": urlencoding::encode(&location.key) },
            }
        }]
    })
    .to_string()
}
