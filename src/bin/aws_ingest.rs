//! AWS Ingest Binary
//!
//! Deployed as an AWS Lambda function subscribed to the SQS queue that
//! receives S3 event notifications for new exports. Each invocation:
//! 1. Fetches every referenced export from S3.
//! 2. Drops the video ids already recorded in the S3 ledger.
//! 3. Publishes one SQS message per new video, then updates the ledger
//!    and the DynamoDB status table.
//!
//! Environment Variables:
//! - AWS_REGION: AWS region (e.g., eu-west-1)
//! - TAKEOUT_EXPORT_BUCKET: bucket receiving full Takeout exports
//! - LIGHT_EXPORT_BUCKET: bucket receiving light likes/subs exports
//! - LEDGER_BUCKET / LEDGER_KEY: location of the known-id ledger
//! - OUTBOUND_QUEUE_URL: SQS queue receiving one message per new video
//! - NOTIFY_QUEUE_URL: optional FIFO queue the trigger is forwarded to
//! - STATUS_TABLE: DynamoDB table for file status records
//! - QUEUE_MAX_ATTEMPTS, MAX_EXPORT_BYTES, FETCH_TIMEOUT_SECS: optional bounds

use aws_config::BehaviorVersion;
use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use watch_ingest::adapters::aws::lambda::handler;
use watch_ingest::adapters::aws::{DynamoStatusRepository, S3ExportStore, S3Ledger, SqsAdapter};
use watch_ingest::observability::{init_tracing, LogFormat};
use watch_ingest::{AwsConfig, IngestService};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing(LogFormat::from_env_or(LogFormat::Json));

    let config = AwsConfig::from_env()?;

    // Load AWS config
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;

    // Create AWS clients; QUEUE_MAX_ATTEMPTS only bounds SQS requests
    let s3_client = aws_sdk_s3::Client::new(&sdk_config);
    let sqs_client =
        aws_sdk_sqs::Client::from_conf(SqsAdapter::config(&sdk_config, config.queue_max_attempts));
    let dynamo_client = aws_sdk_dynamodb::Client::new(&sdk_config);

    // Create adapters
    let storage = S3ExportStore::new(s3_client.clone());
    let ledger = S3Ledger::new(s3_client, config.ledger_bucket.clone(), config.ledger_key.clone());
    let queue = SqsAdapter::new(
        sqs_client.clone(),
        config.outbound_queue_url.clone(),
        config.queue_max_attempts,
    );
    let repo = DynamoStatusRepository::new(dynamo_client, config.status_table.clone());

    let mut service = IngestService::new(storage, ledger, queue, repo, config.settings.clone());
    if let Some(notify_queue_url) = &config.notify_queue_url {
        service = service.with_notifications(SqsAdapter::new(
            sqs_client,
            notify_queue_url.clone(),
            config.queue_max_attempts,
        ));
    }

    let service = Arc::new(service);
    let sources = Arc::new(config.sources);
    tracing::info!("lambda initialized");

    let func = service_fn(move |event: LambdaEvent<SqsEvent>| {
        let service = service.clone();
        let sources = sources.clone();
        async move { handler(service.as_ref(), sources.as_ref(), event).await }
    });

    run(func).await
}
