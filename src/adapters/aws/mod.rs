//! AWS adapters: S3 exports and ledger, SQS queues, DynamoDB status table.

pub mod dynamodb;
pub mod lambda;
pub mod s3;
pub mod sqs;

pub use dynamodb::DynamoStatusRepository;
pub use s3::{S3ExportStore, S3Ledger};
pub use sqs::SqsAdapter;
