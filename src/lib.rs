//! Watch Ingest - YouTube watch-history export pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (export parsing, dedup, priority, messages)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations
//! - application/: Generic services (fetcher, publisher, pipeline)
//! - config: Environment configuration
//! - trigger: S3 event notifications that start a run
//!
//! # Features
//! - `local`: Local runs (exports and ledger on disk, queues in Redis)
//! - `aws`: Lambda deployment (S3, SQS, DynamoDB)
//! - `full`: All features

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod trigger;

// Re-exports for convenience
pub use application::{IngestRequest, IngestService};
pub use error::{IngestError, PublishError};

#[cfg(feature = "aws")]
pub use config::AwsConfig;

#[cfg(feature = "local")]
pub use config::LocalConfig;
