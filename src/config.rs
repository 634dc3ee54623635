//! Configuration for different deployment environments.

use crate::domain::ExportFormat;
use anyhow::Context;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MAX_EXPORT_BYTES: u64 = 64 * 1024 * 1024;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Bounds applied to every run, whatever the deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Exports larger than this are refused before download
    pub max_export_bytes: u64,
    /// Wall-clock budget for the fetch stage
    pub fetch_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_export_bytes: DEFAULT_MAX_EXPORT_BYTES,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl PipelineSettings {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            max_export_bytes: parsed_or(lookup, "MAX_EXPORT_BYTES", DEFAULT_MAX_EXPORT_BYTES)?,
            fetch_timeout: Duration::from_secs(parsed_or(
                lookup,
                "FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )?),
        })
    }
}

/// Configuration for local deployment.
#[cfg(feature = "local")]
#[derive(Clone, Debug)]
pub struct LocalConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Directory holding one sub-directory per export "bucket"
    pub export_root: String,
    /// JSON file holding the known video ids
    pub ledger_path: String,
    /// JSON-lines file receiving file status records
    pub status_log_path: String,
    /// Redis list receiving outbound messages
    pub outbound_queue_key: String,
    /// Redis list receiving forwarded trigger bodies, if any
    pub notify_queue_key: Option<String>,
    pub settings: PipelineSettings,
}

#[cfg(feature = "local")]
impl LocalConfig {
    /// Load configuration from environment variables (and `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        Ok(Self {
            redis_url: or("REDIS_URL", "redis://127.0.0.1/"),
            export_root: or("EXPORT_ROOT", "./exports"),
            ledger_path: or("LEDGER_PATH", "./known_ids.json"),
            status_log_path: or("STATUS_LOG_PATH", "./file_status.jsonl"),
            outbound_queue_key: or("OUTBOUND_QUEUE_KEY", "watch_ingest:outbound"),
            notify_queue_key: lookup("NOTIFY_QUEUE_KEY"),
            settings: PipelineSettings::from_lookup(&lookup)?,
        })
    }
}

/// Buckets exports arrive in, and the format each one holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceBuckets {
    pub takeout: String,
    pub light: String,
}

impl SourceBuckets {
    pub fn format_for(&self, bucket: &str) -> Option<ExportFormat> {
        if bucket == self.takeout {
            Some(ExportFormat::Takeout)
        } else if bucket == self.light {
            Some(ExportFormat::Light)
        } else {
            None
        }
    }
}

/// Configuration for AWS/serverless deployment.
#[cfg(feature = "aws")]
#[derive(Clone, Debug)]
pub struct AwsConfig {
    pub sources: SourceBuckets,
    /// S3 bucket holding the known-id ledger
    pub ledger_bucket: String,
    /// Object key of the ledger inside `ledger_bucket`
    pub ledger_key: String,
    /// SQS queue URL receiving one message per new video
    pub outbound_queue_url: String,
    /// SQS queue URL the trigger body is forwarded to after a run
    pub notify_queue_url: Option<String>,
    /// DynamoDB table for file status records
    pub status_table: String,
    /// Attempts per message before it counts as failed
    pub queue_max_attempts: u32,
    pub settings: PipelineSettings,
}

#[cfg(feature = "aws")]
impl AwsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |name: &str| lookup(name).with_context(|| format!("{name} must be set"));
        Ok(Self {
            sources: SourceBuckets {
                takeout: required("TAKEOUT_EXPORT_BUCKET")?,
                light: required("LIGHT_EXPORT_BUCKET")?,
            },
            ledger_bucket: required("LEDGER_BUCKET")?,
            ledger_key: lookup("LEDGER_KEY").unwrap_or_else(|| "all/all.json".to_string()),
            outbound_queue_url: required("OUTBOUND_QUEUE_URL")?,
            notify_queue_url: lookup("NOTIFY_QUEUE_URL"),
            status_table: required("STATUS_TABLE")?,
            queue_max_attempts: parsed_or(&lookup, "QUEUE_MAX_ATTEMPTS", 3)?,
            settings: PipelineSettings::from_lookup(&lookup)?,
        })
    }
}

fn parsed_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
