//! Decoding of the events that start a run.
//!
//! Exports land in S3, S3 posts an event notification to SQS, and SQS
//! invokes the function. Each queue message body is one S3 notification,
//! which may reference several objects.

use crate::domain::ExportRef;
use serde::Deserialize;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("trigger message has no body")]
    MissingBody,
    #[error("trigger body is not an S3 notification")]
    Body(#[from] serde_json::Error),
    #[error("S3 record {0} lacks a bucket name or object key")]
    IncompleteRecord(usize),
    #[error("object key {key:?} is not valid URL encoding")]
    Key {
        key: String,
        #[source]
        source: FromUtf8Error,
    },
}

/// One queue message: the exports it references plus its raw body, which
/// is forwarded to the notification queue after processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub body: String,
    pub exports: Vec<ExportRef>,
}

impl Trigger {
    pub fn from_body(body: impl Into<String>) -> Result<Self, TriggerError> {
        let body = body.into();
        let exports = exports_from_notification(&body)?;
        Ok(Self { body, exports })
    }
}

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<NotificationRecord>,
}

#[derive(Deserialize)]
struct NotificationRecord {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Deserialize)]
struct S3Bucket {
    name: Option<String>,
}

#[derive(Deserialize)]
struct S3Object {
    key: Option<String>,
}

/// Exports referenced by an S3 event notification.
///
/// `s3:TestEvent` notifications carry no records and yield nothing.
pub fn exports_from_notification(body: &str) -> Result<Vec<ExportRef>, TriggerError> {
    let notification: Notification = serde_json::from_str(body)?;
    notification
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let (Some(bucket), Some(key)) = (record.s3.bucket.name, record.s3.object.key) else {
                return Err(TriggerError::IncompleteRecord(index));
            };
            Ok(ExportRef::new(bucket, decode_key(&key)?))
        })
        .collect()
}

/// S3 notifications form-encode object keys: `+` is a space.
pub fn decode_key(raw: &str) -> Result<String, TriggerError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|source| TriggerError::Key {
            key: raw.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTIFICATION: &str = r#"{
        "Records": [
            {
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "eu-central-1",
                "eventTime": "2024-03-01T10:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "bucket": {"name": "takeout-exports", "arn": "arn:aws:s3:::takeout-exports"},
                    "object": {"key": "user+42/watch-history%281%29.json", "size": 1024}
                }
            }
        ]
    }"#;

    #[test]
    fn test_exports_from_notification() {
        let exports = exports_from_notification(NOTIFICATION).unwrap();
        assert_eq!(
            exports,
            vec![ExportRef::new("takeout-exports", "user 42/watch-history(1).json")]
        );
    }

    #[test]
    fn test_trigger_keeps_body() {
        let trigger = Trigger::from_body(NOTIFICATION).unwrap();
        assert_eq!(trigger.body, NOTIFICATION);
        assert_eq!(trigger.exports.len(), 1);
    }

    #[test]
    fn test_test_event_has_no_exports() {
        let body = r#"{"Service":"Amazon S3","Event":"s3:TestEvent","Time":"2024-03-01T10:00:00.000Z","Bucket":"takeout-exports"}"#;
        assert!(exports_from_notification(body).unwrap().is_empty());
    }

    #[test]
    fn test_record_without_key_is_rejected() {
        let body = r#"{"Records":[{"s3":{"bucket":{"name":"b"},"object":{}}}]}"#;
        assert!(matches!(
            exports_from_notification(body),
            Err(TriggerError::IncompleteRecord(0))
        ));
    }

    #[test]
    fn test_body_must_be_json() {
        assert!(matches!(
            exports_from_notification("hello"),
            Err(TriggerError::Body(_))
        ));
    }

    #[test]
    fn test_decode_key_rejects_invalid_utf8() {
        assert!(decode_key("bad%FFkey").is_err());
        assert_eq!(decode_key("plain/key.json").unwrap(), "plain/key.json");
    }
}
