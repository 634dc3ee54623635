//! Export locations, formats and parsing.
//!
//! Two export shapes are understood:
//! - `Takeout`: Google Takeout `watch-history.json`, a JSON array of
//!   activity rows (`title`, `titleUrl`, `subtitles`, `time`, ...).
//! - `Light`: `{"items": {"likes": [...], "subs": [...]}}` with rows of
//!   `url`, `timestamp`, `title`, `channelName`.
//!
//! Rows that are well-formed but describe no video (removed videos, ads,
//! channel links) are skipped and counted. Anything structurally wrong
//! aborts the whole parse.

use super::priority::order_by_priority;
use super::watch::{video_id_from_url, EntryKind, WatchEntry};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Location of an export in an object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportRef {
    pub bucket: String,
    pub key: String,
}

impl ExportRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The key without its final extension; used as the correlation id of a run.
    pub fn file_id(&self) -> &str {
        let name_start = self.key.rfind('/').map_or(0, |i| i + 1);
        match self.key[name_start..].rfind('.') {
            Some(dot) if dot > 0 => &self.key[..name_start + dot],
            _ => &self.key,
        }
    }
}

impl fmt::Display for ExportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Takeout,
    Light,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Takeout => f.write_str("takeout"),
            ExportFormat::Light => f.write_str("light"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "takeout" => Ok(ExportFormat::Takeout),
            "light" => Ok(ExportFormat::Light),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("export is not a valid {format} document: {source}")]
    Document {
        format: ExportFormat,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed row {index} in {section}: {reason}")]
    Row {
        section: &'static str,
        index: usize,
        reason: String,
    },
    #[error("unparseable timestamp {value:?} in row {index} of {section}")]
    Timestamp {
        section: &'static str,
        index: usize,
        value: String,
    },
}

/// Result of parsing an export, entries in processing order.
#[derive(Debug, Default)]
pub struct ParsedExport {
    pub entries: Vec<WatchEntry>,
    pub skipped_rows: usize,
}

pub fn parse_export(format: ExportFormat, raw: &[u8]) -> Result<ParsedExport, ParseError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(ParsedExport::default());
    }
    match format {
        ExportFormat::Takeout => parse_takeout(raw),
        ExportFormat::Light => parse_light(raw),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakeoutRow {
    title: Option<String>,
    title_url: Option<String>,
    subtitles: Option<Vec<TakeoutSubtitle>>,
    time: Option<String>,
}

#[derive(Deserialize)]
struct TakeoutSubtitle {
    name: Option<String>,
}

fn parse_takeout(raw: &[u8]) -> Result<ParsedExport, ParseError> {
    const SECTION: &str = "history";

    let rows: Vec<Value> = serde_json::from_slice(raw).map_err(|source| ParseError::Document {
        format: ExportFormat::Takeout,
        source,
    })?;

    let mut parsed = ParsedExport::default();
    for (index, value) in rows.into_iter().enumerate() {
        let row: TakeoutRow = decode_row(SECTION, index, value)?;

        let (Some(url), Some(time)) = (row.title_url.as_deref(), row.time.as_deref()) else {
            parsed.skipped_rows += 1;
            continue;
        };
        let Some(video_id) = video_id_from_url(url) else {
            parsed.skipped_rows += 1;
            continue;
        };

        let mut entry = WatchEntry::new(video_id, parse_timestamp(SECTION, index, time)?);
        entry.title = row.title;
        entry.channel_name = row
            .subtitles
            .and_then(|subtitles| subtitles.into_iter().next())
            .and_then(|subtitle| subtitle.name);
        parsed.entries.push(entry);
    }
    Ok(parsed)
}

#[derive(Deserialize)]
struct LightDocument {
    #[serde(default)]
    items: LightItems,
}

#[derive(Deserialize, Default)]
struct LightItems {
    #[serde(default)]
    likes: Vec<Value>,
    #[serde(default)]
    subs: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LightRow {
    url: Option<String>,
    timestamp: Option<String>,
    title: Option<String>,
    channel_name: Option<String>,
}

fn parse_light(raw: &[u8]) -> Result<ParsedExport, ParseError> {
    let document: LightDocument =
        serde_json::from_slice(raw).map_err(|source| ParseError::Document {
            format: ExportFormat::Light,
            source,
        })?;

    let mut parsed = ParsedExport::default();
    let sections = [
        ("likes", EntryKind::Like, document.items.likes),
        ("subs", EntryKind::Sub, document.items.subs),
    ];
    for (section, kind, rows) in sections {
        for (index, value) in rows.into_iter().enumerate() {
            let row: LightRow = decode_row(section, index, value)?;

            let (Some(url), Some(timestamp)) = (row.url.as_deref(), row.timestamp.as_deref())
            else {
                parsed.skipped_rows += 1;
                continue;
            };
            let Some(video_id) = video_id_from_url(url) else {
                parsed.skipped_rows += 1;
                continue;
            };

            let mut entry = WatchEntry::new(video_id, parse_timestamp(section, index, timestamp)?)
                .with_kind(kind);
            entry.title = row.title;
            entry.channel_name = row.channel_name;
            parsed.entries.push(entry);
        }
    }

    parsed.entries = order_by_priority(parsed.entries);
    Ok(parsed)
}

fn decode_row<T: for<'de> Deserialize<'de>>(
    section: &'static str,
    index: usize,
    value: Value,
) -> Result<T, ParseError> {
    serde_json::from_value(value).map_err(|e| ParseError::Row {
        section,
        index,
        reason: e.to_string(),
    })
}

/// Accepts RFC 3339, or a naive ISO-8601 datetime taken as UTC.
fn parse_timestamp(
    section: &'static str,
    index: usize,
    value: &str,
) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ParseError::Timestamp {
            section,
            index,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TAKEOUT: &str = r#"[
        {
            "header": "YouTube",
            "title": "Watched Never Gonna Give You Up",
            "titleUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "subtitles": [{"name": "Rick Astley", "url": "https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw"}],
            "time": "2024-03-01T10:15:30.123Z",
            "products": ["YouTube"]
        },
        {
            "header": "YouTube",
            "title": "Watched a video that has been removed",
            "time": "2024-03-01T09:00:00Z"
        },
        {
            "header": "YouTube",
            "title": "Visited Some Channel",
            "titleUrl": "https://www.youtube.com/channel/UC38IQsAvIsxxjztdMZQtwHA",
            "time": "2024-02-28T08:00:00Z"
        },
        {
            "title": "Watched untitled upload",
            "titleUrl": "https://www.youtube.com/watch?v=9bZkp7q19f0",
            "time": "2024-02-27T08:00:00Z"
        }
    ]"#;

    #[test]
    fn test_file_id_strips_extension() {
        let location = ExportRef::new("exports", "user/2024/watch-history.json");
        assert_eq!(location.file_id(), "user/2024/watch-history");
    }

    #[test]
    fn test_file_id_without_extension() {
        assert_eq!(ExportRef::new("b", "dir.v2/export").file_id(), "dir.v2/export");
        assert_eq!(ExportRef::new("b", ".hidden").file_id(), ".hidden");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("Light".parse::<ExportFormat>(), Ok(ExportFormat::Light));
        assert_eq!("takeout".parse::<ExportFormat>(), Ok(ExportFormat::Takeout));
        assert!("csv".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_parse_takeout() {
        let parsed = parse_export(ExportFormat::Takeout, TAKEOUT.as_bytes()).unwrap();

        assert_eq!(parsed.skipped_rows, 2);
        assert_eq!(parsed.entries.len(), 2);

        let first = &parsed.entries[0];
        assert_eq!(first.video_id, "dQw4w9WgXcQ");
        assert_eq!(first.channel_name.as_deref(), Some("Rick Astley"));
        assert_eq!(first.title.as_deref(), Some("Watched Never Gonna Give You Up"));
        assert_eq!(first.kind, None);
        assert_eq!(
            first.watched_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap()
                + chrono::Duration::milliseconds(123)
        );

        let second = &parsed.entries[1];
        assert_eq!(second.video_id, "9bZkp7q19f0");
        assert_eq!(second.channel_name, None);
    }

    #[test]
    fn test_parse_empty_export() {
        let parsed = parse_export(ExportFormat::Takeout, b"").unwrap();
        assert!(parsed.entries.is_empty());
        assert_eq!(parsed.skipped_rows, 0);

        let parsed = parse_export(ExportFormat::Takeout, b"[]").unwrap();
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn test_parse_takeout_rejects_non_array() {
        let err = parse_export(ExportFormat::Takeout, br#"{"items": []}"#).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Document {
                format: ExportFormat::Takeout,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_takeout_rejects_wrong_field_type() {
        let raw = br#"[{"titleUrl": 42, "time": "2024-03-01T10:15:30Z"}]"#;
        let err = parse_export(ExportFormat::Takeout, raw).unwrap_err();
        assert!(matches!(err, ParseError::Row { index: 0, .. }));
    }

    #[test]
    fn test_parse_takeout_rejects_bad_timestamp() {
        let raw = br#"[
            {"titleUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "time": "2024-03-01T10:15:30Z"},
            {"titleUrl": "https://www.youtube.com/watch?v=9bZkp7q19f0", "time": "yesterday"}
        ]"#;
        let err = parse_export(ExportFormat::Takeout, raw).unwrap_err();
        match err {
            ParseError::Timestamp { index, value, .. } => {
                assert_eq!(index, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_light() {
        let raw = br#"{
            "items": {
                "likes": [
                    {"url": "https://www.youtube.com/watch?v=aaaaaaaaaaa", "timestamp": "2024-01-02T00:00:00", "title": "A", "channelName": "One"}
                ],
                "subs": [
                    {"url": "https://www.youtube.com/watch?v=bbbbbbbbbbb", "timestamp": "2024-01-03 00:00:00", "title": "B", "channelName": "Two"},
                    {"url": "https://www.youtube.com/watch?v=ccccccccccc", "title": "no timestamp"}
                ]
            }
        }"#;
        let parsed = parse_export(ExportFormat::Light, raw).unwrap();

        assert_eq!(parsed.skipped_rows, 1);
        let ids: Vec<_> = parsed.entries.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(ids, vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        assert_eq!(parsed.entries[0].kind, Some(EntryKind::Like));
        assert_eq!(parsed.entries[1].kind, Some(EntryKind::Sub));
        assert_eq!(parsed.entries[1].channel_name.as_deref(), Some("Two"));
    }

    #[test]
    fn test_parse_light_without_items() {
        let parsed = parse_export(ExportFormat::Light, b"{}").unwrap();
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn test_parse_light_rejects_non_object_row() {
        let raw = br#"{"items": {"likes": ["https://www.youtube.com/watch?v=aaaaaaaaaaa"]}}"#;
        let err = parse_export(ExportFormat::Light, raw).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Row {
                section: "likes",
                index: 0,
                ..
            }
        ));
    }
}
