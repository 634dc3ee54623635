use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of one run: Start → Fetched → Deduped → Published → Done.
/// Any failure ends in Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Fetched,
    Deduped,
    Published,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Fetched => "fetched",
            Stage::Deduped => "deduped",
            Stage::Published => "published",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counts for one processed export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationReport {
    pub file_id: String,
    pub source_bucket: String,
    pub total: usize,
    pub skipped_rows: usize,
    pub duplicates_known: usize,
    pub duplicates_in_batch: usize,
    pub new_entries: usize,
    pub sent: usize,
    pub failed: usize,
    pub known_before: usize,
    pub known_after: usize,
}

impl InvocationReport {
    pub fn duplicates(&self) -> usize {
        self.duplicates_known + self.duplicates_in_batch
    }
}

/// Per-file record kept in the status store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub file_id: String,
    pub source_bucket: String,
    pub first_processed_at: DateTime<Utc>,
    pub unique_videos: usize,
    pub known_before: usize,
    pub known_after: usize,
    pub added: usize,
    pub duplicates: usize,
    pub messages_sent: usize,
    /// Set once a run finds nothing left to send for this file.
    pub last_processed_at: Option<DateTime<Utc>>,
}

impl FileStatus {
    pub fn from_report(
        report: &InvocationReport,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_id: report.file_id.clone(),
            source_bucket: report.source_bucket.clone(),
            first_processed_at: started_at,
            unique_videos: report.total - report.duplicates_in_batch,
            known_before: report.known_before,
            known_after: report.known_after,
            added: report.known_after.saturating_sub(report.known_before),
            duplicates: report.duplicates(),
            messages_sent: report.sent,
            last_processed_at: (report.new_entries == 0).then_some(finished_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(new_entries: usize) -> InvocationReport {
        InvocationReport {
            file_id: "exports/u1".to_string(),
            source_bucket: "takeout".to_string(),
            total: 6,
            duplicates_known: 2,
            duplicates_in_batch: 1,
            new_entries,
            sent: new_entries,
            known_before: 10,
            known_after: 10 + new_entries,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_from_report() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();

        let status = FileStatus::from_report(&report(3), start, end);

        assert_eq!(status.unique_videos, 5);
        assert_eq!(status.added, 3);
        assert_eq!(status.duplicates, 3);
        assert_eq!(status.messages_sent, 3);
        assert_eq!(status.first_processed_at, start);
        assert_eq!(status.last_processed_at, None);
    }

    #[test]
    fn test_status_marks_exhausted_file() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();

        let status = FileStatus::from_report(&report(0), start, end);

        assert_eq!(status.last_processed_at, Some(end));
    }
}
