use super::watch::{EntryKind, WatchEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStatus {
    New,
}

/// Queue payload announcing one unseen video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub video_id: String,
    /// Correlation id: the file id of the export the video came from.
    pub file_id: String,
    pub status: VideoStatus,
    pub title: Option<String>,
    pub channel_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<EntryKind>,
    pub watched_at: DateTime<Utc>,
    /// 1-based position within this export's batch of new videos.
    pub position: usize,
    pub batch_size: usize,
}

impl OutboundMessage {
    pub fn body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub fn build_messages(file_id: &str, entries: Vec<WatchEntry>) -> Vec<OutboundMessage> {
    let batch_size = entries.len();
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| OutboundMessage {
            video_id: entry.video_id,
            file_id: file_id.to_string(),
            status: VideoStatus::New,
            title: entry.title,
            channel_name: entry.channel_name,
            kind: entry.kind,
            watched_at: entry.watched_at,
            position: index + 1,
            batch_size,
        })
        .collect()
}
