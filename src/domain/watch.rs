use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("static video id pattern"));

/// Where an entry of a light export came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Like,
    Sub,
}

/// One parsed row of an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub video_id: String,
    pub watched_at: DateTime<Utc>,
    pub title: Option<String>,
    pub channel_name: Option<String>,
    pub kind: Option<EntryKind>,
}

impl WatchEntry {
    pub fn new(video_id: impl Into<String>, watched_at: DateTime<Utc>) -> Self {
        Self {
            video_id: video_id.into(),
            watched_at,
            title: None,
            channel_name: None,
            kind: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_channel(mut self, channel_name: impl Into<String>) -> Self {
        self.channel_name = Some(channel_name.into());
        self
    }

    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Extracts the video id from a watch URL (`...watch?v=<id>`).
///
/// The id is whatever follows the last `=`. Returns `None` when that text
/// is not a well-formed 11 character YouTube id, which is the case for
/// channel links, playlists and removed videos.
pub fn video_id_from_url(url: &str) -> Option<&str> {
    let candidate = url.rsplit('=').next()?;
    is_video_id(candidate).then_some(candidate)
}

pub fn is_video_id(candidate: &str) -> bool {
    VIDEO_ID.is_match(candidate)
}
