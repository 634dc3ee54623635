//! Removal of already known and repeated video ids.

use super::export::{parse_export, ExportFormat, ParseError};
use super::known::KnownIdentifierSet;
use super::watch::WatchEntry;
use std::collections::HashSet;

/// New entries of one export, in processing order.
#[derive(Debug, Default)]
pub struct Deduplicated {
    pub entries: Vec<WatchEntry>,
    /// Valid entries parsed from the export.
    pub total: usize,
    /// Rows that were well-formed but carried no usable video.
    pub skipped_rows: usize,
    pub duplicates_known: usize,
    pub duplicates_in_batch: usize,
}

impl Deduplicated {
    pub fn duplicates(&self) -> usize {
        self.duplicates_known + self.duplicates_in_batch
    }
}

/// Parses an export and keeps only ids absent from the known set.
///
/// The first occurrence of an id wins; later repeats inside the same export
/// count as in-batch duplicates.
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    format: ExportFormat,
}

impl Deduplicator {
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    pub fn run(&self, raw: &[u8], known: &KnownIdentifierSet) -> Result<Deduplicated, ParseError> {
        let parsed = parse_export(self.format, raw)?;
        let mut outcome = filter_new(parsed.entries, known);
        outcome.skipped_rows = parsed.skipped_rows;
        Ok(outcome)
    }
}

pub fn filter_new(entries: Vec<WatchEntry>, known: &KnownIdentifierSet) -> Deduplicated {
    let mut outcome = Deduplicated {
        total: entries.len(),
        ..Default::default()
    };
    let mut seen = HashSet::with_capacity(entries.len());

    for entry in entries {
        if known.contains(&entry.video_id) {
            outcome.duplicates_known += 1;
        } else if !seen.insert(entry.video_id.clone()) {
            outcome.duplicates_in_batch += 1;
        } else {
            outcome.entries.push(entry);
        }
    }
    outcome
}
