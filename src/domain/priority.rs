//! Processing order for light exports.
//!
//! Downstream transcript fetching is slow, so the most relevant videos go
//! first: likes ahead of subscription uploads, and within each of those the
//! newest video of every channel before the second newest of any channel,
//! with channels taken in order of their latest activity.

use super::watch::{EntryKind, WatchEntry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub fn order_by_priority(entries: Vec<WatchEntry>) -> Vec<WatchEntry> {
    let order = priority_order(&entries);
    let mut slots: Vec<Option<WatchEntry>> = entries.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

fn priority_order(entries: &[WatchEntry]) -> Vec<usize> {
    // Channels ranked by their most recent entry; name breaks ties.
    let mut latest: HashMap<Option<&str>, DateTime<Utc>> = HashMap::new();
    for entry in entries {
        latest
            .entry(entry.channel_name.as_deref())
            .and_modify(|seen| *seen = (*seen).max(entry.watched_at))
            .or_insert(entry.watched_at);
    }
    let mut channels: Vec<_> = latest.into_iter().collect();
    channels.sort_by(|(a_name, a_latest), (b_name, b_latest)| {
        b_latest.cmp(a_latest).then_with(|| a_name.cmp(b_name))
    });
    let channel_rank: HashMap<Option<&str>, usize> = channels
        .into_iter()
        .enumerate()
        .map(|(rank, (name, _))| (name, rank))
        .collect();

    // Rank within the channel, newest first; equal timestamps keep input order.
    let mut by_recency: Vec<usize> = (0..entries.len()).collect();
    by_recency.sort_by(|&a, &b| entries[b].watched_at.cmp(&entries[a].watched_at));
    let mut rank_in_channel = vec![0usize; entries.len()];
    let mut counters: HashMap<Option<&str>, usize> = HashMap::new();
    for index in by_recency {
        let counter = counters
            .entry(entries[index].channel_name.as_deref())
            .or_default();
        rank_in_channel[index] = *counter;
        *counter += 1;
    }

    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&index| {
        let entry = &entries[index];
        (
            entry.kind != Some(EntryKind::Like),
            rank_in_channel[index],
            channel_rank
                .get(&entry.channel_name.as_deref())
                .copied()
                .unwrap_or(usize::MAX),
            entry.kind,
        )
    });
    order
}
