use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An item on probation before deletion.
///
/// `marked_at` is written once, when the item is first queued, and is never
/// reset while the item stays queued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    /// Backend-local (or catalog) id.
    pub id: u64,
    /// TVDB for series, TMDB for movies.
    pub external_id: Option<u32>,
    pub title: String,
    pub marked_at: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub size_on_disk: u64,
    #[serde(default)]
    pub unmonitored: bool,
}

impl QueueItem {
    /// Whole days elapsed since the item was marked.
    pub fn days_in_queue(&self, now: DateTime<Utc>) -> i64 {
        (now - self.marked_at).num_days()
    }

    /// Days left before the removal pass picks the item up, never negative.
    pub fn days_until_removal(&self, delay_days: u32, now: DateTime<Utc>) -> u32 {
        let remaining = i64::from(delay_days) - self.days_in_queue(now);
        remaining.max(0) as u32
    }

    pub fn is_ready(&self, delay_days: u32, now: DateTime<Utc>) -> bool {
        now - self.marked_at >= Duration::days(i64::from(delay_days))
    }
}
