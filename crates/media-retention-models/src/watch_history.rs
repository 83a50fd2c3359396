use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A show with at least one play in the watch-history service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedShow {
    /// Service-local id, needed to fetch detailed progress.
    pub service_id: u64,
    pub title: String,
    pub tvdb_id: Option<u32>,
    pub last_watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedMovie {
    pub service_id: u64,
    pub title: String,
    pub tmdb_id: Option<u32>,
    pub last_watched_at: DateTime<Utc>,
}

/// Per-season completion for one show, merged with announced episode totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShowProgress {
    pub seasons: Vec<SeasonProgress>,
    /// Next unwatched episode, if the service knows of one.
    pub next_episode: Option<EpisodeRef>,
}

impl ShowProgress {
    pub fn season(&self, number: u32) -> Option<&SeasonProgress> {
        self.seasons.iter().find(|s| s.number == number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonProgress {
    pub number: u32,
    pub aired: u32,
    pub completed: u32,
    /// Announced episode count; `None` when the season summary was unavailable.
    pub total: Option<u32>,
}

impl SeasonProgress {
    /// Announced total, falling back to the aired count.
    pub fn total_or_aired(&self) -> u32 {
        match self.total {
            Some(total) if total > 0 => total,
            _ => self.aired,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRef {
    pub season: u32,
    pub number: u32,
}
