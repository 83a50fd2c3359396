//! The retention state machine, shared by every backend.
//!
//! A pass evaluates each candidate (exclusion, queued short-circuit,
//! eligibility, watch history, watched-on-disk, forthcoming content) and then
//! processes the items whose probation has elapsed. Backends only supply
//! listing, file presence, existence, unmonitor and delete.

use crate::progress;
use crate::queue::Queue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_retention_models::{
    Action, MediaResult, MediaType, QueueItem, SeasonFiles, ShowProgress, WatchedMovie,
    WatchedShow,
};
use media_retention_sources::{SourceError, WatchHistorySource};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Backend-agnostic view of one item eligible for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: u64,
    /// TVDB id for series, TMDB id for movies.
    pub external_id: Option<u32>,
    pub title: String,
    pub year: Option<u32>,
    pub size_on_disk: u64,
    pub eligibility: Eligibility,
    /// On-disk seasons when the listing already knows them.
    pub seasons: Vec<SeasonFiles>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    NotMonitored,
    NotReleased,
    NoFile,
}

impl Eligibility {
    fn skip_reason(self, media_type: MediaType) -> Option<&'static str> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::NotMonitored => Some("not monitored"),
            Eligibility::NotReleased => Some(media_type.not_released_reason()),
            Eligibility::NoFile if media_type.is_episodic() => Some("no files on disk"),
            Eligibility::NoFile => Some("no file on disk"),
        }
    }
}

/// Capabilities a backend exposes to the retention policy.
#[async_trait]
pub trait RetentionBackend: Send + Sync {
    fn media_type(&self) -> MediaType;

    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError>;

    /// Per-season file counts, excluding placeholders.
    async fn on_disk_seasons(&self, candidate: &Candidate) -> Result<Vec<SeasonFiles>, SourceError> {
        Ok(candidate.seasons.clone())
    }

    /// Whether a queued item still exists upstream and is still a removal candidate.
    async fn still_present(&self, item: &QueueItem) -> Result<bool, SourceError>;

    /// Stop acquisition. `Ok(false)` means the backend has no monitoring concept.
    async fn unmonitor(&self, id: u64) -> Result<bool, SourceError>;

    /// Delete the item and its files; an already-missing item is success.
    async fn delete(&self, item: &QueueItem) -> Result<(), SourceError>;
}

/// Watch history keyed by cross-reference id, fetched once per cycle.
#[derive(Debug, Clone, Default)]
pub struct WatchIndex {
    shows: HashMap<u32, WatchedShow>,
    movies: HashMap<u32, WatchedMovie>,
}

impl WatchIndex {
    pub fn from_shows(shows: Vec<WatchedShow>) -> Self {
        Self {
            shows: shows
                .into_iter()
                .filter_map(|s| s.tvdb_id.map(|id| (id, s)))
                .collect(),
            movies: HashMap::new(),
        }
    }

    pub fn from_movies(movies: Vec<WatchedMovie>) -> Self {
        Self {
            shows: HashMap::new(),
            movies: movies
                .into_iter()
                .filter_map(|m| m.tmdb_id.map(|id| (id, m)))
                .collect(),
        }
    }

    pub fn show(&self, tvdb_id: u32) -> Option<&WatchedShow> {
        self.shows.get(&tvdb_id)
    }

    pub fn movie(&self, tmdb_id: u32) -> Option<&WatchedMovie> {
        self.movies.get(&tmdb_id)
    }

    pub fn len(&self) -> usize {
        self.shows.len() + self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settings for one pass, snapshotted from config at the start of the cycle.
#[derive(Debug, Clone)]
pub struct PassSettings {
    pub delay_days: u32,
    pub dry_run: bool,
    exclusions: HashSet<String>,
}

impl PassSettings {
    pub fn new(delay_days: u32, dry_run: bool, exclusions: &[String]) -> Self {
        Self {
            delay_days,
            dry_run,
            exclusions: exclusions.iter().map(|t| t.trim().to_lowercase()).collect(),
        }
    }

    /// Case-insensitive exact title match.
    pub fn is_excluded(&self, title: &str) -> bool {
        self.exclusions.contains(&title.trim().to_lowercase())
    }
}

pub struct PassContext<'a> {
    pub queue: &'a Queue,
    pub history: &'a dyn WatchHistorySource,
    pub watched: &'a WatchIndex,
    pub settings: &'a PassSettings,
    pub now: DateTime<Utc>,
}

/// Everything one pass produced; merged into the cycle result by the caller.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub media_type: MediaType,
    pub scanned: usize,
    pub results: Vec<MediaResult>,
    /// Cross-reference ids of every listed item; `None` when listing failed.
    pub cross_refs: Option<HashSet<u32>>,
    pub listing_failed: bool,
}

/// Evaluate every candidate, then process items past their delay.
pub async fn run_pass(backend: &dyn RetentionBackend, ctx: &PassContext<'_>) -> PassOutcome {
    let media_type = backend.media_type();

    let candidates = match backend.list_candidates().await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(
                operation = "list_candidates",
                media_type = %media_type,
                error = %e,
                "Failed to list items, skipping pass"
            );
            return PassOutcome {
                media_type,
                scanned: 0,
                results: Vec::new(),
                cross_refs: None,
                listing_failed: true,
            };
        }
    };

    info!(
        media_type = %media_type,
        candidates = candidates.len(),
        queued = ctx.queue.len(),
        "Evaluating items"
    );

    let cross_refs: HashSet<u32> = candidates.iter().filter_map(|c| c.external_id).collect();
    let years: HashMap<u64, u32> = candidates
        .iter()
        .filter_map(|c| c.year.map(|y| (c.id, y)))
        .collect();

    let mut results = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        if let Some(action) = evaluate(backend, ctx, candidate).await {
            results.push(MediaResult {
                media_type,
                title: candidate.title.clone(),
                id: candidate.id,
                year: candidate.year,
                action,
                size_on_disk: Some(candidate.size_on_disk).filter(|s| *s > 0),
            });
        }
    }

    results.extend(removal_pass(backend, ctx, &years).await);

    PassOutcome {
        media_type,
        scanned: candidates.len(),
        results,
        cross_refs: Some(cross_refs),
        listing_failed: false,
    }
}

/// Decide one candidate. `None` means the removal pass owns the item this cycle.
pub async fn evaluate(
    backend: &dyn RetentionBackend,
    ctx: &PassContext<'_>,
    candidate: &Candidate,
) -> Option<Action> {
    let media_type = backend.media_type();
    let queue = ctx.queue;
    let delay_days = ctx.settings.delay_days;

    if ctx.settings.is_excluded(&candidate.title) {
        if queue.remove(candidate.id).is_some() {
            info!(media_type = %media_type, title = %candidate.title, "Excluded title removed from queue");
        }
        return Some(Action::skipped("in exclusion list"));
    }

    if queue.is_queued(candidate.id) {
        if media_type.is_episodic() {
            match queued_forthcoming_reason(backend, ctx, candidate).await {
                Ok(Some(reason)) => {
                    queue.remove(candidate.id);
                    info!(
                        media_type = %media_type,
                        title = %candidate.title,
                        reason = %reason,
                        "New episodes announced, removed from queue"
                    );
                    return Some(Action::skipped(reason));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        media_type = %media_type,
                        title = %candidate.title,
                        error = %e,
                        "Could not re-check queued series for new episodes, keeping it queued"
                    );
                }
            }
        }

        if queue.is_ready_for_removal(candidate.id, delay_days, ctx.now) {
            return None;
        }
        if let Some(item) = queue.get(candidate.id) {
            return Some(Action::Queued {
                reason: item.reason.clone(),
                days_until: item.days_until_removal(delay_days, ctx.now),
            });
        }
    }

    if let Some(reason) = candidate.eligibility.skip_reason(media_type) {
        return Some(Action::skipped(reason));
    }

    let Some(external_id) = candidate.external_id else {
        return Some(Action::skipped("no watch history"));
    };

    let watched_reason = if media_type.is_episodic() {
        let Some(show) = ctx.watched.show(external_id) else {
            return Some(Action::skipped("no watch history"));
        };
        let (on_disk, progress) = match season_state(backend, ctx, candidate, show).await {
            Ok(state) => state,
            Err(action) => return Some(action),
        };
        if on_disk.is_empty() {
            return Some(Action::skipped("no files on disk"));
        }
        if let Some(season) = progress::first_unwatched_season(&on_disk, &progress) {
            return Some(Action::skipped(progress::watching_reason(season, &progress)));
        }
        if let Some(reason) = progress::forthcoming_reason(&on_disk, &progress) {
            queue.remove(candidate.id);
            return Some(Action::skipped(reason));
        }
        format!("fully watched (S{})", progress::format_seasons(&on_disk))
    } else {
        let Some(movie) = ctx.watched.movie(external_id) else {
            return Some(Action::skipped("no watch history"));
        };
        format!("watched {}", movie.last_watched_at.format("%Y-%m-%d"))
    };

    queue.add(QueueItem {
        id: candidate.id,
        external_id: candidate.external_id,
        title: candidate.title.clone(),
        marked_at: ctx.now,
        reason: watched_reason.clone(),
        size_on_disk: candidate.size_on_disk,
        unmonitored: false,
    });
    info!(
        media_type = %media_type,
        title = %candidate.title,
        reason = %watched_reason,
        delay_days,
        "Queued for removal"
    );

    if !ctx.settings.dry_run {
        unmonitor_queued(backend, ctx.queue, candidate.id, &candidate.title).await;
    }

    Some(Action::Queued {
        reason: watched_reason,
        days_until: delay_days,
    })
}

/// On-disk seasons and merged watch progress, or the error result to report.
async fn season_state(
    backend: &dyn RetentionBackend,
    ctx: &PassContext<'_>,
    candidate: &Candidate,
    show: &WatchedShow,
) -> Result<(Vec<SeasonFiles>, ShowProgress), Action> {
    let progress = ctx
        .history
        .show_progress(show)
        .await
        .map_err(|e| Action::error(format!("watch history error: {}", e)))?;
    let on_disk = backend
        .on_disk_seasons(candidate)
        .await
        .map_err(|e| Action::error(format!("season listing failed: {}", e)))?;
    Ok((on_disk, progress))
}

/// Forthcoming-content check for an already queued series.
async fn queued_forthcoming_reason(
    backend: &dyn RetentionBackend,
    ctx: &PassContext<'_>,
    candidate: &Candidate,
) -> Result<Option<String>, SourceError> {
    let Some(show) = candidate.external_id.and_then(|id| ctx.watched.show(id)) else {
        return Ok(None);
    };
    let progress = ctx.history.show_progress(show).await?;
    let on_disk = backend.on_disk_seasons(candidate).await?;
    Ok(progress::forthcoming_reason(&on_disk, &progress))
}

/// Best-effort unmonitor; the flag is persisted only on success.
async fn unmonitor_queued(backend: &dyn RetentionBackend, queue: &Queue, id: u64, title: &str) {
    match backend.unmonitor(id).await {
        Ok(true) => {
            queue.mark_unmonitored(id);
            debug!(media_type = %backend.media_type(), title = %title, "Unmonitored");
        }
        Ok(false) => {}
        Err(e) => warn!(
            media_type = %backend.media_type(),
            title = %title,
            error = %e,
            "Failed to unmonitor, will retry before deletion"
        ),
    }
}

/// Delete (or report in dry-run) every item whose delay has elapsed.
pub async fn removal_pass(
    backend: &dyn RetentionBackend,
    ctx: &PassContext<'_>,
    years: &HashMap<u64, u32>,
) -> Vec<MediaResult> {
    let media_type = backend.media_type();
    let ready = ctx.queue.ready_for_removal(ctx.settings.delay_days, ctx.now);
    if ready.is_empty() {
        return Vec::new();
    }

    info!(media_type = %media_type, count = ready.len(), dry_run = ctx.settings.dry_run, "Items ready for removal");

    let mut results = Vec::new();
    for item in ready {
        let result = |action: Action| MediaResult {
            media_type,
            title: item.title.clone(),
            id: item.id,
            year: years.get(&item.id).copied(),
            action,
            size_on_disk: Some(item.size_on_disk).filter(|s| *s > 0),
        };

        if ctx.settings.is_excluded(&item.title) {
            ctx.queue.remove(item.id);
            info!(media_type = %media_type, title = %item.title, "Excluded title dropped from queue");
            continue;
        }

        match backend.still_present(&item).await {
            Ok(true) => {}
            Ok(false) => {
                ctx.queue.remove(item.id);
                info!(media_type = %media_type, title = %item.title, "Already removed upstream, clearing from queue");
                continue;
            }
            Err(e) => {
                warn!(media_type = %media_type, title = %item.title, error = %e, "Existence check failed");
                results.push(result(Action::error(format!("existence check failed: {}", e))));
                continue;
            }
        }

        if ctx.settings.dry_run {
            warn!(media_type = %media_type, title = %item.title, "[DRY RUN] Would delete");
            results.push(result(Action::DryRunRemove {
                reason: "would be deleted".to_string(),
            }));
            continue;
        }

        if !item.unmonitored {
            unmonitor_queued(backend, ctx.queue, item.id, &item.title).await;
        }

        match backend.delete(&item).await {
            Ok(()) => {
                ctx.queue.remove(item.id);
                info!(
                    media_type = %media_type,
                    title = %item.title,
                    size = %media_retention_models::format_size(item.size_on_disk),
                    "Deleted"
                );
                results.push(result(Action::Removed {
                    reason: "deleted".to_string(),
                }));
            }
            Err(e) => {
                warn!(media_type = %media_type, title = %item.title, error = %e, "Delete failed, will retry next cycle");
                results.push(result(Action::error(format!("delete failed: {}", e))));
            }
        }
    }
    results
}
