//! Runs every retention pass once per cycle and publishes the merged result.

use crate::movies::MovieBackend;
use crate::orphans::OrphanBackend;
use crate::policy::{run_pass, PassContext, PassOutcome, PassSettings, RetentionBackend, WatchIndex};
use crate::queue::QueueSet;
use crate::report::{CycleReport, ReportStore};
use crate::series::SeriesBackend;
use crate::summary;
use chrono::{DateTime, Utc};
use media_retention_config::{Config, ConfigManager, PathManager};
use media_retention_models::{CatalogKind, MediaType, ProcessingResult};
use media_retention_sources::{ClientSet, MediaCatalog, MovieLibrary, TvLibrary, WatchHistorySource};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};


/// The reconciliation engine: owns the queues and the last report, reads
/// config fresh at the start of every cycle.
///
/// Callers must not run two cycles at once; the daemon guards this.
pub struct RetentionService {
    tv: Option<Arc<dyn TvLibrary>>,
    movies: Option<Arc<dyn MovieLibrary>>,
    catalog: Option<Arc<dyn MediaCatalog>>,
    history: Arc<dyn WatchHistorySource>,
    queues: QueueSet,
    config: Arc<ConfigManager>,
    reports: ReportStore,
}

impl RetentionService {
    pub fn new(clients: ClientSet, queues: QueueSet, config: Arc<ConfigManager>, reports: ReportStore) -> Self {
        Self {
            tv: clients.tv,
            movies: clients.movies,
            catalog: clients.catalog,
            history: clients.history,
            queues,
            config,
            reports,
        }
    }

    /// Service backed by the queue and report files under `paths`.
    pub fn with_paths(clients: ClientSet, config: Arc<ConfigManager>, paths: &PathManager) -> Self {
        Self::new(
            clients,
            QueueSet::open(paths),
            config,
            ReportStore::open(paths.last_report_file()),
        )
    }

    pub fn queues(&self) -> &QueueSet {
        &self.queues
    }

    pub fn last_report(&self) -> Option<CycleReport> {
        self.reports.last()
    }

    /// Run one cycle against the current config.
    pub async fn run_cycle(&self) -> CycleReport {
        let config = self.config.current();
        self.run_cycle_with(&config, Utc::now()).await
    }

    /// Run one cycle with an explicit config snapshot and clock.
    pub async fn run_cycle_with(&self, config: &Config, now: DateTime<Utc>) -> CycleReport {
        let started = Instant::now();
        let started_at = Utc::now();
        let dry_run = config.scheduler.dry_run;
        let mut result = ProcessingResult::new();

        if !config.cleanup.enabled {
            info!("Cleanup is disabled in config, nothing to do");
        } else {
            info!(dry_run, sources = ?self.source_names(), "Starting cleanup cycle");
            if let Err(e) = self.history.ensure_ready().await {
                warn!(
                    operation = "watch_history_auth",
                    source = self.history.source_name(),
                    error = %e,
                    "Watch history credentials are not usable"
                );
            }
            self.reconcile_family(CatalogKind::Series, config, now, &mut result).await;
            self.reconcile_family(CatalogKind::Movie, config, now, &mut result).await;
            summary::log_summary(&result, started.elapsed());
        }

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            dry_run,
            result,
        };
        self.reports.publish(report.clone());
        report
    }

    fn source_names(&self) -> Vec<&str> {
        let mut names = vec![self.history.source_name()];
        names.extend(self.tv.as_ref().map(|s| s.source_name()));
        names.extend(self.movies.as_ref().map(|s| s.source_name()));
        names.extend(self.catalog.as_ref().map(|s| s.source_name()));
        names
    }

    /// Authoritative pass for one media family, then its orphan pass.
    async fn reconcile_family(
        &self,
        kind: CatalogKind,
        config: &Config,
        now: DateTime<Utc>,
        result: &mut ProcessingResult,
    ) {
        let (backend, orphan_type): (Option<Box<dyn RetentionBackend>>, MediaType) = match kind {
            CatalogKind::Series => (
                self.tv
                    .clone()
                    .map(|tv| Box::new(SeriesBackend::new(tv)) as Box<dyn RetentionBackend>),
                MediaType::EmbySeries,
            ),
            CatalogKind::Movie => (
                self.movies
                    .clone()
                    .map(|movies| Box::new(MovieBackend::new(movies)) as Box<dyn RetentionBackend>),
                MediaType::EmbyMovie,
            ),
        };

        let Some(backend) = backend else {
            if self.catalog.is_some() {
                info!(
                    media_type = %orphan_type,
                    "No authoritative backend configured, skipping orphan pass"
                );
            }
            return;
        };

        let watched = match self.fetch_watch_index(kind).await {
            Some(watched) => watched,
            None => {
                result.add_error();
                return;
            }
        };

        let outcome = self.run_backend(backend.as_ref(), &watched, config, now).await;
        let authoritative = outcome.cross_refs.clone();
        merge(result, outcome);

        let Some(catalog) = &self.catalog else {
            return;
        };
        match authoritative {
            Some(authoritative) => {
                let orphans = OrphanBackend::new(
                    catalog.clone(),
                    kind,
                    authoritative,
                    config.cleanup.excluded_libraries.clone(),
                );
                let outcome = self.run_backend(&orphans, &watched, config, now).await;
                merge(result, outcome);
            }
            None => warn!(
                media_type = %orphan_type,
                "Authoritative item list unavailable, skipping orphan pass for this cycle"
            ),
        }
    }

    async fn fetch_watch_index(&self, kind: CatalogKind) -> Option<WatchIndex> {
        let fetched = match kind {
            CatalogKind::Series => self.history.watched_shows().await.map(WatchIndex::from_shows),
            CatalogKind::Movie => self.history.watched_movies().await.map(WatchIndex::from_movies),
        };
        match fetched {
            Ok(watched) => {
                info!(kind = ?kind, watched = watched.len(), "Loaded watch history");
                Some(watched)
            }
            Err(e) => {
                warn!(
                    operation = "watch_history",
                    kind = ?kind,
                    error = %e,
                    "Failed to fetch watch history, skipping this media family"
                );
                None
            }
        }
    }

    async fn run_backend(
        &self,
        backend: &dyn RetentionBackend,
        watched: &WatchIndex,
        config: &Config,
        now: DateTime<Utc>,
    ) -> PassOutcome {
        let media_type = backend.media_type();
        let settings = PassSettings::new(
            config.delay_days_for(media_type),
            config.scheduler.dry_run,
            &config.cleanup.exclusions,
        );
        let ctx = PassContext {
            queue: self.queues.get(media_type),
            history: self.history.as_ref(),
            watched,
            settings: &settings,
            now,
        };
        run_pass(backend, &ctx).await
    }
}

fn merge(result: &mut ProcessingResult, outcome: PassOutcome) {
    if outcome.listing_failed {
        result.add_error();
        return;
    }
    result.add_scanned(outcome.media_type, outcome.scanned);
    result.extend(outcome.results);
}
