//! In-memory fakes of every upstream collaborator, for engine tests.
//!
//! Each fake records mutating calls and can be told to fail specific
//! operations. Deletes and unmonitors change the fake's state the way the real
//! service would, so consecutive cycles see the consequences.

use async_trait::async_trait;
use media_retention_models::{
    CatalogEpisode, CatalogItem, CatalogKind, CatalogLibrary, CatalogSeason, Movie, Series,
    ShowProgress, WatchedMovie, WatchedShow,
};
use media_retention_sources::{MediaCatalog, MovieLibrary, SourceError, TvLibrary, WatchHistorySource};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn unavailable() -> SourceError {
    SourceError::Api {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

/// Which operation of a fake should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    List,
    Get,
    Delete,
    Unmonitor,
    Progress,
    Seasons,
    Auth,
}

#[derive(Default)]
struct Failures(Mutex<Vec<FailOn>>);

impl Failures {
    fn set(&self, op: FailOn, fail: bool) {
        let mut ops = lock(&self.0);
        ops.retain(|o| *o != op);
        if fail {
            ops.push(op);
        }
    }

    fn check(&self, op: FailOn) -> Result<(), SourceError> {
        if lock(&self.0).contains(&op) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct FakeTvLibrary {
    series: Mutex<BTreeMap<u64, Series>>,
    deleted: Mutex<Vec<u64>>,
    unmonitored: Mutex<Vec<u64>>,
    failures: Failures,
}

impl FakeTvLibrary {
    pub fn new(series: Vec<Series>) -> Self {
        let fake = Self::default();
        for s in series {
            fake.upsert(s);
        }
        fake
    }

    pub fn upsert(&self, series: Series) {
        lock(&self.series).insert(series.id, series);
    }

    /// Drop a series as if someone deleted it outside this tool.
    pub fn remove(&self, id: u64) {
        lock(&self.series).remove(&id);
    }

    pub fn fail(&self, op: FailOn, fail: bool) {
        self.failures.set(op, fail);
    }

    pub fn deleted(&self) -> Vec<u64> {
        lock(&self.deleted).clone()
    }

    pub fn unmonitored(&self) -> Vec<u64> {
        lock(&self.unmonitored).clone()
    }
}

#[async_trait]
impl TvLibrary for FakeTvLibrary {
    fn source_name(&self) -> &str {
        "fake-tv"
    }

    async fn list_series(&self) -> Result<Vec<Series>, SourceError> {
        self.failures.check(FailOn::List)?;
        Ok(lock(&self.series).values().cloned().collect())
    }

    async fn get_series(&self, id: u64) -> Result<Option<Series>, SourceError> {
        self.failures.check(FailOn::Get)?;
        Ok(lock(&self.series).get(&id).cloned())
    }

    async fn delete_series(&self, id: u64, _delete_files: bool) -> Result<(), SourceError> {
        self.failures.check(FailOn::Delete)?;
        lock(&self.series).remove(&id);
        lock(&self.deleted).push(id);
        Ok(())
    }

    async fn unmonitor_series(&self, id: u64) -> Result<(), SourceError> {
        self.failures.check(FailOn::Unmonitor)?;
        if let Some(series) = lock(&self.series).get_mut(&id) {
            series.monitored = false;
        }
        lock(&self.unmonitored).push(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMovieLibrary {
    movies: Mutex<BTreeMap<u64, Movie>>,
    deleted: Mutex<Vec<u64>>,
    unmonitored: Mutex<Vec<u64>>,
    failures: Failures,
}

impl FakeMovieLibrary {
    pub fn new(movies: Vec<Movie>) -> Self {
        let fake = Self::default();
        for m in movies {
            fake.upsert(m);
        }
        fake
    }

    pub fn upsert(&self, movie: Movie) {
        lock(&self.movies).insert(movie.id, movie);
    }

    pub fn fail(&self, op: FailOn, fail: bool) {
        self.failures.set(op, fail);
    }

    pub fn deleted(&self) -> Vec<u64> {
        lock(&self.deleted).clone()
    }

    pub fn unmonitored(&self) -> Vec<u64> {
        lock(&self.unmonitored).clone()
    }
}

#[async_trait]
impl MovieLibrary for FakeMovieLibrary {
    fn source_name(&self) -> &str {
        "fake-movies"
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, SourceError> {
        self.failures.check(FailOn::List)?;
        Ok(lock(&self.movies).values().cloned().collect())
    }

    async fn get_movie(&self, id: u64) -> Result<Option<Movie>, SourceError> {
        self.failures.check(FailOn::Get)?;
        Ok(lock(&self.movies).get(&id).cloned())
    }

    async fn delete_movie(&self, id: u64, _delete_files: bool) -> Result<(), SourceError> {
        self.failures.check(FailOn::Delete)?;
        lock(&self.movies).remove(&id);
        lock(&self.deleted).push(id);
        Ok(())
    }

    async fn unmonitor_movie(&self, id: u64) -> Result<(), SourceError> {
        self.failures.check(FailOn::Unmonitor)?;
        if let Some(movie) = lock(&self.movies).get_mut(&id) {
            movie.monitored = false;
        }
        lock(&self.unmonitored).push(id);
        Ok(())
    }
}

/// Fake media-server catalog. Episodes are keyed by (series id, season number).
#[derive(Default)]
pub struct FakeCatalog {
    libraries: Mutex<Vec<CatalogLibrary>>,
    items: Mutex<BTreeMap<String, (CatalogKind, CatalogItem)>>,
    episodes: Mutex<HashMap<(String, u32), Vec<CatalogEpisode>>>,
    deleted: Mutex<Vec<String>>,
    failures: Failures,
}

impl FakeCatalog {
    pub fn new(libraries: Vec<CatalogLibrary>) -> Self {
        let fake = Self::default();
        *lock(&fake.libraries) = libraries;
        fake
    }

    pub fn add_item(&self, kind: CatalogKind, item: CatalogItem) {
        lock(&self.items).insert(item.id.clone(), (kind, item));
    }

    /// Register a season with `files` real episodes and `placeholders` virtual ones.
    pub fn add_season(&self, series_id: &str, season: u32, files: u32, placeholders: u32) {
        let episodes = (1..=files + placeholders)
            .map(|n| CatalogEpisode {
                id: format!("{}-{}-{}", series_id, season, n),
                number: Some(n),
                is_virtual: n > files,
            })
            .collect();
        lock(&self.episodes).insert((series_id.to_string(), season), episodes);
    }

    pub fn fail(&self, op: FailOn, fail: bool) {
        self.failures.set(op, fail);
    }

    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }
}

#[async_trait]
impl MediaCatalog for FakeCatalog {
    fn source_name(&self) -> &str {
        "fake-catalog"
    }

    async fn libraries(&self) -> Result<Vec<CatalogLibrary>, SourceError> {
        self.failures.check(FailOn::List)?;
        Ok(lock(&self.libraries).clone())
    }

    async fn items(
        &self,
        kind: CatalogKind,
        library_id: Option<&str>,
    ) -> Result<Vec<CatalogItem>, SourceError> {
        self.failures.check(FailOn::List)?;
        Ok(lock(&self.items)
            .values()
            .filter(|(k, _)| *k == kind)
            .filter(|(_, item)| library_id.is_none() || item.parent_id.as_deref() == library_id)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn get_item(&self, id: &str) -> Result<Option<CatalogItem>, SourceError> {
        self.failures.check(FailOn::Get)?;
        Ok(lock(&self.items).get(id).map(|(_, item)| item.clone()))
    }

    async fn seasons(&self, series_id: &str) -> Result<Vec<CatalogSeason>, SourceError> {
        self.failures.check(FailOn::Seasons)?;
        let mut numbers: Vec<u32> = lock(&self.episodes)
            .keys()
            .filter(|(id, _)| id == series_id)
            .map(|(_, season)| *season)
            .collect();
        numbers.sort_unstable();
        Ok(numbers
            .into_iter()
            .map(|number| CatalogSeason {
                id: format!("{}-s{}", series_id, number),
                number,
            })
            .collect())
    }

    async fn episodes(
        &self,
        series_id: &str,
        season_id: &str,
    ) -> Result<Vec<CatalogEpisode>, SourceError> {
        self.failures.check(FailOn::Seasons)?;
        let number = season_id
            .rsplit_once("-s")
            .and_then(|(_, n)| n.parse::<u32>().ok())
            .ok_or_else(|| SourceError::Decode(format!("unknown season id {}", season_id)))?;
        Ok(lock(&self.episodes)
            .get(&(series_id.to_string(), number))
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_item(&self, id: &str) -> Result<(), SourceError> {
        self.failures.check(FailOn::Delete)?;
        lock(&self.items).remove(id);
        lock(&self.deleted).push(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeWatchHistory {
    shows: Mutex<Vec<WatchedShow>>,
    movies: Mutex<Vec<WatchedMovie>>,
    progress: Mutex<HashMap<u64, ShowProgress>>,
    show_fetches: Mutex<usize>,
    ready_checks: Mutex<usize>,
    failures: Failures,
}

impl FakeWatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watched show with its progress, keyed by TVDB id.
    pub fn add_show(&self, tvdb_id: u32, title: &str, progress: ShowProgress) {
        let service_id = u64::from(tvdb_id) + 900_000;
        lock(&self.shows).push(WatchedShow {
            service_id,
            title: title.to_string(),
            tvdb_id: Some(tvdb_id),
            last_watched_at: None,
        });
        lock(&self.progress).insert(service_id, progress);
    }

    pub fn set_progress(&self, tvdb_id: u32, progress: ShowProgress) {
        lock(&self.progress).insert(u64::from(tvdb_id) + 900_000, progress);
    }

    pub fn add_movie(&self, movie: WatchedMovie) {
        lock(&self.movies).push(movie);
    }

    pub fn fail(&self, op: FailOn, fail: bool) {
        self.failures.set(op, fail);
    }

    pub fn show_fetches(&self) -> usize {
        *lock(&self.show_fetches)
    }

    pub fn ready_checks(&self) -> usize {
        *lock(&self.ready_checks)
    }
}

#[async_trait]
impl WatchHistorySource for FakeWatchHistory {
    fn source_name(&self) -> &str {
        "fake-history"
    }

    async fn ensure_ready(&self) -> Result<(), SourceError> {
        *lock(&self.ready_checks) += 1;
        self.failures.check(FailOn::Auth)
    }

    async fn watched_shows(&self) -> Result<Vec<WatchedShow>, SourceError> {
        self.failures.check(FailOn::List)?;
        *lock(&self.show_fetches) += 1;
        Ok(lock(&self.shows).clone())
    }

    async fn watched_movies(&self) -> Result<Vec<WatchedMovie>, SourceError> {
        self.failures.check(FailOn::List)?;
        Ok(lock(&self.movies).clone())
    }

    async fn show_progress(&self, show: &WatchedShow) -> Result<ShowProgress, SourceError> {
        self.failures.check(FailOn::Progress)?;
        Ok(lock(&self.progress)
            .get(&show.service_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Builders for test data with sensible defaults.
pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use media_retention_models::{
        CatalogItem, CatalogLibrary, Movie, MovieStatus, ProviderIds, SeasonFiles, SeasonProgress,
        Series, SeriesStatus, ShowProgress, WatchedMovie,
    };

    pub const GB: u64 = 1024 * 1024 * 1024;

    /// Monitored, ended series with the given `(season, files)` on disk.
    pub fn series(id: u64, title: &str, tvdb_id: u32, seasons: &[(u32, u32)]) -> Series {
        let files: u32 = seasons.iter().map(|(_, f)| f).sum();
        Series {
            id,
            title: title.to_string(),
            year: Some(2015),
            tvdb_id: Some(tvdb_id),
            monitored: true,
            status: SeriesStatus::Ended,
            episode_file_count: files,
            episode_count: files,
            size_on_disk: 2 * GB,
            seasons: seasons
                .iter()
                .map(|(number, file_count)| SeasonFiles { number: *number, file_count: *file_count })
                .collect(),
        }
    }

    /// Monitored, released movie with a file on disk.
    pub fn movie(id: u64, title: &str, tmdb_id: u32) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year: Some(1995),
            tmdb_id: Some(tmdb_id),
            monitored: true,
            has_file: true,
            status: MovieStatus::Released,
            size_on_disk: 8 * GB,
        }
    }

    pub fn watched_movie(tmdb_id: u32, title: &str, watched_at: DateTime<Utc>) -> WatchedMovie {
        WatchedMovie {
            service_id: u64::from(tmdb_id) + 500_000,
            title: title.to_string(),
            tmdb_id: Some(tmdb_id),
            last_watched_at: watched_at,
        }
    }

    /// Progress from `(season, aired, completed, announced total)` tuples.
    pub fn progress(seasons: &[(u32, u32, u32, Option<u32>)]) -> ShowProgress {
        ShowProgress {
            seasons: seasons
                .iter()
                .map(|(number, aired, completed, total)| SeasonProgress {
                    number: *number,
                    aired: *aired,
                    completed: *completed,
                    total: *total,
                })
                .collect(),
            next_episode: None,
        }
    }

    pub fn library(name: &str, id: &str, collection_type: Option<&str>) -> CatalogLibrary {
        CatalogLibrary {
            name: name.to_string(),
            id: id.to_string(),
            collection_type: collection_type.map(str::to_string),
        }
    }

    pub fn catalog_item(id: &str, name: &str, parent_id: &str, ids: ProviderIds) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: Some(parent_id.to_string()),
            provider_ids: ids,
            year: None,
            is_virtual: false,
            size: None,
        }
    }

    pub fn tvdb(id: u32) -> ProviderIds {
        ProviderIds { tvdb: Some(id), ..ProviderIds::default() }
    }

    pub fn tmdb(id: u32) -> ProviderIds {
        ProviderIds { tmdb: Some(id), ..ProviderIds::default() }
    }

    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }
}
