use crate::error::SourceError;
use async_trait::async_trait;
use media_retention_models::{
    CatalogEpisode, CatalogItem, CatalogKind, CatalogLibrary, CatalogSeason, Movie, Series,
    ShowProgress, WatchedMovie, WatchedShow,
};

/// Authoritative TV backend (Sonarr).
#[async_trait]
pub trait TvLibrary: Send + Sync {
    fn source_name(&self) -> &str;

    async fn list_series(&self) -> Result<Vec<Series>, SourceError>;

    /// `None` when the series no longer exists.
    async fn get_series(&self, id: u64) -> Result<Option<Series>, SourceError>;

    /// A 404 from the backend is reported as success.
    async fn delete_series(&self, id: u64, delete_files: bool) -> Result<(), SourceError>;

    /// Stop further acquisition without touching files.
    async fn unmonitor_series(&self, id: u64) -> Result<(), SourceError>;
}

/// Authoritative movie backend (Radarr).
#[async_trait]
pub trait MovieLibrary: Send + Sync {
    fn source_name(&self) -> &str;

    async fn list_movies(&self) -> Result<Vec<Movie>, SourceError>;
    async fn get_movie(&self, id: u64) -> Result<Option<Movie>, SourceError>;
    async fn delete_movie(&self, id: u64, delete_files: bool) -> Result<(), SourceError>;
    async fn unmonitor_movie(&self, id: u64) -> Result<(), SourceError>;
}

/// Media-server catalog (Emby). Holds no monitoring state.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    fn source_name(&self) -> &str;

    async fn libraries(&self) -> Result<Vec<CatalogLibrary>, SourceError>;

    /// Items of one kind, optionally restricted to a library.
    async fn items(
        &self,
        kind: CatalogKind,
        library_id: Option<&str>,
    ) -> Result<Vec<CatalogItem>, SourceError>;

    async fn get_item(&self, id: &str) -> Result<Option<CatalogItem>, SourceError>;
    async fn seasons(&self, series_id: &str) -> Result<Vec<CatalogSeason>, SourceError>;
    async fn episodes(
        &self,
        series_id: &str,
        season_id: &str,
    ) -> Result<Vec<CatalogEpisode>, SourceError>;

    /// A 404 from the server is reported as success.
    async fn delete_item(&self, id: &str) -> Result<(), SourceError>;
}

/// Watch-history service (Trakt). Read-only.
#[async_trait]
pub trait WatchHistorySource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Make sure credentials are usable for the coming cycle, refreshing them if needed.
    async fn ensure_ready(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn watched_shows(&self) -> Result<Vec<WatchedShow>, SourceError>;
    async fn watched_movies(&self) -> Result<Vec<WatchedMovie>, SourceError>;

    /// Per-season completion merged with announced episode totals.
    async fn show_progress(&self, show: &WatchedShow) -> Result<ShowProgress, SourceError>;
}
