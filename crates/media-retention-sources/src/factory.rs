//! Builds the configured upstream clients.
//!
//! Disabled or missing sections yield `None`; the engine treats a missing
//! backend as "no authoritative data" and skips the dependent passes.

use crate::emby::EmbyClient;
use crate::error::SourceError;
use crate::radarr::RadarrClient;
use crate::sonarr::SonarrClient;
use crate::traits::{MediaCatalog, MovieLibrary, TvLibrary, WatchHistorySource};
use crate::trakt::TraktClient;
use media_retention_config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ClientSet {
    pub tv: Option<Arc<dyn TvLibrary>>,
    pub movies: Option<Arc<dyn MovieLibrary>>,
    pub catalog: Option<Arc<dyn MediaCatalog>>,
    pub history: Arc<dyn WatchHistorySource>,
}

impl ClientSet {
    /// `credentials_file` holds the Trakt login written by `afterwatch config trakt`.
    pub fn from_config(config: &Config, credentials_file: PathBuf) -> Result<Self, SourceError> {
        let tv = match config.sonarr() {
            Some(c) => Some(Arc::new(SonarrClient::new(c)?) as Arc<dyn TvLibrary>),
            None => None,
        };
        let movies = match config.radarr() {
            Some(c) => Some(Arc::new(RadarrClient::new(c)?) as Arc<dyn MovieLibrary>),
            None => None,
        };
        let catalog = match config.emby() {
            Some(c) => Some(Arc::new(EmbyClient::new(c)?) as Arc<dyn MediaCatalog>),
            None => None,
        };
        let history: Arc<dyn WatchHistorySource> =
            Arc::new(TraktClient::new(&config.trakt, credentials_file)?);

        let set = Self { tv, movies, catalog, history };
        info!(
            operation = "create_clients",
            sources = ?set.source_names(),
            "Created upstream clients"
        );
        Ok(set)
    }

    pub fn source_names(&self) -> Vec<&str> {
        let mut names = vec![self.history.source_name()];
        if let Some(tv) = &self.tv {
            names.push(tv.source_name());
        }
        if let Some(movies) = &self.movies {
            names.push(movies.source_name());
        }
        if let Some(catalog) = &self.catalog {
            names.push(catalog.source_name());
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_retention_config::BackendConfig;

    fn config() -> Config {
        let mut config = Config::template();
        config.trakt.client_id = "client".to_string();
        config.trakt.access_token = "token".to_string();
        config.sonarr = Some(BackendConfig {
            enabled: true,
            base_url: "http://sonarr:8989".to_string(),
            api_key: "key".to_string(),
        });
        config.radarr = None;
        config.emby.as_mut().unwrap().enabled = false;
        config
    }

    #[test]
    fn test_only_enabled_clients_are_built() {
        let dir = tempfile::tempdir().unwrap();
        let set = ClientSet::from_config(&config(), dir.path().join("credentials.toml")).unwrap();
        assert!(set.tv.is_some());
        assert!(set.movies.is_none());
        assert!(set.catalog.is_none());
        assert_eq!(set.source_names(), vec!["trakt", "sonarr"]);
    }
}
