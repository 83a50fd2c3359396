use crate::error::SourceError;
use crate::http;
use crate::traits::MovieLibrary;
use async_trait::async_trait;
use media_retention_config::BackendConfig;
use media_retention_models::{Movie, MovieStatus};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovie {
    id: u64,
    title: String,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    tmdb_id: u32,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    has_file: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    size_on_disk: u64,
}

impl From<RadarrMovie> for Movie {
    fn from(raw: RadarrMovie) -> Self {
        Movie {
            id: raw.id,
            title: raw.title,
            year: Some(raw.year).filter(|y| *y > 0),
            tmdb_id: Some(raw.tmdb_id).filter(|id| *id > 0),
            monitored: raw.monitored,
            has_file: raw.has_file,
            status: MovieStatus::from_api(&raw.status),
            size_on_disk: raw.size_on_disk,
        }
    }
}

/// Radarr API v3 client.
#[derive(Clone)]
pub struct RadarrClient {
    client: Client,
    api_url: String,
}

impl RadarrClient {
    pub fn new(config: &BackendConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(&[("x-api-key", config.api_key.as_str())])?,
            api_url: http::join_url(&config.base_url, "/api/v3"),
        })
    }

    fn movie_url(&self, id: u64) -> String {
        format!("{}/movie/{}", self.api_url, id)
    }
}

#[async_trait]
impl MovieLibrary for RadarrClient {
    fn source_name(&self) -> &str {
        "radarr"
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, SourceError> {
        let raw: Vec<RadarrMovie> =
            http::json(self.client.get(format!("{}/movie", self.api_url))).await?;
        debug!("Fetched {} movies from Radarr", raw.len());
        Ok(raw.into_iter().map(Movie::from).collect())
    }

    async fn get_movie(&self, id: u64) -> Result<Option<Movie>, SourceError> {
        let raw: Option<RadarrMovie> =
            http::json_optional(self.client.get(self.movie_url(id))).await?;
        Ok(raw.map(Movie::from))
    }

    async fn delete_movie(&self, id: u64, delete_files: bool) -> Result<(), SourceError> {
        let request = self.client.delete(self.movie_url(id)).query(&[
            ("deleteFiles", delete_files.to_string()),
            ("addImportExclusion", "false".to_string()),
        ]);
        http::delete_idempotent(request).await?;
        info!(movie_id = id, delete_files, "Deleted movie from Radarr");
        Ok(())
    }

    async fn unmonitor_movie(&self, id: u64) -> Result<(), SourceError> {
        let mut resource: serde_json::Value =
            http::json(self.client.get(self.movie_url(id))).await?;
        resource["monitored"] = serde_json::Value::Bool(false);
        http::send(self.client.put(self.movie_url(id)).json(&resource)).await?;
        debug!(movie_id = id, "Unmonitored movie in Radarr");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_mapping() {
        let json = r#"{
            "id": 7,
            "title": "Dune: Part Three",
            "year": 2026,
            "tmdbId": 1170608,
            "monitored": true,
            "hasFile": false,
            "status": "announced",
            "sizeOnDisk": 0
        }"#;
        let movie = Movie::from(serde_json::from_str::<RadarrMovie>(json).unwrap());
        assert_eq!(movie.tmdb_id, Some(1170608));
        assert!(movie.status.is_unreleased());
        assert!(!movie.has_file);
    }
}
