use crate::error::SourceError;
use crate::http;
use crate::traits::TvLibrary;
use async_trait::async_trait;
use media_retention_config::BackendConfig;
use media_retention_models::{SeasonFiles, Series, SeriesStatus};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeries {
    id: u64,
    title: String,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    tvdb_id: u32,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    statistics: SonarrStatistics,
    #[serde(default)]
    seasons: Vec<SonarrSeason>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrStatistics {
    #[serde(default)]
    episode_file_count: u32,
    #[serde(default)]
    episode_count: u32,
    #[serde(default)]
    size_on_disk: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeason {
    season_number: u32,
    #[serde(default)]
    statistics: Option<SonarrStatistics>,
}

impl From<SonarrSeries> for Series {
    fn from(raw: SonarrSeries) -> Self {
        Series {
            id: raw.id,
            title: raw.title,
            year: Some(raw.year).filter(|y| *y > 0),
            tvdb_id: Some(raw.tvdb_id).filter(|id| *id > 0),
            monitored: raw.monitored,
            status: SeriesStatus::from_api(&raw.status),
            episode_file_count: raw.statistics.episode_file_count,
            episode_count: raw.statistics.episode_count,
            size_on_disk: raw.statistics.size_on_disk,
            seasons: raw
                .seasons
                .into_iter()
                .map(|s| SeasonFiles {
                    number: s.season_number,
                    file_count: s.statistics.map(|st| st.episode_file_count).unwrap_or(0),
                })
                .collect(),
        }
    }
}

/// Sonarr API v3 client.
#[derive(Clone)]
pub struct SonarrClient {
    client: Client,
    api_url: String,
}

impl SonarrClient {
    pub fn new(config: &BackendConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(&[("x-api-key", config.api_key.as_str())])?,
            api_url: http::join_url(&config.base_url, "/api/v3"),
        })
    }

    fn series_url(&self, id: u64) -> String {
        format!("{}/series/{}", self.api_url, id)
    }
}

#[async_trait]
impl TvLibrary for SonarrClient {
    fn source_name(&self) -> &str {
        "sonarr"
    }

    async fn list_series(&self) -> Result<Vec<Series>, SourceError> {
        let raw: Vec<SonarrSeries> =
            http::json(self.client.get(format!("{}/series", self.api_url))).await?;
        debug!("Fetched {} series from Sonarr", raw.len());
        Ok(raw.into_iter().map(Series::from).collect())
    }

    async fn get_series(&self, id: u64) -> Result<Option<Series>, SourceError> {
        let raw: Option<SonarrSeries> =
            http::json_optional(self.client.get(self.series_url(id))).await?;
        Ok(raw.map(Series::from))
    }

    async fn delete_series(&self, id: u64, delete_files: bool) -> Result<(), SourceError> {
        let request = self.client.delete(self.series_url(id)).query(&[
            ("deleteFiles", delete_files.to_string()),
            ("addImportListExclusion", "false".to_string()),
        ]);
        http::delete_idempotent(request).await?;
        info!(series_id = id, delete_files, "Deleted series from Sonarr");
        Ok(())
    }

    async fn unmonitor_series(&self, id: u64) -> Result<(), SourceError> {
        // The PUT endpoint expects the full resource back
        let mut resource: serde_json::Value =
            http::json(self.client.get(self.series_url(id))).await?;
        resource["monitored"] = serde_json::Value::Bool(false);
        http::send(self.client.put(self.series_url(id)).json(&resource)).await?;
        debug!(series_id = id, "Unmonitored series in Sonarr");
        Ok(())
    }
}
