use crate::error::SourceError;
use crate::http;
use crate::traits::MediaCatalog;
use async_trait::async_trait;
use media_retention_config::BackendConfig;
use media_retention_models::{
    CatalogEpisode, CatalogItem, CatalogKind, CatalogLibrary, CatalogSeason, ProviderIds,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

const ITEM_FIELDS: &str = "ProviderIds,Path,ParentId,ProductionYear,LocationType,MediaSources";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<EmbyItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    provider_ids: EmbyProviderIds,
    #[serde(default)]
    index_number: Option<u32>,
    #[serde(default)]
    location_type: Option<String>,
    #[serde(default)]
    production_year: Option<u32>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    media_sources: Vec<EmbyMediaSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyMediaSource {
    #[serde(default)]
    size: Option<u64>,
}

impl EmbyItem {
    fn is_virtual(&self) -> bool {
        self.location_type.as_deref() == Some("Virtual")
    }

    /// Item size, or the sum of its media sources when only those carry one.
    fn size_on_disk(&self) -> Option<u64> {
        self.size.filter(|s| *s > 0).or_else(|| {
            let total: u64 = self.media_sources.iter().filter_map(|m| m.size).sum();
            Some(total).filter(|t| *t > 0)
        })
    }
}

/// Emby reports provider ids as strings, with inconsistent key casing.
#[derive(Debug, Default, Deserialize)]
struct EmbyProviderIds {
    #[serde(default, alias = "Tvdb", alias = "TVDB")]
    tvdb: Option<String>,
    #[serde(default, alias = "Tmdb", alias = "TMDB")]
    tmdb: Option<String>,
    #[serde(default, alias = "Imdb", alias = "IMDB")]
    imdb: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VirtualFolder {
    name: String,
    item_id: String,
    #[serde(default)]
    collection_type: Option<String>,
}

/// Parse a numeric provider id; empty, zero and garbage values are absent.
pub fn parse_provider_id(value: Option<&str>) -> Option<u32> {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|id| *id > 0)
}

impl From<EmbyItem> for CatalogItem {
    fn from(raw: EmbyItem) -> Self {
        let is_virtual = raw.is_virtual();
        let size = raw.size_on_disk();
        CatalogItem {
            provider_ids: ProviderIds {
                tvdb: parse_provider_id(raw.provider_ids.tvdb.as_deref()),
                tmdb: parse_provider_id(raw.provider_ids.tmdb.as_deref()),
                imdb: raw.provider_ids.imdb.filter(|s| !s.is_empty()),
            },
            id: raw.id,
            name: raw.name,
            parent_id: raw.parent_id.filter(|p| !p.is_empty()),
            year: raw.production_year.filter(|y| *y > 0),
            is_virtual,
            size,
        }
    }
}

/// Emby server client. Authenticates with the `api_key` query parameter.
#[derive(Clone)]
pub struct EmbyClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl EmbyClient {
    pub fn new(config: &BackendConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(&[])?,
            api_url: http::join_url(&config.base_url, "/emby"),
            api_key: config.api_key.clone(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_url, path))
            .query(&[("api_key", self.api_key.as_str())])
    }
}

#[async_trait]
impl MediaCatalog for EmbyClient {
    fn source_name(&self) -> &str {
        "emby"
    }

    async fn libraries(&self) -> Result<Vec<CatalogLibrary>, SourceError> {
        let folders: Vec<VirtualFolder> = http::json(self.get("/Library/VirtualFolders")).await?;
        Ok(folders
            .into_iter()
            .map(|f| CatalogLibrary {
                name: f.name,
                id: f.item_id,
                collection_type: f.collection_type.filter(|c| !c.is_empty()),
            })
            .collect())
    }

    async fn items(
        &self,
        kind: CatalogKind,
        library_id: Option<&str>,
    ) -> Result<Vec<CatalogItem>, SourceError> {
        let mut request = self.get("/Items").query(&[
            ("IncludeItemTypes", kind.item_type()),
            ("Recursive", "true"),
            ("Fields", ITEM_FIELDS),
        ]);
        if let Some(library_id) = library_id {
            request = request.query(&[("ParentId", library_id)]);
        }

        let response: ItemsResponse = http::json(request).await?;
        debug!(
            kind = kind.item_type(),
            library_id = library_id.unwrap_or("*"),
            "Fetched {} items from Emby",
            response.items.len()
        );
        Ok(response.items.into_iter().map(CatalogItem::from).collect())
    }

    async fn get_item(&self, id: &str) -> Result<Option<CatalogItem>, SourceError> {
        let request = self.get("/Items").query(&[
            ("Ids", id),
            ("Recursive", "true"),
            ("Fields", ITEM_FIELDS),
        ]);
        let response: Option<ItemsResponse> = http::json_optional(request).await?;
        Ok(response
            .and_then(|r| r.items.into_iter().find(|item| item.id == id))
            .map(CatalogItem::from))
    }

    async fn seasons(&self, series_id: &str) -> Result<Vec<CatalogSeason>, SourceError> {
        let response: ItemsResponse =
            http::json(self.get(&format!("/Shows/{}/Seasons", series_id))).await?;
        Ok(response
            .items
            .into_iter()
            .map(|s| CatalogSeason {
                id: s.id,
                number: s.index_number.unwrap_or(0),
            })
            .collect())
    }

    async fn episodes(
        &self,
        series_id: &str,
        season_id: &str,
    ) -> Result<Vec<CatalogEpisode>, SourceError> {
        let request = self
            .get(&format!("/Shows/{}/Episodes", series_id))
            .query(&[("SeasonId", season_id), ("Fields", "LocationType")]);
        let response: ItemsResponse = http::json(request).await?;
        Ok(response
            .items
            .into_iter()
            .map(|e| CatalogEpisode {
                is_virtual: e.is_virtual(),
                id: e.id,
                number: e.index_number,
            })
            .collect())
    }

    async fn delete_item(&self, id: &str) -> Result<(), SourceError> {
        let request = self
            .client
            .delete(format!("{}/Items/{}", self.api_url, id))
            .query(&[("api_key", self.api_key.as_str())]);
        http::delete_idempotent(request).await?;
        info!(item_id = id, "Deleted item from Emby");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_id() {
        assert_eq!(parse_provider_id(Some("81189")), Some(81189));
        assert_eq!(parse_provider_id(Some(" 42 ")), Some(42));
        assert_eq!(parse_provider_id(Some("")), None);
        assert_eq!(parse_provider_id(Some("0")), None);
        assert_eq!(parse_provider_id(Some("tt0903747")), None);
        assert_eq!(parse_provider_id(None), None);
    }

    #[test]
    fn test_item_mapping() {
        let json = r#"{
            "Items": [
                {"Id": "1001", "Name": "Breaking Bad", "ParentId": "7",
                 "ProviderIds": {"Tvdb": "81189", "Imdb": "tt0903747"}, "ProductionYear": 2008},
                {"Id": "1002", "Name": "Unknown Show", "ProviderIds": {}}
            ],
            "TotalRecordCount": 2
        }"#;
        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        let items: Vec<CatalogItem> = response.items.into_iter().map(CatalogItem::from).collect();

        assert_eq!(items[0].provider_ids.cross_ref(CatalogKind::Series), Some(81189));
        assert_eq!(items[0].parent_id.as_deref(), Some("7"));
        assert_eq!(items[0].year, Some(2008));
        assert_eq!(items[1].provider_ids, ProviderIds::default());
        assert_eq!(items[1].parent_id, None);
        assert!(!items[0].is_virtual);
    }

    #[test]
    fn test_item_size_and_placeholder_movie() {
        let json = r#"{"Items": [
            {"Id": "1", "Name": "Heat", "LocationType": "FileSystem",
             "MediaSources": [{"Size": 3000}, {"Size": 1000}]},
            {"Id": "2", "Name": "Dune", "LocationType": "FileSystem", "Size": 5000},
            {"Id": "3", "Name": "Sequel", "LocationType": "Virtual", "MediaSources": []}
        ]}"#;
        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        let items: Vec<CatalogItem> = response.items.into_iter().map(CatalogItem::from).collect();

        assert_eq!(items[0].size, Some(4000));
        assert_eq!(items[1].size, Some(5000));
        assert_eq!(items[2].size, None);
        assert!(items[2].is_virtual);
    }

    #[test]
    fn test_virtual_episode_detection() {
        let json = r#"{"Items": [
            {"Id": "1", "IndexNumber": 1, "LocationType": "FileSystem"},
            {"Id": "2", "IndexNumber": 2, "LocationType": "Virtual"}
        ]}"#;
        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        let virtual_flags: Vec<bool> = response.items.iter().map(EmbyItem::is_virtual).collect();
        assert_eq!(virtual_flags, vec![false, true]);
    }
}
