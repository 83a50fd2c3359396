use serde::{Deserialize, Serialize};

/// Content shape requested from the media-server catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Series,
    Movie,
}

impl CatalogKind {
    /// Library collection type that holds this kind of item.
    pub fn collection_type(self) -> &'static str {
        match self {
            CatalogKind::Series => "tvshows",
            CatalogKind::Movie => "movies",
        }
    }

    pub fn item_type(self) -> &'static str {
        match self {
            CatalogKind::Series => "Series",
            CatalogKind::Movie => "Movie",
        }
    }
}

/// A top-level library (virtual folder) of the media server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogLibrary {
    pub name: String,
    pub id: String,
    pub collection_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    /// Library (or folder) the item belongs to.
    pub parent_id: Option<String>,
    pub provider_ids: ProviderIds,
    pub year: Option<u32>,
    /// Known to the server without a file on disk.
    #[serde(default)]
    pub is_virtual: bool,
    /// Bytes on disk, when the server reports them.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Third-party ids embedded in catalog metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderIds {
    pub tvdb: Option<u32>,
    pub tmdb: Option<u32>,
    pub imdb: Option<String>,
}

impl ProviderIds {
    /// Cross-reference id used to correlate this kind of item.
    pub fn cross_ref(&self, kind: CatalogKind) -> Option<u32> {
        match kind {
            CatalogKind::Series => self.tvdb,
            CatalogKind::Movie => self.tmdb,
        }
        .filter(|id| *id > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogSeason {
    pub id: String,
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEpisode {
    pub id: String,
    pub number: Option<u32>,
    /// Placeholder entry for a known episode without a physical file.
    pub is_virtual: bool,
}
