use crate::library_filter::{filter_by_library, is_in_excluded_library, resolve_excluded_library_ids};
use crate::policy::{Candidate, Eligibility, RetentionBackend};
use async_trait::async_trait;
use media_retention_models::{CatalogItem, CatalogKind, MediaType, QueueItem, SeasonFiles};
use media_retention_sources::{MediaCatalog, SourceError};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Retention backend over catalog items that the authoritative backend no
/// longer knows about.
///
/// Must only be built from a successfully fetched authoritative id set; an
/// empty set here means "every catalog item is an orphan".
pub struct OrphanBackend {
    catalog: Arc<dyn MediaCatalog>,
    kind: CatalogKind,
    authoritative: HashSet<u32>,
    excluded_library_names: Vec<String>,
    excluded_library_ids: RwLock<HashSet<String>>,
}

impl OrphanBackend {
    pub fn new(
        catalog: Arc<dyn MediaCatalog>,
        kind: CatalogKind,
        authoritative: HashSet<u32>,
        excluded_library_names: Vec<String>,
    ) -> Self {
        Self {
            catalog,
            kind,
            authoritative,
            excluded_library_names,
            excluded_library_ids: RwLock::new(HashSet::new()),
        }
    }

    fn excluded_ids(&self) -> HashSet<String> {
        self.excluded_library_ids
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Items of this kind across all matching libraries, de-duplicated and
    /// with excluded libraries removed.
    async fn scoped_items(&self) -> Result<Vec<CatalogItem>, SourceError> {
        let libraries = self.catalog.libraries().await?;
        let excluded = resolve_excluded_library_ids(&self.excluded_library_names, &libraries);
        *self
            .excluded_library_ids
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = excluded.clone();

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for library in &libraries {
            if excluded.contains(&library.id) {
                debug!(library = %library.name, "Skipping excluded library");
                continue;
            }
            match library.collection_type.as_deref() {
                Some(collection) if collection == self.kind.collection_type() => {}
                other => {
                    debug!(
                        library = %library.name,
                        collection_type = other.unwrap_or("mixed"),
                        wanted = self.kind.collection_type(),
                        "Library content type not supported for this pass, skipping"
                    );
                    continue;
                }
            }

            let library_items = self.catalog.items(self.kind, Some(&library.id)).await?;
            for item in filter_by_library(library_items, &excluded) {
                if seen.insert(item.id.clone()) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }

    fn media_type_for(kind: CatalogKind) -> MediaType {
        match kind {
            CatalogKind::Series => MediaType::EmbySeries,
            CatalogKind::Movie => MediaType::EmbyMovie,
        }
    }
}

#[async_trait]
impl RetentionBackend for OrphanBackend {
    fn media_type(&self) -> MediaType {
        Self::media_type_for(self.kind)
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError> {
        let items = self.scoped_items().await?;
        let total = items.len();

        let mut orphans = Vec::new();
        for item in items {
            let Some(cross_ref) = item.provider_ids.cross_ref(self.kind) else {
                warn!(
                    media_type = %self.media_type(),
                    title = %item.name,
                    "Catalog item has no provider id, skipping"
                );
                continue;
            };
            if self.authoritative.contains(&cross_ref) {
                continue;
            }
            let Ok(id) = item.id.parse::<u64>() else {
                warn!(
                    media_type = %self.media_type(),
                    title = %item.name,
                    item_id = %item.id,
                    "Catalog item has a non-numeric id, skipping"
                );
                continue;
            };
            // Placeholders for announced titles have nothing on disk to remove
            let eligibility = if item.is_virtual {
                Eligibility::NoFile
            } else {
                Eligibility::Eligible
            };
            orphans.push(Candidate {
                id,
                external_id: Some(cross_ref),
                title: item.name,
                year: item.year,
                size_on_disk: item.size.unwrap_or(0),
                eligibility,
                seasons: Vec::new(),
            });
        }

        info!(
            media_type = %self.media_type(),
            catalog_items = total,
            orphans = orphans.len(),
            "Found orphan catalog items"
        );
        Ok(orphans)
    }

    async fn on_disk_seasons(&self, candidate: &Candidate) -> Result<Vec<SeasonFiles>, SourceError> {
        if self.kind != CatalogKind::Series {
            return Ok(Vec::new());
        }

        let series_id = candidate.id.to_string();
        let mut on_disk = Vec::new();
        for season in self.catalog.seasons(&series_id).await? {
            if season.number == 0 {
                continue;
            }
            let episodes = self.catalog.episodes(&series_id, &season.id).await?;
            let file_count = episodes.iter().filter(|e| !e.is_virtual).count() as u32;
            if file_count > 0 {
                on_disk.push(SeasonFiles {
                    number: season.number,
                    file_count,
                });
            }
        }
        Ok(on_disk)
    }

    async fn still_present(&self, item: &QueueItem) -> Result<bool, SourceError> {
        let Some(current) = self.catalog.get_item(&item.id.to_string()).await? else {
            return Ok(false);
        };
        if is_in_excluded_library(&current, &self.excluded_ids()) {
            info!(title = %item.title, "Catalog item is now in an excluded library");
            return Ok(false);
        }
        if let Some(cross_ref) = current.provider_ids.cross_ref(self.kind) {
            if self.authoritative.contains(&cross_ref) {
                info!(title = %item.title, "Catalog item is tracked by its backend again");
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn unmonitor(&self, _id: u64) -> Result<bool, SourceError> {
        Ok(false)
    }

    async fn delete(&self, item: &QueueItem) -> Result<(), SourceError> {
        self.catalog.delete_item(&item.id.to_string()).await
    }
}
