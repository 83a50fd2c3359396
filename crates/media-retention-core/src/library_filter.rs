use media_retention_models::{CatalogItem, CatalogLibrary};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Map configured library names to catalog library ids (case-insensitive).
///
/// A name with no matching library is logged and ignored so a typo never
/// aborts a cycle.
pub fn resolve_excluded_library_ids(
    configured_names: &[String],
    libraries: &[CatalogLibrary],
) -> HashSet<String> {
    if configured_names.is_empty() {
        return HashSet::new();
    }

    let by_name: HashMap<String, &str> = libraries
        .iter()
        .map(|lib| (lib.name.to_lowercase(), lib.id.as_str()))
        .collect();

    let mut excluded = HashSet::with_capacity(configured_names.len());
    for name in configured_names {
        match by_name.get(&name.to_lowercase()) {
            Some(id) => {
                info!(library = %name, library_id = %id, "Excluding catalog library from cleanup");
                excluded.insert((*id).to_string());
            }
            None => {
                warn!(library = %name, "Excluded library not found in catalog, check spelling");
            }
        }
    }
    excluded
}

/// Drop items whose parent library is excluded, preserving order.
pub fn filter_by_library(items: Vec<CatalogItem>, excluded_ids: &HashSet<String>) -> Vec<CatalogItem> {
    if excluded_ids.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| !is_in_excluded_library(item, excluded_ids))
        .collect()
}

pub fn is_in_excluded_library(item: &CatalogItem, excluded_ids: &HashSet<String>) -> bool {
    item.parent_id
        .as_ref()
        .map(|parent| excluded_ids.contains(parent))
        .unwrap_or(false)
}
