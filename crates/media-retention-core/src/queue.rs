use chrono::{DateTime, Utc};
use media_retention_config::PathManager;
use media_retention_models::{MediaType, QueueItem};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Persistent delay queue for one media type.
///
/// Every mutation rewrites the whole file while the write lock is held. Save
/// failures are logged and the in-memory state stays authoritative.
pub struct Queue {
    media_type: MediaType,
    path: Option<PathBuf>,
    items: RwLock<BTreeMap<u64, QueueItem>>,
}

impl Queue {
    /// Load the queue file; a missing or unreadable file yields an empty queue.
    pub fn open(media_type: MediaType, path: PathBuf) -> Self {
        let items = load_items(media_type, &path);
        Self {
            media_type,
            path: Some(path),
            items: RwLock::new(items),
        }
    }

    pub fn in_memory(media_type: MediaType) -> Self {
        Self {
            media_type,
            path: None,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Insert the item unless its id is already queued. The original
    /// `marked_at` always wins.
    pub fn add(&self, item: QueueItem) -> bool {
        let mut items = self.write();
        if items.contains_key(&item.id) {
            return false;
        }
        debug!(
            media_type = %self.media_type,
            id = item.id,
            title = %item.title,
            "Added to removal queue"
        );
        items.insert(item.id, item);
        self.persist(&items);
        true
    }

    pub fn remove(&self, id: u64) -> Option<QueueItem> {
        let mut items = self.write();
        let removed = items.remove(&id);
        if removed.is_some() {
            self.persist(&items);
        }
        removed
    }

    pub fn get(&self, id: u64) -> Option<QueueItem> {
        self.read().get(&id).cloned()
    }

    pub fn is_queued(&self, id: u64) -> bool {
        self.read().contains_key(&id)
    }

    /// All items, oldest first.
    pub fn all(&self) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self.read().values().cloned().collect();
        items.sort_by(|a, b| a.marked_at.cmp(&b.marked_at).then(a.id.cmp(&b.id)));
        items
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Items whose probation period has fully elapsed. Does not mutate.
    pub fn ready_for_removal(&self, delay_days: u32, now: DateTime<Utc>) -> Vec<QueueItem> {
        self.all()
            .into_iter()
            .filter(|item| item.is_ready(delay_days, now))
            .collect()
    }

    pub fn is_ready_for_removal(&self, id: u64, delay_days: u32, now: DateTime<Utc>) -> bool {
        self.read()
            .get(&id)
            .map(|item| item.is_ready(delay_days, now))
            .unwrap_or(false)
    }

    pub fn mark_unmonitored(&self, id: u64) -> bool {
        let mut items = self.write();
        match items.get_mut(&id) {
            Some(item) if !item.unmonitored => {
                item.unmonitored = true;
                self.persist(&items);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Drop every item, returning how many were queued.
    pub fn clear(&self) -> usize {
        let mut items = self.write();
        let count = items.len();
        items.clear();
        self.persist(&items);
        count
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<u64, QueueItem>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<u64, QueueItem>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, items: &BTreeMap<u64, QueueItem>) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = save_items(path, items) {
            warn!(
                operation = "queue_save",
                media_type = %self.media_type,
                path = %path.display(),
                error = %e,
                "Failed to save removal queue, keeping in-memory state"
            );
        }
    }
}

fn load_items(media_type: MediaType, path: &Path) -> BTreeMap<u64, QueueItem> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(media_type = %media_type, "Queue file does not exist, starting empty");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(
                media_type = %media_type,
                path = %path.display(),
                error = %e,
                "Failed to read queue file, starting empty"
            );
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<Vec<QueueItem>>(&content) {
        Ok(items) => {
            info!(media_type = %media_type, "Loaded {} queued items", items.len());
            items.into_iter().map(|item| (item.id, item)).collect()
        }
        Err(e) => {
            // Keep the unreadable file around for inspection
            let backup_path = path.with_extension("json.bak");
            match std::fs::copy(path, &backup_path) {
                Ok(_) => warn!(
                    media_type = %media_type,
                    error = %e,
                    "Queue file is corrupt. Backed up to {:?} and starting empty",
                    backup_path
                ),
                Err(backup_err) => warn!(
                    media_type = %media_type,
                    error = %e,
                    "Queue file is corrupt and backup failed ({}). Starting empty",
                    backup_err
                ),
            }
            BTreeMap::new()
        }
    }
}

fn save_items(path: &Path, items: &BTreeMap<u64, QueueItem>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let list: Vec<&QueueItem> = items.values().collect();
    let json = serde_json::to_string_pretty(&list)?;

    // Atomic write: write to temp file, then rename
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, json)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// One independently persisted queue per media type.
pub struct QueueSet {
    series: Queue,
    movie: Queue,
    emby_series: Queue,
    emby_movie: Queue,
}

impl QueueSet {
    pub fn open(paths: &PathManager) -> Self {
        let open = |media_type| Queue::open(media_type, paths.queue_file(media_type));
        Self {
            series: open(MediaType::Series),
            movie: open(MediaType::Movie),
            emby_series: open(MediaType::EmbySeries),
            emby_movie: open(MediaType::EmbyMovie),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            series: Queue::in_memory(MediaType::Series),
            movie: Queue::in_memory(MediaType::Movie),
            emby_series: Queue::in_memory(MediaType::EmbySeries),
            emby_movie: Queue::in_memory(MediaType::EmbyMovie),
        }
    }

    pub fn get(&self, media_type: MediaType) -> &Queue {
        match media_type {
            MediaType::Series => &self.series,
            MediaType::Movie => &self.movie,
            MediaType::EmbySeries => &self.emby_series,
            MediaType::EmbyMovie => &self.emby_movie,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Queue> {
        MediaType::ALL.into_iter().map(move |media_type| self.get(media_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn item(id: u64, marked_at: DateTime<Utc>) -> QueueItem {
        QueueItem {
            id,
            external_id: Some(id as u32 + 1000),
            title: format!("Show {}", id),
            marked_at,
            reason: "fully watched (S01)".to_string(),
            size_on_disk: 1024,
            unmonitored: false,
        }
    }

    #[test]
    fn test_add_preserves_original_marked_at() {
        let queue = Queue::in_memory(MediaType::Series);
        let now = Utc::now();
        let first = now - Duration::days(3);

        assert!(queue.add(item(1, first)));
        assert!(!queue.add(item(1, now)));
        assert_eq!(queue.get(1).unwrap().marked_at, first);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_ready_for_removal_boundary() {
        let queue = Queue::in_memory(MediaType::Movie);
        let now = Utc::now();
        queue.add(item(1, now - Duration::days(7)));
        queue.add(item(2, now - Duration::days(7) + Duration::seconds(1)));
        queue.add(item(3, now - Duration::days(30)));

        let ready: Vec<u64> = queue.ready_for_removal(7, now).iter().map(|i| i.id).collect();
        assert_eq!(ready, vec![3, 1]);
        assert!(queue.is_ready_for_removal(1, 7, now));
        assert!(!queue.is_ready_for_removal(2, 7, now));
        assert!(!queue.is_ready_for_removal(99, 7, now));
        // Pure read
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue_series.json");
        let marked_at = Utc::now() - Duration::days(2);

        {
            let queue = Queue::open(MediaType::Series, path.clone());
            queue.add(item(1, marked_at));
            queue.add(item(2, marked_at));
            queue.mark_unmonitored(1);
            queue.remove(2);
        }

        let reopened = Queue::open(MediaType::Series, path.clone());
        let all = reopened.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].marked_at, marked_at);
        assert!(all[0].unmonitored);

        // Whole queue is a plain JSON array
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.is_array());
    }

    #[test]
    fn test_corrupt_file_starts_empty_and_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue_movie.json");
        std::fs::write(&path, "{ not json").unwrap();

        let queue = Queue::open(MediaType::Movie, path.clone());
        assert!(queue.is_empty());
        assert!(path.with_extension("json.bak").exists());

        queue.add(item(5, Utc::now()));
        assert_eq!(Queue::open(MediaType::Movie, path).len(), 1);
    }

    #[test]
    fn test_missing_file_is_empty_queue() {
        let dir = TempDir::new().unwrap();
        let queue = Queue::open(MediaType::EmbySeries, dir.path().join("nope.json"));
        assert!(queue.is_empty());
        assert!(!queue.mark_unmonitored(1));
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes every save fail
        let path = dir.path().join("queue_series.json");
        std::fs::create_dir_all(&path).unwrap();

        let queue = Queue::open(MediaType::Series, path);
        assert!(queue.add(item(1, Utc::now())));
        assert!(queue.is_queued(1));
    }

    #[test]
    fn test_queue_set_files_are_disjoint() {
        let dir = TempDir::new().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        let set = QueueSet::open(&paths);

        set.get(MediaType::Series).add(item(1, Utc::now()));
        set.get(MediaType::EmbySeries).add(item(1, Utc::now()));
        assert_eq!(set.get(MediaType::Series).len(), 1);
        assert_eq!(set.get(MediaType::Movie).len(), 0);

        assert!(paths.queue_file(MediaType::Series).exists());
        assert!(paths.queue_file(MediaType::EmbySeries).exists());
        assert!(!paths.queue_file(MediaType::Movie).exists());
        assert_eq!(set.iter().map(|q| q.len()).sum::<usize>(), 2);
    }
}
