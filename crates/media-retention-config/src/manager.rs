use crate::config::Config;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Holds the active configuration and swaps it when the file on disk changes.
///
/// Readers take a cheap `Arc` snapshot with [`ConfigManager::current`]; a
/// reload that fails to parse or validate leaves the snapshot untouched.
pub struct ConfigManager {
    path: Option<PathBuf>,
    current: RwLock<Arc<Config>>,
    last_modified: Mutex<Option<SystemTime>>,
}

impl ConfigManager {
    /// Load and validate the config file.
    pub fn load(path: PathBuf) -> Result<Self> {
        let config = Config::load_from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e))?;
        config.validate()?;
        let modified = modified_time(&path);

        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(config)),
            last_modified: Mutex::new(modified),
        })
    }

    /// A manager that never reloads, for one-shot commands and tests.
    pub fn fixed(config: Config) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(config)),
            last_modified: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Arc<Config> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-read the file if its modification time moved. Returns whether a new
    /// config was installed.
    pub fn reload_if_changed(&self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };

        let modified = modified_time(path);
        {
            let mut last = self
                .last_modified
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if modified.is_none() || *last == modified {
                return false;
            }
            *last = modified;
        }

        match self.reload() {
            Ok(changed) => changed,
            Err(e) => {
                warn!(
                    operation = "config_reload",
                    path = %path.display(),
                    error = %e,
                    "Config file changed but could not be applied, keeping previous config"
                );
                false
            }
        }
    }

    /// Re-read the file unconditionally. On error the current config is kept.
    pub fn reload(&self) -> Result<bool> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Config manager has no backing file"))?;

        let new_config = Config::load_from_file(path)?;
        new_config.validate()?;

        let old_config = self.current();
        if *old_config == new_config {
            debug!(operation = "config_reload", "Config file touched without changes");
            return Ok(false);
        }

        let changes = describe_changes(&old_config, &new_config);
        if changes.is_empty() {
            info!(operation = "config_reload", "Config reloaded");
        }
        for change in &changes {
            info!(operation = "config_reload", change = %change, "Config value changed");
        }

        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(new_config);
        Ok(true)
    }

    /// Poll the config file from a background task until the handle is aborted.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.reload_if_changed();
            }
        })
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Human-readable list of the hot-reloadable settings that differ.
pub fn describe_changes(old: &Config, new: &Config) -> Vec<String> {
    let mut changes = Vec::new();

    if old.scheduler.dry_run != new.scheduler.dry_run {
        changes.push(format!(
            "scheduler.dry_run: {} -> {}",
            old.scheduler.dry_run, new.scheduler.dry_run
        ));
    }
    if old.cleanup.enabled != new.cleanup.enabled {
        changes.push(format!(
            "cleanup.enabled: {} -> {}",
            old.cleanup.enabled, new.cleanup.enabled
        ));
    }
    if old.cleanup.delay_days != new.cleanup.delay_days {
        changes.push(format!(
            "cleanup.delay_days: {} -> {}",
            old.cleanup.delay_days, new.cleanup.delay_days
        ));
    }
    if old.cleanup.series_delay_days != new.cleanup.series_delay_days {
        changes.push(format!(
            "cleanup.series_delay_days: {:?} -> {:?}",
            old.cleanup.series_delay_days, new.cleanup.series_delay_days
        ));
    }
    if old.cleanup.movie_delay_days != new.cleanup.movie_delay_days {
        changes.push(format!(
            "cleanup.movie_delay_days: {:?} -> {:?}",
            old.cleanup.movie_delay_days, new.cleanup.movie_delay_days
        ));
    }
    if old.cleanup.exclusions != new.cleanup.exclusions {
        changes.push(format!(
            "cleanup.exclusions: {} -> {} entries",
            old.cleanup.exclusions.len(),
            new.cleanup.exclusions.len()
        ));
    }
    if old.cleanup.excluded_libraries != new.cleanup.excluded_libraries {
        changes.push(format!(
            "cleanup.excluded_libraries: {:?} -> {:?}",
            old.cleanup.excluded_libraries, new.cleanup.excluded_libraries
        ));
    }
    if old.scheduler.cron != new.scheduler.cron {
        // The daemon builds its job once at startup
        changes.push(format!(
            "scheduler.cron: {} -> {} (takes effect after restart)",
            old.scheduler.cron, new.scheduler.cron
        ));
    }

    changes
}
