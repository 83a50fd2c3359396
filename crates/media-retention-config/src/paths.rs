use anyhow::{anyhow, Result};
use media_retention_models::MediaType;
use std::path::PathBuf;

const BASE_PATH_ENV: &str = "AFTERWATCH_BASE_PATH";
const CONTAINER_BASE: &str = "/app";

/// On-disk layout: hand-edited `config.toml` and runtime `credentials.toml`
/// at the base, queues and the last report under `data/`, logs under `logs/`.
#[derive(Debug, Clone)]
pub struct PathManager {
    base: PathBuf,
}

impl PathManager {
    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    /// `$AFTERWATCH_BASE_PATH` if set, then `/app` if the container image
    /// created it, then `<user config dir>/afterwatch`.
    pub fn detect() -> Result<Self> {
        if let Ok(base) = std::env::var(BASE_PATH_ENV) {
            if !base.trim().is_empty() {
                return Ok(Self::with_base(PathBuf::from(base)));
            }
        }

        let container = PathBuf::from(CONTAINER_BASE);
        if container.is_dir() {
            return Ok(Self::with_base(container));
        }

        dirs::config_dir()
            .map(|dir| Self::with_base(dir.join("afterwatch")))
            .ok_or_else(|| anyhow!("No user config directory found, set {}", BASE_PATH_ENV))
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    /// Tokens written by `afterwatch config trakt` and by token refreshes.
    pub fn credentials_file(&self) -> PathBuf {
        self.base.join("credentials.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// e.g. `data/queue_emby_series.json`
    pub fn queue_file(&self, media_type: MediaType) -> PathBuf {
        self.data_dir().join(format!("queue_{}.json", media_type.as_str()))
    }

    pub fn last_report_file(&self) -> PathBuf {
        self.data_dir().join("last_report.json")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [self.base.clone(), self.data_dir(), self.log_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| anyhow!("Failed to create {}: {}", dir.display(), e))?;
        }
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        Self::detect().unwrap_or_else(|_| Self::with_base(PathBuf::from(CONTAINER_BASE)))
    }
}
