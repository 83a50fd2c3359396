pub mod clear;
pub mod config;
pub mod daemon;
pub mod queue;
pub mod run;
pub mod status;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_retention_config::{ConfigManager, PathManager};
use media_retention_core::RetentionService;
use media_retention_sources::ClientSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Where this invocation reads config and keeps its state.
pub struct Workspace {
    pub paths: PathManager,
    pub config_file: PathBuf,
}

impl Workspace {
    pub fn resolve(config_override: Option<PathBuf>) -> Self {
        let paths = PathManager::default();
        let config_file = config_override.unwrap_or_else(|| paths.config_file());
        Self { paths, config_file }
    }

    /// Trakt tokens live next to the config file in use.
    pub fn credentials_file(&self) -> PathBuf {
        self.config_file.with_file_name("credentials.toml")
    }

    pub fn load_config(&self) -> Result<Arc<ConfigManager>> {
        if !self.config_file.exists() {
            return Err(eyre!(
                "Configuration file not found at {}. Run 'afterwatch config init' to create one.",
                self.config_file.display()
            ));
        }
        let manager = ConfigManager::load(self.config_file.clone())
            .map_err(|e| eyre!("Invalid configuration: {}", e))?;
        Ok(Arc::new(manager))
    }

    pub fn build_service(&self, config: Arc<ConfigManager>) -> Result<RetentionService> {
        self.paths
            .ensure_directories()
            .map_err(|e| eyre!("Failed to create data directories: {}", e))?;
        let clients = ClientSet::from_config(&config.current(), self.credentials_file())
            .map_err(|e| eyre!("Failed to create clients: {}", e))?;
        Ok(RetentionService::with_paths(clients, config, &self.paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_follow_config_override() {
        let workspace = Workspace::resolve(Some(PathBuf::from("/srv/other/afterwatch.toml")));
        assert_eq!(workspace.credentials_file(), PathBuf::from("/srv/other/credentials.toml"));
    }
}
