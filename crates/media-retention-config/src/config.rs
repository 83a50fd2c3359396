use crate::schedule::parse_schedule;
use media_retention_models::MediaType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const PLACEHOLDER_CLIENT_ID: &str = "YOUR_CLIENT_ID";
const PLACEHOLDER_CLIENT_SECRET: &str = "YOUR_CLIENT_SECRET";
const PLACEHOLDER_ACCESS_TOKEN: &str = "YOUR_ACCESS_TOKEN";
const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub sonarr: Option<BackendConfig>,
    #[serde(default)]
    pub radarr: Option<BackendConfig>,
    #[serde(default)]
    pub emby: Option<BackendConfig>,
    pub trakt: TraktConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Connection settings shared by Sonarr, Radarr and Emby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraktConfig {
    pub client_id: String,
    /// Needed for `afterwatch config trakt` and for token refreshes.
    #[serde(default)]
    pub client_secret: String,
    /// Fixed token; used only when no login has been stored.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default = "default_trakt_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_delay_days")]
    pub delay_days: u32,
    #[serde(default)]
    pub series_delay_days: Option<u32>,
    #[serde(default)]
    pub movie_delay_days: Option<u32>,
    /// Titles that are never queued or removed (case-insensitive).
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Emby library names whose items are never treated as orphans.
    #[serde(default)]
    pub excluded_libraries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_true")]
    pub run_on_start: bool,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

fn default_delay_days() -> u32 {
    7
}

fn default_cron() -> String {
    "0 */6 * * *".to_string() // Every 6 hours
}

fn default_trakt_base_url() -> String {
    "https://api.trakt.tv".to_string()
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            delay_days: default_delay_days(),
            series_delay_days: None,
            movie_delay_days: None,
            exclusions: Vec::new(),
            excluded_libraries: Vec::new(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_on_start: default_true(),
            dry_run: false,
        }
    }
}

fn is_set(value: &str, placeholder: &str) -> bool {
    !value.trim().is_empty() && value != placeholder
}

impl TraktConfig {
    pub fn client_secret(&self) -> Option<&str> {
        Some(self.client_secret.as_str()).filter(|s| is_set(s, PLACEHOLDER_CLIENT_SECRET))
    }

    pub fn fixed_access_token(&self) -> Option<&str> {
        Some(self.access_token.as_str()).filter(|t| is_set(t, PLACEHOLDER_ACCESS_TOKEN))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !is_set(&self.client_id, PLACEHOLDER_CLIENT_ID) {
            return Err(anyhow::anyhow!("trakt.client_id is not configured"));
        }
        if self.client_secret().is_none() && self.fixed_access_token().is_none() {
            return Err(anyhow::anyhow!(
                "trakt needs client_secret (then run 'afterwatch config trakt') or a fixed access_token"
            ));
        }
        Ok(())
    }
}

impl BackendConfig {
    fn placeholder(base_url: &str) -> Self {
        Self {
            enabled: true,
            base_url: base_url.to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }

    fn validate(&self, name: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("{} is enabled but base_url is empty", name));
        }
        if self.api_key.trim().is_empty() || self.api_key == PLACEHOLDER_API_KEY {
            return Err(anyhow::anyhow!("{} is enabled but api_key is not configured", name));
        }
        Ok(())
    }
}

impl Config {
    /// Template written by `afterwatch config init`.
    pub fn template() -> Self {
        Self {
            sonarr: Some(BackendConfig::placeholder("http://localhost:8989")),
            radarr: Some(BackendConfig::placeholder("http://localhost:7878")),
            emby: Some(BackendConfig::placeholder("http://localhost:8096")),
            trakt: TraktConfig {
                client_id: PLACEHOLDER_CLIENT_ID.to_string(),
                client_secret: PLACEHOLDER_CLIENT_SECRET.to_string(),
                access_token: String::new(),
                base_url: default_trakt_base_url(),
            },
            cleanup: CleanupConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }

    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.cron.trim().is_empty() {
            return Err(anyhow::anyhow!("scheduler.cron cannot be empty"));
        }
        parse_schedule(&self.scheduler.cron).map_err(|e| anyhow::anyhow!("scheduler.cron: {}", e))?;
        self.trakt.validate()?;

        if let Some(sonarr) = &self.sonarr {
            sonarr.validate("Sonarr")?;
        }
        if let Some(radarr) = &self.radarr {
            radarr.validate("Radarr")?;
        }
        if let Some(emby) = &self.emby {
            emby.validate("Emby")?;
        }

        Ok(())
    }

    pub fn sonarr(&self) -> Option<&BackendConfig> {
        self.sonarr.as_ref().filter(|c| c.enabled)
    }

    pub fn radarr(&self) -> Option<&BackendConfig> {
        self.radarr.as_ref().filter(|c| c.enabled)
    }

    pub fn emby(&self) -> Option<&BackendConfig> {
        self.emby.as_ref().filter(|c| c.enabled)
    }

    /// Probation period for a media type; catalog variants follow their family.
    pub fn delay_days_for(&self, media_type: MediaType) -> u32 {
        let override_days = if media_type.is_episodic() {
            self.cleanup.series_delay_days
        } else {
            self.cleanup.movie_delay_days
        };
        override_days.unwrap_or(self.cleanup.delay_days)
    }

    /// Names of the enabled and configured services.
    pub fn get_configured_services(&self) -> Vec<String> {
        let mut services = vec!["trakt".to_string()];
        if self.sonarr().is_some() {
            services.push("sonarr".to_string());
        }
        if self.radarr().is_some() {
            services.push("radarr".to_string());
        }
        if self.emby().is_some() {
            services.push("emby".to_string());
        }
        services
    }
}
