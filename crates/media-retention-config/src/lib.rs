pub mod config;
pub mod credentials;
pub mod manager;
pub mod paths;
pub mod schedule;

pub use config::{BackendConfig, CleanupConfig, Config, SchedulerConfig, TraktConfig};
pub use credentials::CredentialStore;
pub use manager::{describe_changes, ConfigManager, DEFAULT_POLL_INTERVAL};
pub use paths::PathManager;
pub use schedule::{parse_schedule, scheduler_cron};
