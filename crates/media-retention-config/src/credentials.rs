use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const TRAKT_ACCESS_TOKEN: &str = "trakt_access_token";
const TRAKT_REFRESH_TOKEN: &str = "trakt_refresh_token";
const TRAKT_TOKEN_EXPIRES: &str = "trakt_token_expires";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: BTreeMap<String, String>,
}

/// Tokens obtained at runtime, kept out of the hand-edited config file.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    credentials: BTreeMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: BTreeMap::new(),
        }
    }

    /// Open the store, reading the file when it exists.
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let data: CredentialsData = toml::from_str(&content)?;
            self.credentials = data.data;
        }
        Ok(())
    }

    /// Write through a temp file and rename; the file is readable by the owner only.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&CredentialsData {
            data: self.credentials.clone(),
        })?;

        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_trakt_access_token(&self) -> Option<&String> {
        self.get(TRAKT_ACCESS_TOKEN).filter(|t| !t.is_empty())
    }

    pub fn set_trakt_access_token(&mut self, token: String) {
        self.set(TRAKT_ACCESS_TOKEN.to_string(), token);
    }

    pub fn get_trakt_refresh_token(&self) -> Option<&String> {
        self.get(TRAKT_REFRESH_TOKEN).filter(|t| !t.is_empty())
    }

    pub fn set_trakt_refresh_token(&mut self, token: String) {
        self.set(TRAKT_REFRESH_TOKEN.to_string(), token);
    }

    pub fn get_trakt_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get(TRAKT_TOKEN_EXPIRES)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_trakt_token_expires(&mut self, expires: DateTime<Utc>) {
        self.set(TRAKT_TOKEN_EXPIRES.to_string(), expires.to_rfc3339());
    }

    pub fn clear_trakt(&mut self) {
        for key in [TRAKT_ACCESS_TOKEN, TRAKT_REFRESH_TOKEN, TRAKT_TOKEN_EXPIRES] {
            self.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_trakt_tokens_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        let expires = Utc::now() + chrono::Duration::days(90);

        let mut store = CredentialStore::new(path.clone());
        store.set_trakt_access_token("access".to_string());
        store.set_trakt_refresh_token("refresh".to_string());
        store.set_trakt_token_expires(expires);
        store.save().unwrap();

        let loaded = CredentialStore::open(path).unwrap();
        assert_eq!(loaded.get_trakt_access_token(), Some(&"access".to_string()));
        assert_eq!(loaded.get_trakt_refresh_token(), Some(&"refresh".to_string()));
        // Allow 1 second difference for serialization
        let loaded_expires = loaded.get_trakt_token_expires().unwrap();
        assert!((loaded_expires - expires).num_seconds().abs() < 2);
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path().join("none.toml")).unwrap();
        assert!(store.get_trakt_access_token().is_none());
        assert!(store.get_trakt_token_expires().is_none());
    }

    #[test]
    fn test_clear_trakt_keeps_other_keys() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused.toml"));
        store.set_trakt_access_token("access".to_string());
        store.set("other".to_string(), "value".to_string());

        store.clear_trakt();
        assert!(store.get_trakt_access_token().is_none());
        assert_eq!(store.get("other"), Some(&"value".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        let mut store = CredentialStore::new(path.clone());
        store.set_trakt_access_token("access".to_string());
        store.save().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
