use super::auth::{TokenInfo, TraktAuth};
use crate::error::SourceError;
use crate::http;
use crate::traits::WatchHistorySource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_retention_config::{CredentialStore, TraktConfig};
use media_retention_models::{EpisodeRef, SeasonProgress, ShowProgress, WatchedMovie, WatchedShow};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
struct TraktIds {
    trakt: Option<u64>,
    tvdb: Option<u32>,
    tmdb: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TraktShow {
    title: String,
    #[serde(default)]
    ids: TraktIds,
}

#[derive(Debug, Deserialize)]
struct TraktMovie {
    title: String,
    #[serde(default)]
    ids: TraktIds,
}

#[derive(Debug, Deserialize)]
struct TraktWatchedShow {
    last_watched_at: Option<DateTime<Utc>>,
    show: TraktShow,
}

#[derive(Debug, Deserialize)]
struct TraktWatchedMovie {
    last_watched_at: DateTime<Utc>,
    movie: TraktMovie,
}

#[derive(Debug, Deserialize)]
struct TraktShowProgress {
    #[serde(default)]
    seasons: Vec<TraktSeasonProgress>,
    next_episode: Option<TraktEpisode>,
}

#[derive(Debug, Deserialize)]
struct TraktSeasonProgress {
    number: u32,
    #[serde(default)]
    aired: u32,
    #[serde(default)]
    completed: u32,
}

#[derive(Debug, Deserialize)]
struct TraktEpisode {
    season: u32,
    number: u32,
}

#[derive(Debug, Deserialize)]
struct TraktSeasonSummary {
    number: u32,
    #[serde(default)]
    episode_count: Option<u32>,
}

/// Merge watched progress with announced season totals.
fn merge_progress(progress: TraktShowProgress, totals: &HashMap<u32, u32>) -> ShowProgress {
    ShowProgress {
        seasons: progress
            .seasons
            .into_iter()
            .map(|s| SeasonProgress {
                total: totals.get(&s.number).copied().filter(|t| *t > 0),
                number: s.number,
                aired: s.aired,
                completed: s.completed,
            })
            .collect(),
        next_episode: progress.next_episode.map(|e| EpisodeRef {
            season: e.season,
            number: e.number,
        }),
    }
}

/// Trakt API v2 client.
///
/// Uses the login stored in the credentials file when there is one, and the
/// fixed `access_token` from the config otherwise. A stored login is
/// refreshed before a cycle once it is close to expiring.
pub struct TraktClient {
    client: Client,
    base_url: String,
    auth: Option<TraktAuth>,
    credentials_file: PathBuf,
    token: RwLock<Option<TokenInfo>>,
}

impl TraktClient {
    pub fn new(config: &TraktConfig, credentials_file: PathBuf) -> Result<Self, SourceError> {
        let stored = match CredentialStore::open(credentials_file.clone()) {
            Ok(store) => TokenInfo::load(&store),
            Err(e) => {
                warn!(
                    path = %credentials_file.display(),
                    error = %e,
                    "Could not read stored Trakt login"
                );
                None
            }
        };
        let token = stored.or_else(|| config.fixed_access_token().map(TokenInfo::fixed));
        let auth = match config.client_secret() {
            Some(secret) => Some(TraktAuth::new(&config.base_url, &config.client_id, secret)?),
            None => None,
        };

        Ok(Self {
            client: http::build_client(&[
                ("trakt-api-version", "2"),
                ("trakt-api-key", config.client_id.as_str()),
            ])?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
            credentials_file,
            token: RwLock::new(token),
        })
    }

    fn current_token(&self) -> Option<TokenInfo> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match self.current_token() {
            Some(token) => request.bearer_auth(token.access_token),
            None => request,
        }
    }

    /// Refresh the token if it expires within the refresh margin of `now`.
    ///
    /// A failed refresh is tolerated while the current token is still valid.
    pub async fn ensure_token_at(&self, now: DateTime<Utc>) -> Result<(), SourceError> {
        let Some(current) = self.current_token() else {
            return Err(SourceError::NotConfigured(
                "Trakt login (run 'afterwatch config trakt')".to_string(),
            ));
        };
        if !current.needs_refresh(now) {
            return Ok(());
        }

        let (Some(auth), Some(refresh_token)) = (&self.auth, current.refresh_token.as_deref()) else {
            if current.is_expired(now) {
                return Err(SourceError::Auth(
                    "Trakt token expired and cannot be refreshed, run 'afterwatch config trakt'"
                        .to_string(),
                ));
            }
            warn!(operation = "trakt_refresh", "Trakt token expires soon and cannot be refreshed");
            return Ok(());
        };

        match auth.refresh(refresh_token).await {
            Ok(refreshed) => {
                self.persist(&refreshed);
                info!(
                    operation = "trakt_refresh",
                    expires_at = ?refreshed.expires_at,
                    "Refreshed Trakt token"
                );
                *self
                    .token
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(refreshed);
                Ok(())
            }
            Err(e) if !current.is_expired(now) => {
                warn!(
                    operation = "trakt_refresh",
                    error = %e,
                    "Trakt token refresh failed, using the current token until it expires"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn persist(&self, token: &TokenInfo) {
        let saved = CredentialStore::open(self.credentials_file.clone()).and_then(|mut store| {
            token.store(&mut store);
            store.save()
        });
        if let Err(e) = saved {
            warn!(
                path = %self.credentials_file.display(),
                error = %e,
                "Failed to save refreshed Trakt token, it will be refreshed again next cycle"
            );
        }
    }

    async fn season_totals(&self, show_id: u64) -> Result<HashMap<u32, u32>, SourceError> {
        let seasons: Vec<TraktSeasonSummary> = http::json(
            self.get(&format!("/shows/{}/seasons", show_id))
                .query(&[("extended", "full")]),
        )
        .await?;
        Ok(seasons
            .into_iter()
            .filter_map(|s| s.episode_count.map(|count| (s.number, count)))
            .collect())
    }
}

#[async_trait]
impl WatchHistorySource for TraktClient {
    fn source_name(&self) -> &str {
        "trakt"
    }

    async fn ensure_ready(&self) -> Result<(), SourceError> {
        self.ensure_token_at(Utc::now()).await
    }

    async fn watched_shows(&self) -> Result<Vec<WatchedShow>, SourceError> {
        let raw: Vec<TraktWatchedShow> = http::json(self.get("/users/me/watched/shows")).await?;
        debug!("Fetched {} watched shows from Trakt", raw.len());

        Ok(raw
            .into_iter()
            .filter_map(|w| {
                let Some(service_id) = w.show.ids.trakt else {
                    warn!(title = %w.show.title, "Watched show has no Trakt id, skipping");
                    return None;
                };
                Some(WatchedShow {
                    service_id,
                    title: w.show.title,
                    tvdb_id: w.show.ids.tvdb.filter(|id| *id > 0),
                    last_watched_at: w.last_watched_at,
                })
            })
            .collect())
    }

    async fn watched_movies(&self) -> Result<Vec<WatchedMovie>, SourceError> {
        let raw: Vec<TraktWatchedMovie> = http::json(self.get("/users/me/watched/movies")).await?;
        debug!("Fetched {} watched movies from Trakt", raw.len());

        Ok(raw
            .into_iter()
            .map(|w| WatchedMovie {
                service_id: w.movie.ids.trakt.unwrap_or(0),
                title: w.movie.title,
                tmdb_id: w.movie.ids.tmdb.filter(|id| *id > 0),
                last_watched_at: w.last_watched_at,
            })
            .collect())
    }

    async fn show_progress(&self, show: &WatchedShow) -> Result<ShowProgress, SourceError> {
        let progress: TraktShowProgress = http::json(
            self.get(&format!("/shows/{}/progress/watched", show.service_id)),
        )
        .await?;

        // Totals only sharpen the forthcoming-content check; progress alone is usable
        let totals = match self.season_totals(show.service_id).await {
            Ok(totals) => totals,
            Err(e) => {
                warn!(
                    title = %show.title,
                    error = %e,
                    "Failed to fetch Trakt season summary, falling back to aired counts"
                );
                HashMap::new()
            }
        };

        Ok(merge_progress(progress, &totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    // Nothing listens here, so any refresh attempt fails fast
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn trakt_config(secret: &str, fixed_token: &str) -> TraktConfig {
        TraktConfig {
            client_id: "client".to_string(),
            client_secret: secret.to_string(),
            access_token: fixed_token.to_string(),
            base_url: UNREACHABLE.to_string(),
        }
    }

    fn stored_login(dir: &TempDir, expires_at: DateTime<Utc>) -> PathBuf {
        let path = dir.path().join("credentials.toml");
        let mut store = CredentialStore::new(path.clone());
        TokenInfo {
            access_token: "stored".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(expires_at),
        }
        .store(&mut store);
        store.save().unwrap();
        path
    }

    #[test]
    fn test_stored_login_wins_over_fixed_token() {
        let dir = TempDir::new().unwrap();
        let path = stored_login(&dir, now() + Duration::days(60));
        let client = TraktClient::new(&trakt_config("secret", "fixed"), path).unwrap();
        assert_eq!(client.current_token().unwrap().access_token, "stored");

        let client = TraktClient::new(
            &trakt_config("", "fixed"),
            dir.path().join("missing.toml"),
        )
        .unwrap();
        assert_eq!(client.current_token(), Some(TokenInfo::fixed("fixed")));
    }

    #[tokio::test]
    async fn test_no_token_is_not_configured() {
        let dir = TempDir::new().unwrap();
        let client =
            TraktClient::new(&trakt_config("secret", ""), dir.path().join("missing.toml")).unwrap();
        let err = client.ensure_token_at(now()).await.unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_fresh_or_fixed_token_needs_no_refresh() {
        let dir = TempDir::new().unwrap();
        let path = stored_login(&dir, now() + Duration::days(60));
        let client = TraktClient::new(&trakt_config("secret", ""), path).unwrap();
        assert!(client.ensure_token_at(now()).await.is_ok());

        let client =
            TraktClient::new(&trakt_config("", "fixed"), dir.path().join("missing.toml")).unwrap();
        assert!(client.ensure_token_at(now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_token_until_expiry() {
        let dir = TempDir::new().unwrap();
        let path = stored_login(&dir, now() + Duration::hours(2));
        let client = TraktClient::new(&trakt_config("secret", ""), path).unwrap();

        assert!(client.ensure_token_at(now()).await.is_ok());
        assert_eq!(client.current_token().unwrap().access_token, "stored");

        let err = client.ensure_token_at(now() + Duration::hours(3)).await.unwrap_err();
        assert!(matches!(err, SourceError::Http(_)));
    }

    #[tokio::test]
    async fn test_expired_token_without_secret_asks_for_login() {
        let dir = TempDir::new().unwrap();
        let path = stored_login(&dir, now() - Duration::hours(1));
        let client = TraktClient::new(&trakt_config("", ""), path).unwrap();

        let err = client.ensure_token_at(now()).await.unwrap_err();
        assert!(matches!(err, SourceError::Auth(_)));
    }

    #[test]
    fn test_merge_progress_with_totals() {
        let json = r#"{
            "aired": 18,
            "completed": 18,
            "seasons": [
                {"number": 1, "aired": 10, "completed": 10, "episodes": []},
                {"number": 2, "aired": 8, "completed": 8, "episodes": []}
            ],
            "next_episode": null
        }"#;
        let progress: TraktShowProgress = serde_json::from_str(json).unwrap();
        let totals = HashMap::from([(1, 10), (2, 10), (3, 0)]);

        let merged = merge_progress(progress, &totals);
        assert_eq!(merged.seasons.len(), 2);
        assert_eq!(merged.season(2).unwrap().total, Some(10));
        assert_eq!(merged.season(2).unwrap().aired, 8);
        assert!(merged.next_episode.is_none());
    }

    #[test]
    fn test_merge_progress_without_totals() {
        let json = r#"{
            "seasons": [{"number": 1, "aired": 6, "completed": 3}],
            "next_episode": {"season": 1, "number": 4, "title": "Four", "ids": {"trakt": 9}}
        }"#;
        let progress: TraktShowProgress = serde_json::from_str(json).unwrap();
        let merged = merge_progress(progress, &HashMap::new());

        assert_eq!(merged.season(1).unwrap().total, None);
        assert_eq!(merged.season(1).unwrap().total_or_aired(), 6);
        assert_eq!(merged.next_episode, Some(EpisodeRef { season: 1, number: 4 }));
    }

    #[test]
    fn test_watched_movie_payload() {
        let json = r#"[{
            "plays": 1,
            "last_watched_at": "2024-05-01T20:15:00.000Z",
            "last_updated_at": "2024-05-01T20:15:00.000Z",
            "movie": {"title": "Heat", "year": 1995, "ids": {"trakt": 1, "tmdb": 949, "imdb": "tt0113277"}}
        }]"#;
        let raw: Vec<TraktWatchedMovie> = serde_json::from_str(json).unwrap();
        assert_eq!(raw[0].movie.ids.tmdb, Some(949));
        assert_eq!(raw[0].last_watched_at.format("%Y-%m-%d").to_string(), "2024-05-01");
    }
}
