use serde::{Deserialize, Serialize};

/// A series as reported by the TV backend, normalized from its API shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub id: u64,
    pub title: String,
    pub year: Option<u32>,
    /// Cross-reference id used to find watch history and catalog orphans.
    pub tvdb_id: Option<u32>,
    pub monitored: bool,
    pub status: SeriesStatus,
    /// Episodes with a file on disk, across all seasons.
    pub episode_file_count: u32,
    /// Episodes the backend knows have aired.
    pub episode_count: u32,
    pub size_on_disk: u64,
    pub seasons: Vec<SeasonFiles>,
}

impl Series {
    /// Regular seasons (specials excluded) with at least one file on disk.
    pub fn seasons_on_disk(&self) -> Vec<SeasonFiles> {
        self.seasons
            .iter()
            .filter(|s| s.number != 0 && s.file_count > 0)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Continuing,
    Ended,
    Upcoming,
    Unknown,
}

impl SeriesStatus {
    pub fn from_api(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "continuing" => SeriesStatus::Continuing,
            "ended" => SeriesStatus::Ended,
            "upcoming" => SeriesStatus::Upcoming,
            _ => SeriesStatus::Unknown,
        }
    }
}

/// Files present on disk for one season.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonFiles {
    pub number: u32,
    pub file_count: u32,
}

/// A movie as reported by the movie backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub year: Option<u32>,
    pub tmdb_id: Option<u32>,
    pub monitored: bool,
    pub has_file: bool,
    pub status: MovieStatus,
    pub size_on_disk: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovieStatus {
    Announced,
    InCinemas,
    Released,
    Unknown,
}

impl MovieStatus {
    pub fn from_api(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "announced" | "tba" => MovieStatus::Announced,
            "incinemas" => MovieStatus::InCinemas,
            "released" => MovieStatus::Released,
            _ => MovieStatus::Unknown,
        }
    }

    pub fn is_unreleased(self) -> bool {
        matches!(self, MovieStatus::Announced | MovieStatus::InCinemas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seasons_on_disk_skips_specials_and_empty() {
        let series = Series {
            id: 1,
            title: "Show".to_string(),
            year: None,
            tvdb_id: Some(10),
            monitored: true,
            status: SeriesStatus::Ended,
            episode_file_count: 12,
            episode_count: 20,
            size_on_disk: 0,
            seasons: vec![
                SeasonFiles { number: 0, file_count: 3 },
                SeasonFiles { number: 1, file_count: 10 },
                SeasonFiles { number: 2, file_count: 0 },
                SeasonFiles { number: 3, file_count: 2 },
            ],
        };

        let numbers: Vec<u32> = series.seasons_on_disk().iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(SeriesStatus::from_api("Upcoming"), SeriesStatus::Upcoming);
        assert_eq!(MovieStatus::from_api("inCinemas"), MovieStatus::InCinemas);
        assert!(MovieStatus::from_api("announced").is_unreleased());
        assert!(!MovieStatus::from_api("released").is_unreleased());
    }
}
