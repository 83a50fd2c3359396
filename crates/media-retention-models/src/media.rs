use serde::{Deserialize, Serialize};
use std::fmt;

/// The four retention pipelines. Each one owns an independent queue.
///
/// `Series` and `Movie` are driven by the authoritative backends; the
/// `Emby*` variants reconcile orphans found in the media-server catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Series,
    Movie,
    EmbySeries,
    EmbyMovie,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [
        MediaType::Series,
        MediaType::Movie,
        MediaType::EmbySeries,
        MediaType::EmbyMovie,
    ];

    /// Series-shaped items carry per-season file and watch counts.
    pub fn is_episodic(self) -> bool {
        matches!(self, MediaType::Series | MediaType::EmbySeries)
    }

    pub fn is_catalog(self) -> bool {
        matches!(self, MediaType::EmbySeries | MediaType::EmbyMovie)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Series => "series",
            MediaType::Movie => "movie",
            MediaType::EmbySeries => "emby_series",
            MediaType::EmbyMovie => "emby_movie",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            MediaType::Series | MediaType::EmbySeries => "📺",
            MediaType::Movie | MediaType::EmbyMovie => "🎬",
        }
    }

    /// Skip reason used when an item has no file because it is not out yet.
    pub fn not_released_reason(self) -> &'static str {
        if self.is_episodic() {
            "not yet aired"
        } else {
            "not yet released"
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "series" | "tv" => Ok(MediaType::Series),
            "movie" | "movies" => Ok(MediaType::Movie),
            "emby_series" => Ok(MediaType::EmbySeries),
            "emby_movie" | "emby_movies" => Ok(MediaType::EmbyMovie),
            other => Err(format!(
                "Invalid media type: {}. Use 'series', 'movie', 'emby_series' or 'emby_movie'",
                other
            )),
        }
    }
}
