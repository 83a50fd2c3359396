pub mod emby;
pub mod error;
pub mod factory;
mod http;
pub mod radarr;
pub mod sonarr;
pub mod traits;
pub mod trakt;

pub use emby::EmbyClient;
pub use error::SourceError;
pub use factory::ClientSet;
pub use http::REQUEST_TIMEOUT;
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;
pub use traits::{MediaCatalog, MovieLibrary, TvLibrary, WatchHistorySource};
pub use trakt::{DeviceCode, TokenInfo, TraktAuth, TraktClient};
