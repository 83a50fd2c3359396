pub mod catalog;
pub mod library;
pub mod media;
pub mod queue_item;
pub mod result;
pub mod size;
pub mod watch_history;

pub use catalog::{CatalogEpisode, CatalogItem, CatalogKind, CatalogLibrary, CatalogSeason, ProviderIds};
pub use library::{Movie, MovieStatus, SeasonFiles, Series, SeriesStatus};
pub use media::MediaType;
pub use queue_item::QueueItem;
pub use result::{Action, MediaResult, MediaStats, ProcessingResult};
pub use size::format_size;
pub use watch_history::{EpisodeRef, SeasonProgress, ShowProgress, WatchedMovie, WatchedShow};
