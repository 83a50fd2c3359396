pub mod library_filter;
pub mod movies;
pub mod orchestrator;
pub mod orphans;
pub mod policy;
pub mod progress;
pub mod queue;
pub mod report;
pub mod series;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use library_filter::{filter_by_library, resolve_excluded_library_ids};
pub use movies::MovieBackend;
pub use orchestrator::RetentionService;
pub use orphans::OrphanBackend;
pub use policy::{run_pass, Candidate, Eligibility, PassContext, PassOutcome, PassSettings, RetentionBackend, WatchIndex};
pub use queue::{Queue, QueueSet};
pub use report::{load_report, CycleReport, ReportStore};
pub use series::SeriesBackend;
