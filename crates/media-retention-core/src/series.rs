use crate::policy::{Candidate, Eligibility, RetentionBackend};
use async_trait::async_trait;
use media_retention_models::{MediaType, QueueItem, Series, SeriesStatus};
use media_retention_sources::{SourceError, TvLibrary};
use std::sync::Arc;

/// Retention backend over the authoritative TV library.
pub struct SeriesBackend {
    library: Arc<dyn TvLibrary>,
}

impl SeriesBackend {
    pub fn new(library: Arc<dyn TvLibrary>) -> Self {
        Self { library }
    }
}

fn eligibility(series: &Series) -> Eligibility {
    if !series.monitored {
        return Eligibility::NotMonitored;
    }
    if series.episode_file_count == 0 {
        if series.status == SeriesStatus::Upcoming || series.episode_count == 0 {
            return Eligibility::NotReleased;
        }
        return Eligibility::NoFile;
    }
    Eligibility::Eligible
}

impl From<Series> for Candidate {
    fn from(series: Series) -> Self {
        Candidate {
            eligibility: eligibility(&series),
            seasons: series.seasons_on_disk(),
            id: series.id,
            external_id: series.tvdb_id,
            title: series.title,
            year: series.year,
            size_on_disk: series.size_on_disk,
        }
    }
}

#[async_trait]
impl RetentionBackend for SeriesBackend {
    fn media_type(&self) -> MediaType {
        MediaType::Series
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError> {
        let series = self.library.list_series().await?;
        Ok(series.into_iter().map(Candidate::from).collect())
    }

    async fn still_present(&self, item: &QueueItem) -> Result<bool, SourceError> {
        Ok(self.library.get_series(item.id).await?.is_some())
    }

    async fn unmonitor(&self, id: u64) -> Result<bool, SourceError> {
        self.library.unmonitor_series(id).await?;
        Ok(true)
    }

    async fn delete(&self, item: &QueueItem) -> Result<(), SourceError> {
        self.library.delete_series(item.id, true).await
    }
}
