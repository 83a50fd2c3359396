use crate::policy::{Candidate, Eligibility, RetentionBackend};
use async_trait::async_trait;
use media_retention_models::{MediaType, Movie, QueueItem};
use media_retention_sources::{MovieLibrary, SourceError};
use std::sync::Arc;

/// Retention backend over the authoritative movie library.
pub struct MovieBackend {
    library: Arc<dyn MovieLibrary>,
}

impl MovieBackend {
    pub fn new(library: Arc<dyn MovieLibrary>) -> Self {
        Self { library }
    }
}

fn eligibility(movie: &Movie) -> Eligibility {
    if !movie.monitored {
        Eligibility::NotMonitored
    } else if !movie.has_file && movie.status.is_unreleased() {
        Eligibility::NotReleased
    } else if !movie.has_file {
        Eligibility::NoFile
    } else {
        Eligibility::Eligible
    }
}

impl From<Movie> for Candidate {
    fn from(movie: Movie) -> Self {
        Candidate {
            eligibility: eligibility(&movie),
            id: movie.id,
            external_id: movie.tmdb_id,
            title: movie.title,
            year: movie.year,
            size_on_disk: movie.size_on_disk,
            seasons: Vec::new(),
        }
    }
}

#[async_trait]
impl RetentionBackend for MovieBackend {
    fn media_type(&self) -> MediaType {
        MediaType::Movie
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, SourceError> {
        let movies = self.library.list_movies().await?;
        Ok(movies.into_iter().map(Candidate::from).collect())
    }

    async fn still_present(&self, item: &QueueItem) -> Result<bool, SourceError> {
        Ok(self.library.get_movie(item.id).await?.is_some())
    }

    async fn unmonitor(&self, id: u64) -> Result<bool, SourceError> {
        self.library.unmonitor_movie(id).await?;
        Ok(true)
    }

    async fn delete(&self, item: &QueueItem) -> Result<(), SourceError> {
        self.library.delete_movie(item.id, true).await
    }
}
