//! Season-level watch checks shared by every episodic backend.

use media_retention_models::{SeasonFiles, ShowProgress};

/// First on-disk season whose completed count is below its file count.
/// Seasons missing from the watch history count as unwatched.
pub fn first_unwatched_season(on_disk: &[SeasonFiles], progress: &ShowProgress) -> Option<u32> {
    on_disk
        .iter()
        .filter(|s| s.number != 0 && s.file_count > 0)
        .find(|s| match progress.season(s.number) {
            Some(watched) => watched.completed < s.file_count,
            None => true,
        })
        .map(|s| s.number)
}

/// Skip reason for a show the user is still working through.
pub fn watching_reason(season: u32, progress: &ShowProgress) -> String {
    match progress.season(season) {
        Some(sp) => format!("watching S{:02} ({}/{})", season, sp.completed, sp.total_or_aired()),
        None => format!("S{:02} unwatched", season),
    }
}

/// Reason naming the season that is still airing, if any.
///
/// Only seasons present on disk are compared against their announced totals,
/// so a renewed show on hiatus with no new episodes aired is not held back.
pub fn forthcoming_reason(on_disk: &[SeasonFiles], progress: &ShowProgress) -> Option<String> {
    for season in on_disk.iter().filter(|s| s.number != 0 && s.file_count > 0) {
        if let Some(sp) = progress.season(season.number) {
            if let Some(total) = sp.total {
                if total > 0 && sp.aired < total {
                    return Some(format!(
                        "S{:02} ongoing ({}/{} aired)",
                        season.number, sp.aired, total
                    ));
                }
            }
        }
    }

    progress
        .next_episode
        .map(|next| format!("S{:02} ongoing", next.season))
}

/// "01,02" style list of season numbers.
pub fn format_seasons(seasons: &[SeasonFiles]) -> String {
    seasons
        .iter()
        .filter(|s| s.number != 0 && s.file_count > 0)
        .map(|s| format!("{:02}", s.number))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_retention_models::{EpisodeRef, SeasonProgress};

    fn on_disk(seasons: &[(u32, u32)]) -> Vec<SeasonFiles> {
        seasons
            .iter()
            .map(|(number, file_count)| SeasonFiles { number: *number, file_count: *file_count })
            .collect()
    }

    fn progress(seasons: &[(u32, u32, u32, Option<u32>)]) -> ShowProgress {
        ShowProgress {
            seasons: seasons
                .iter()
                .map(|(number, aired, completed, total)| SeasonProgress {
                    number: *number,
                    aired: *aired,
                    completed: *completed,
                    total: *total,
                })
                .collect(),
            next_episode: None,
        }
    }

    #[test]
    fn test_fully_watched_on_disk() {
        let disk = on_disk(&[(1, 10), (2, 8)]);
        let watched = progress(&[(1, 10, 10, Some(10)), (2, 8, 8, Some(8))]);
        assert_eq!(first_unwatched_season(&disk, &watched), None);
        assert_eq!(forthcoming_reason(&disk, &watched), None);
        assert_eq!(format_seasons(&disk), "01,02");
    }

    #[test]
    fn test_partially_watched_season_is_named() {
        let disk = on_disk(&[(1, 10), (2, 8)]);
        let watched = progress(&[(1, 10, 10, Some(10)), (2, 8, 3, Some(10))]);
        assert_eq!(first_unwatched_season(&disk, &watched), Some(2));
        assert_eq!(watching_reason(2, &watched), "watching S02 (3/10)");
    }

    #[test]
    fn test_season_missing_from_history_is_unwatched() {
        let disk = on_disk(&[(1, 10), (3, 2)]);
        let watched = progress(&[(1, 10, 10, None)]);
        assert_eq!(first_unwatched_season(&disk, &watched), Some(3));
        assert_eq!(watching_reason(3, &watched), "S03 unwatched");
    }

    #[test]
    fn test_specials_are_ignored() {
        let disk = on_disk(&[(0, 4), (1, 6)]);
        let watched = progress(&[(1, 6, 6, Some(6))]);
        assert_eq!(first_unwatched_season(&disk, &watched), None);
        assert_eq!(format_seasons(&disk), "01");
    }

    #[test]
    fn test_forthcoming_episodes_on_disk_season() {
        let disk = on_disk(&[(1, 10), (2, 6)]);
        let watched = progress(&[(1, 10, 10, Some(10)), (2, 6, 6, Some(10))]);
        assert_eq!(
            forthcoming_reason(&disk, &watched).as_deref(),
            Some("S02 ongoing (6/10 aired)")
        );
    }

    #[test]
    fn test_announced_season_not_on_disk_does_not_block() {
        let disk = on_disk(&[(1, 10)]);
        let watched = progress(&[(1, 10, 10, Some(10)), (2, 0, 0, Some(8))]);
        assert_eq!(forthcoming_reason(&disk, &watched), None);
    }

    #[test]
    fn test_next_episode_pointer_means_forthcoming() {
        let disk = on_disk(&[(1, 10)]);
        let mut watched = progress(&[(1, 10, 10, None)]);
        watched.next_episode = Some(EpisodeRef { season: 2, number: 1 });
        assert_eq!(forthcoming_reason(&disk, &watched).as_deref(), Some("S02 ongoing"));
    }
}
