//! End-of-cycle log summary.

use media_retention_models::{format_size, Action, MediaResult, ProcessingResult};
use std::time::Duration;
use tracing::info;

/// Human-readable summary, one section per media type that saw any items.
pub fn summary_lines(result: &ProcessingResult) -> Vec<String> {
    let mut lines = Vec::new();
    for (media_type, stats) in &result.stats {
        lines.push(format!(
            "{} {}: scanned {}, queued {}, removed {}, skipped {}",
            media_type.icon(),
            media_type,
            stats.scanned,
            stats.marked_for_queue,
            stats.removed,
            stats.skipped
        ));

        for r in result.results_for(*media_type) {
            match &r.action {
                Action::Removed { .. } => {
                    lines.push(format!("  removed {}{}", r.display_title(), size_suffix(r)))
                }
                Action::DryRunRemove { .. } => {
                    lines.push(format!("  would remove {}{}", r.display_title(), size_suffix(r)))
                }
                Action::Queued { reason, days_until } => lines.push(format!(
                    "  queued {} ({} days left): {}",
                    r.display_title(),
                    days_until,
                    reason
                )),
                Action::Error { reason } => {
                    lines.push(format!("  error {}: {}", r.display_title(), reason))
                }
                Action::Skipped { .. } => {}
            }
        }
    }

    let freed: u64 = result
        .results
        .iter()
        .filter(|r| matches!(r.action, Action::Removed { .. }))
        .filter_map(|r| r.size_on_disk)
        .sum();
    if freed > 0 {
        lines.push(format!("Freed {}", format_size(freed)));
    }
    lines
}

fn size_suffix(result: &MediaResult) -> String {
    result
        .size_on_disk
        .map(|size| format!(" [{}]", format_size(size)))
        .unwrap_or_default()
}

pub fn log_summary(result: &ProcessingResult, elapsed: Duration) {
    let totals = result.totals();
    info!(
        scanned = totals.scanned,
        queued = totals.marked_for_queue,
        removed = totals.removed,
        skipped = totals.skipped,
        errors = result.errors,
        elapsed_ms = elapsed.as_millis() as u64,
        "Cleanup cycle finished in {:.1}s",
        elapsed.as_secs_f64()
    );
    for line in summary_lines(result) {
        info!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_retention_models::MediaType;

    fn result(title: &str, year: Option<u32>, action: Action, size: Option<u64>) -> MediaResult {
        MediaResult {
            media_type: MediaType::Movie,
            title: title.to_string(),
            id: 1,
            year,
            action,
            size_on_disk: size,
        }
    }

    #[test]
    fn test_summary_groups_by_type_and_skips_skipped() {
        let mut processing = ProcessingResult::new();
        processing.add_scanned(MediaType::Movie, 3);
        processing.record(result(
            "Heat",
            Some(1995),
            Action::Removed { reason: "deleted".to_string() },
            Some(2 * 1024 * 1024 * 1024),
        ));
        processing.record(result(
            "Ronin",
            Some(1998),
            Action::Queued { reason: "watched 2025-01-01".to_string(), days_until: 4 },
            None,
        ));
        processing.record(result("Alien", None, Action::skipped("no watch history"), None));

        let lines = summary_lines(&processing);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("movie: scanned 3, queued 1, removed 1, skipped 1"));
        assert_eq!(lines[1], "  removed Heat (1995) [2.0 GB]");
        assert_eq!(lines[2], "  queued Ronin (1998) (4 days left): watched 2025-01-01");
        assert_eq!(lines[3], "Freed 2.0 GB");
    }

    #[test]
    fn test_empty_result_has_no_lines() {
        assert!(summary_lines(&ProcessingResult::new()).is_empty());
    }
}
