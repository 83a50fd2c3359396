use super::Workspace;
use crate::output::{styled_table, Output, OutputFormat};
use chrono::Utc;
use color_eyre::Result;
use comfy_table::{Cell, Color};
use media_retention_core::CycleReport;
use media_retention_models::{format_size, Action};
use std::path::PathBuf;

pub async fn run_once(config_path: Option<PathBuf>, dry_run: bool, output: &Output) -> Result<()> {
    let workspace = Workspace::resolve(config_path);
    let manager = workspace.load_config()?;
    let service = workspace.build_service(manager.clone())?;

    let mut config = (*manager.current()).clone();
    if dry_run {
        config.scheduler.dry_run = true;
    }

    tracing::debug!(dry_run = config.scheduler.dry_run, "Run command started");
    let report = service.run_cycle_with(&config, Utc::now()).await;
    print_report(&report, true, output);
    Ok(())
}

/// Render a cycle report. Skipped items are listed only when `with_skipped`.
pub fn print_report(report: &CycleReport, with_skipped: bool, output: &Output) {
    if output.format() != OutputFormat::Human {
        output.data(report);
        return;
    }

    let mut stats = styled_table(&["Type", "Scanned", "Queued", "Removed", "Skipped"]);
    for (media_type, s) in &report.result.stats {
        stats.add_row(vec![
            format!("{} {}", media_type.icon(), media_type),
            s.scanned.to_string(),
            s.marked_for_queue.to_string(),
            s.removed.to_string(),
            s.skipped.to_string(),
        ]);
    }
    output.table(&stats);

    let mut items = styled_table(&["Type", "Title", "Action", "Reason", "Size"]);
    let mut listed = 0;
    for r in &report.result.results {
        if !with_skipped && matches!(r.action, Action::Skipped { .. }) {
            continue;
        }
        let color = match r.action {
            Action::Removed { .. } => Color::Green,
            Action::DryRunRemove { .. } | Action::Queued { .. } => Color::Yellow,
            Action::Error { .. } => Color::Red,
            Action::Skipped { .. } => Color::DarkGrey,
        };
        let reason = match &r.action {
            Action::Queued { reason, days_until } => format!("{} ({} days left)", reason, days_until),
            other => other.reason().to_string(),
        };
        items.add_row(vec![
            Cell::new(r.media_type.to_string()),
            Cell::new(r.display_title()),
            Cell::new(r.action.label()).fg(color),
            Cell::new(reason),
            Cell::new(r.size_on_disk.map(format_size).unwrap_or_default()),
        ]);
        listed += 1;
    }
    if listed > 0 {
        output.table(&items);
    }

    let totals = report.result.totals();
    let summary = format!(
        "{}Cycle finished in {:.1}s: {} removed, {} queued, {} errors",
        if report.dry_run { "[DRY RUN] " } else { "" },
        report.duration().num_milliseconds() as f64 / 1000.0,
        totals.removed,
        totals.marked_for_queue,
        report.result.errors
    );
    if report.result.errors > 0 {
        output.warn(summary);
    } else {
        output.success(summary);
    }
}
