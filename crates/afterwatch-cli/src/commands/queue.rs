use super::Workspace;
use crate::output::{styled_table, Output, OutputFormat};
use chrono::Utc;
use color_eyre::Result;
use media_retention_config::Config;
use media_retention_core::QueueSet;
use media_retention_models::{format_size, MediaType};
use serde_json::json;
use std::path::PathBuf;

/// List queued items with the days left before removal.
pub async fn run_queue(
    config_path: Option<PathBuf>,
    media_type: Option<MediaType>,
    output: &Output,
) -> Result<()> {
    let workspace = Workspace::resolve(config_path);
    // Delays only affect the countdown, so a missing config falls back to defaults
    let config = match workspace.load_config() {
        Ok(manager) => (*manager.current()).clone(),
        Err(e) => {
            tracing::debug!(error = %e, "Using default delays for queue listing");
            Config::template()
        }
    };

    let queues = QueueSet::open(&workspace.paths);
    let now = Utc::now();
    let types: Vec<MediaType> = match media_type {
        Some(t) => vec![t],
        None => MediaType::ALL.to_vec(),
    };

    let mut rows = Vec::new();
    for t in types {
        let delay = config.delay_days_for(t);
        for item in queues.get(t).all() {
            rows.push((t, item.days_until_removal(delay, now), item));
        }
    }

    if output.format() != OutputFormat::Human {
        let items: Vec<_> = rows
            .iter()
            .map(|(t, days_left, item)| {
                json!({
                    "type": t,
                    "id": item.id,
                    "external_id": item.external_id,
                    "title": item.title,
                    "marked_at": item.marked_at,
                    "days_until_removal": days_left,
                    "reason": item.reason,
                    "size_on_disk": item.size_on_disk,
                    "unmonitored": item.unmonitored,
                })
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    if rows.is_empty() {
        output.info("Removal queue is empty.");
        return Ok(());
    }

    let mut table = styled_table(&["Type", "Title", "Queued", "Days Left", "Size", "Reason"]);
    for (t, days_left, item) in &rows {
        table.add_row(vec![
            t.to_string(),
            item.title.clone(),
            item.marked_at.format("%Y-%m-%d").to_string(),
            days_left.to_string(),
            format_size(item.size_on_disk),
            item.reason.clone(),
        ]);
    }
    output.table(&table);
    output.info(format!("{} item(s) queued for removal", rows.len()));
    Ok(())
}
