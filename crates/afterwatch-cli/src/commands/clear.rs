use super::Workspace;
use crate::output::Output;
use color_eyre::Result;
use media_retention_core::QueueSet;
use media_retention_models::MediaType;
use std::path::PathBuf;

/// Empty one queue or all of them. Nothing upstream is touched.
pub async fn run_clear(
    config_path: Option<PathBuf>,
    media_type: Option<MediaType>,
    all: bool,
    output: &Output,
) -> Result<()> {
    let types: Vec<MediaType> = match (media_type, all) {
        (_, true) => MediaType::ALL.to_vec(),
        (Some(t), false) => vec![t],
        (None, false) => {
            output.warn("No queue specified. Use --media-type <TYPE> or --all");
            output.info("\nExample: afterwatch clear --media-type movie");
            return Ok(());
        }
    };

    let workspace = Workspace::resolve(config_path);
    let queues = QueueSet::open(&workspace.paths);

    let mut cleared = 0;
    for t in types {
        let count = queues.get(t).clear();
        if count > 0 {
            output.success(format!("Cleared {} {} item(s) from the queue", count, t));
        }
        cleared += count;
    }

    if cleared == 0 {
        output.info("Nothing queued, nothing to clear");
    }
    Ok(())
}
