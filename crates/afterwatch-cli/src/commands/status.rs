use super::run::print_report;
use super::Workspace;
use crate::output::{Output, OutputFormat};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_retention_core::load_report;
use std::path::PathBuf;

/// Show the last finished cycle, as persisted by `run` or the daemon.
pub async fn run_status(config_path: Option<PathBuf>, output: &Output) -> Result<()> {
    let workspace = Workspace::resolve(config_path);
    let report_file = workspace.paths.last_report_file();

    let report = load_report(&report_file)
        .map_err(|e| eyre!("Failed to read last report: {}", e))?;
    let Some(report) = report else {
        output.info("No cleanup cycle has completed yet.");
        return Ok(());
    };

    if output.format() == OutputFormat::Human {
        output.info(format!(
            "Last cycle started {} and finished {}",
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    print_report(&report, false, output);
    Ok(())
}
