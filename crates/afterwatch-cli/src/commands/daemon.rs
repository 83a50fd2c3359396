use super::Workspace;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_retention_config::{scheduler_cron, DEFAULT_POLL_INTERVAL};
use media_retention_core::RetentionService;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Cron-driven cycles with at most one cycle in flight.
pub struct Scheduler {
    scheduler: JobScheduler,
    service: Arc<RetentionService>,
    running: Arc<Mutex<()>>,
    cron: String,
    run_on_start: bool,
}

impl Scheduler {
    pub async fn new(service: Arc<RetentionService>, cron: String, run_on_start: bool) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            service,
            running: Arc::new(Mutex::new(())),
            cron,
            run_on_start,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.run_on_start {
            info!(operation = "scheduler_startup", "Running initial cleanup on startup");
            run_guarded(&self.service, &self.running, "startup").await;
        }

        let schedule = scheduler_cron(&self.cron)
            .map_err(|e| eyre!("Invalid cron schedule '{}': {}", self.cron, e))?;
        let service = self.service.clone();
        let running = self.running.clone();
        let job = Job::new_async(schedule.as_str(), move |_uuid, _scheduler| {
            let service = service.clone();
            let running = running.clone();
            Box::pin(async move {
                run_guarded(&service, &running, "scheduled").await;
            })
        })
        .map_err(|e| eyre!("Invalid cron schedule '{}': {}", self.cron, e))?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(
            operation = "scheduler_started",
            schedule = %self.cron,
            "Scheduler started"
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

/// Run one cycle unless another is still going. Returns whether it ran.
async fn run_guarded(service: &RetentionService, running: &Mutex<()>, trigger: &str) -> bool {
    let Ok(_guard) = running.try_lock() else {
        warn!(
            operation = "cycle_skipped",
            trigger,
            "Previous cleanup cycle still running, skipping this trigger"
        );
        return false;
    };

    info!(operation = "cycle_start", trigger, "Starting cleanup cycle");
    let report = service.run_cycle().await;
    let totals = report.result.totals();
    if report.result.errors > 0 {
        error!(
            operation = "cycle_complete",
            trigger,
            errors = report.result.errors,
            removed = totals.removed,
            queued = totals.marked_for_queue,
            "Cleanup cycle finished with errors"
        );
    } else {
        info!(
            operation = "cycle_complete",
            trigger,
            removed = totals.removed,
            queued = totals.marked_for_queue,
            duration_ms = report.duration().num_milliseconds(),
            "Cleanup cycle finished"
        );
    }
    true
}

pub async fn run_daemon(
    config_path: Option<PathBuf>,
    schedule_override: Option<String>,
    no_startup_run: bool,
    output: &Output,
) -> Result<()> {
    let workspace = Workspace::resolve(config_path);
    let manager = workspace.load_config()?;
    let config = manager.current();

    let cron = schedule_override.unwrap_or_else(|| config.scheduler.cron.clone());
    let mut checked = (*config).clone();
    checked.scheduler.cron = cron.clone();
    checked
        .validate()
        .map_err(|e| eyre!("Invalid schedule: {}", e))?;
    let run_on_start = !no_startup_run && config.scheduler.run_on_start;

    let service = Arc::new(workspace.build_service(manager.clone())?);
    let poller = manager.spawn_polling(DEFAULT_POLL_INTERVAL);

    output.info(format!(
        "Starting daemon (schedule '{}', dry run {})",
        cron, config.scheduler.dry_run
    ));

    let mut scheduler = Scheduler::new(service, cron, run_on_start)
        .await
        .map_err(|e| eyre!("Failed to create scheduler: {}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| eyre!("Failed to start scheduler: {}", e))?;

    shutdown_signal().await;
    info!(operation = "daemon_shutdown", "Shutdown signal received, stopping scheduler");
    poller.abort();
    scheduler.shutdown().await?;
    output.success("Daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to listen for SIGTERM, only Ctrl-C will stop the daemon"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
    }
}
