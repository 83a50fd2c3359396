use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::{clear, config, daemon, queue, run, status};
use media_retention_models::MediaType;
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "afterwatch")]
#[command(about = "Afterwatch - Retire the shows and movies you've finished watching")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one cleanup cycle and print the results
    #[command(long_about = "Evaluate every library item once: queue fully watched items, delete items whose delay has elapsed and reconcile orphaned media-server entries.")]
    Run {
        /// Report what would be deleted without deleting or unmonitoring anything
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Run as daemon with internal scheduler
    #[command(long_about = "Run cleanup cycles on the configured cron schedule. The config file is watched and changes to delays, exclusions and dry-run apply from the next cycle.")]
    Daemon {
        /// Cron schedule expression (e.g., '0 */6 * * *' for every 6 hours)
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip the cycle normally run on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_run: bool,

        /// Write logs to this file (rotated daily) instead of stderr
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
    },
    /// Show items waiting for removal
    Queue {
        /// Only show one media type (series, movie, emby_series, emby_movie)
        #[arg(long, value_name = "TYPE")]
        media_type: Option<MediaType>,
    },
    /// Show the result of the last finished cycle
    Status,
    /// Empty removal queues without touching any library
    Clear {
        /// Queue to empty (series, movie, emby_series, emby_movie)
        #[arg(long, value_name = "TYPE", conflicts_with = "all")]
        media_type: Option<MediaType>,

        /// Empty every queue
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks API keys and tokens)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a configuration template
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Check the configuration file for errors
    Validate,
    /// Log in to Trakt with a device code and store the tokens
    Trakt {
        /// Trakt application client id (saved to the config file)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt application client secret (saved to the config file)
        #[arg(long)]
        client_secret: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Daemon { log_file, .. } => log_file.clone(),
        _ => None,
    };
    logging::init_logging(cli.verbose, cli.quiet, log_file).map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Run { dry_run } => run::run_once(cli.config, dry_run, &output).await,
        Commands::Daemon {
            schedule,
            no_startup_run,
            log_file: _,
        } => daemon::run_daemon(cli.config, schedule, no_startup_run, &output).await,
        Commands::Queue { media_type } => queue::run_queue(cli.config, media_type, &output).await,
        Commands::Status => status::run_status(cli.config, &output).await,
        Commands::Clear { media_type, all } => clear::run_clear(cli.config, media_type, all, &output).await,
        Commands::Config { cmd } => config::run_config(cli.config, cmd, &output).await,
    }
}
