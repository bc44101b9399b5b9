use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::Parser;
use log::{LevelFilter, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use vtschedule::app::{self, App};
use vtschedule::config::{Config, default_log_path};
use vtschedule::holodex::HttpVideoSource;
use vtschedule::notify::StderrNotifier;
use vtschedule::presenter::{DisplayFilter, build_rows};
use vtschedule::scheduler::{RefreshQuery, RefreshScheduler, run_refresh_cycle};
use vtschedule::video_client::VideoSourceClient;

/// Live and upcoming Holodex broadcasts for the channels and organizations you follow.
#[derive(Debug, Parser)]
#[command(name = "vtschedule", version, about)]
struct Cli {
    /// Config file (default: <config dir>/vtschedule/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Holodex API key for this session
    #[arg(long)]
    api_key: Option<String>,

    /// Comma-separated channel ids for this session
    #[arg(long)]
    channels: Option<String>,

    /// Comma-separated organization names for this session
    #[arg(long)]
    organizations: Option<String>,

    /// Log file used while the TUI owns the terminal
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run one refresh, print the table and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(key) = &self.api_key {
            config.api_key = key.clone();
        }
        if let Some(channels) = &self.channels {
            config.channels = channels.clone();
        }
        if let Some(organizations) = &self.organizations {
            config.organizations = organizations.clone();
        }
        config.with_env_api_key()
    }
}

fn init_file_logging(path: &Path, level: LevelFilter) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(fern::log_file(path)?)
        .apply()
        .map_err(|e| anyhow!("Failed to install logger: {}", e))
}

fn init_stderr_logging(level: LevelFilter) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .init();
}

async fn run_once(config: &Config, client: &VideoSourceClient) -> Result<()> {
    let mut scheduler = RefreshScheduler::new(config.refresh_interval());
    let mut notifier = StderrNotifier;
    let now = std::time::Instant::now();

    scheduler.poll(now);
    // No later refresh can reveal hidden rows, so filter at fetch time.
    let query = RefreshQuery::from_config(config).with_filter(config.fetch_filter());
    let outcome = run_refresh_cycle(client, &query).await;
    scheduler.complete(outcome, &mut notifier, now);

    let rows = build_rows(&scheduler.snapshot(), DisplayFilter::from_config(config), &Local);
    for row in &rows {
        println!("{}\t{}\t{}\t{}", row.time, row.channel, row.title, row.url);
    }
    info!("Printed {} rows", rows.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    // A one-shot run never writes; the TUI creates the file so edits have a home.
    let file_config = if cli.once {
        Config::load_or_default(&config_path)?
    } else {
        Config::load(&config_path)?
    };
    let config = cli.apply_overrides(file_config.clone());

    let level: LevelFilter = cli
        .log_level
        .parse()
        .map_err(|e| anyhow!("Invalid log level '{}': {}", cli.log_level, e))?;
    if cli.once {
        init_stderr_logging(level);
    } else {
        let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
        init_file_logging(&log_path, level)?;
    }
    info!("Using config {}", config_path.display());

    let source = HttpVideoSource::new(&config.api_key).context("Failed to build Holodex client")?;
    let client = Arc::new(VideoSourceClient::new(Arc::new(source)));

    if cli.once {
        return run_once(&config, &client).await;
    }

    // Session overrides must not end up in the file when a flag is toggled.
    let writable_path = (config == file_config).then_some(config_path);
    let app = App::new(config, writable_path, client, Handle::current());

    // The UI loop blocks on terminal input; keep it off the async workers.
    tokio::task::spawn_blocking(move || app::start_ui(app)).await?
}
