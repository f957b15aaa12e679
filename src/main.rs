mod capture;
mod config;
mod logfile;
mod notify;
mod probe;
mod supervisor;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::capture::FfmpegCapturer;
use crate::config::Config;
use crate::logfile::LogManager;
use crate::probe::StreamlinkProber;
use crate::supervisor::Supervisor;

/// A Rust CLI tool that watches a Twitch channel in a supervised loop:
/// poll liveness, record the stream when it goes live, rotate logs, repeat.
#[derive(Parser, Debug)]
#[command(name = "recwatch", version, about)]
pub struct Cli {
    /// Channel to watch (e.g. "foo" for twitch.tv/foo)
    #[arg(value_name = "CHANNEL")]
    channel: Option<String>,

    /// Output directory for recordings (overrides VIDEO_DIR)
    #[arg(short = 'o', long)]
    video_dir: Option<PathBuf>,

    /// Seconds between poll cycles (overrides INTERVAL)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Validate config and print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Extra logging (probe invocations, prune decisions)
    #[arg(short, long)]
    verbose: bool,

    /// Only warnings and errors on the console
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let Some(channel) = cli.channel else {
        eprintln!("usage: recwatch <CHANNEL>");
        return ExitCode::from(1);
    };

    let mut config = Config::from_env();
    if let Some(dir) = cli.video_dir {
        config.video_dir = dir;
    }
    if let Some(secs) = cli.interval {
        config.interval = Duration::from_secs(secs);
    }

    tracing::info!(channel = %channel, "recwatch starting");
    tracing::debug!(?config, "resolved configuration");

    if cli.dry_run {
        println!("recwatch v{}", env!("CARGO_PKG_VERSION"));
        println!("Channel:        {channel}");
        println!("Video dir:      {}", config.video_dir.display());
        println!("Log dir:        {}", config.log_dir.display());
        println!("Exit file:      {}", config.exit_file.display());
        println!("Poll interval:  {}s", config.interval.as_secs());
        println!("Retention:      {} days", config.retention_days);
        println!("Auth token:     {}", config.credential_tag());
        println!(
            "Webhook:        {}",
            if config.webhook_url.is_some() {
                "configured"
            } else {
                "none"
            }
        );
        println!("Dry run mode — config validated, not running.");
        return ExitCode::SUCCESS;
    }

    for tool in [StreamlinkProber::COMMAND, FfmpegCapturer::COMMAND] {
        if !supervisor::tool_on_path(tool) {
            tracing::error!(tool, "required external tool not found on PATH");
            return ExitCode::from(1);
        }
    }
    if config.auth_token.is_none() {
        tracing::warn!("TWITCH_AUTH_TOKEN not set, probing anonymously");
    }

    let logs = LogManager::new(&channel, &config.log_dir, config.credential_tag());
    let prober = Box::new(StreamlinkProber::new(&channel, config.auth_token.clone()));
    let notifier = notify::from_config(&config);

    let sup = Supervisor::new(
        config,
        &channel,
        logs,
        prober,
        Box::new(FfmpegCapturer),
        notifier,
    );

    // One probe up front so a dead token stops the run before the first cycle.
    if let Some(reason) = sup.preflight().await {
        return ExitCode::from(reason.code());
    }

    ExitCode::from(sup.run().await.code())
}
