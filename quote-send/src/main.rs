//! quote-send - Publish generated quote images inside safe posting windows
//!
//! Runs a single generate → render → publish cycle, or stays up and fires
//! one cycle per posting window when a schedule trigger is configured.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use libquotecast::clock::{Clock, Delay, NoDelay, SystemClock, TokioDelay};
use libquotecast::config::{gemini_api_key, password, ENV_PASSWORD};
use libquotecast::coordinator::{RunCoordinator, RunOutcome};
use libquotecast::dispatch::{log_outcome, Dispatcher};
use libquotecast::generation::{FallbackSource, GeminiSource, QuoteSource};
use libquotecast::logging::{LogFormat, LoggingConfig};
use libquotecast::platforms::dry_run::DryRunPlatform;
use libquotecast::platforms::http::HttpPlatform;
use libquotecast::platforms::Platform;
use libquotecast::render::ImageRenderer;
use libquotecast::{
    Config, ConfigError, PublishPipeline, QuotecastError, SchedulerState, SharedState,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "quote-send")]
#[command(version)]
#[command(about = "Publish generated quote images inside safe posting windows")]
#[command(long_about = "\
quote-send - Publish generated quote images inside safe posting windows

DESCRIPTION:
    Each run generates a short motivational quote, renders it onto a
    1080x1350 JPEG and uploads it with a hashtag caption. A run only
    publishes inside a posting window, below the daily cap, after the
    minimum interval since the last post and outside any abuse cooldown.

    Without a [schedule] trigger the program runs once and exits. With a
    trigger it stays in the foreground and fires once per posting window
    at a randomized minute.

USAGE:
    # Single run against the configured platform
    quote-send --once

    # Render and go through the gate without uploading
    quote-send --once --dry-run

    # Scheduled mode with JSON logs
    QUOTECAST_TRIGGER=windows quote-send --log-format json

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current run)

CONFIGURATION:
    Configuration file: ~/.config/quotecast/config.toml
    Secrets: QUOTECAST_PASSWORD, QUOTECAST_GEMINI_API_KEY

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
")]
struct Cli {
    /// Run a single cycle and exit, even if a schedule is configured
    #[arg(long)]
    once: bool,

    /// Go through every step without uploading
    #[arg(long)]
    dry_run: bool,

    /// Configuration file (defaults to ~/.config/quotecast/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    LoggingConfig::resolve(cli.log_format, cli.verbose).init();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            exit_code(&e)
        }
    };
    std::process::exit(code);
}

fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<QuotecastError>() {
        return e.exit_code();
    }
    if error.downcast_ref::<ConfigError>().is_some() {
        return 2;
    }
    1
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let policy = Arc::new(config.policy()?);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (platform, handle, delay) = build_platform(&config, cli.dry_run)?;
    let source = build_source(&config)?;
    let renderer = Arc::new(ImageRenderer::new(config.font_path(), config.output_path()));

    let state = SharedState::new(SchedulerState::new(clock.now()));
    let pipeline = Arc::new(PublishPipeline::new(
        platform,
        policy.clone(),
        state.clone(),
        delay,
        clock.clone(),
    ));
    let coordinator = Arc::new(RunCoordinator::new(
        source,
        renderer,
        pipeline,
        state,
        clock.clone(),
        handle,
    ));

    info!("quote-send starting");

    if cli.once || !config.scheduled() {
        let outcome = coordinator.run_once().await;
        log_outcome(&outcome);
        if let RunOutcome::Failed { error, .. } = outcome {
            return Err(error.into());
        }
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone()).context("Signal setup failed")?;

    Dispatcher::from_policy(&policy)
        .run(coordinator, clock, shutdown)
        .await;

    info!("quote-send stopped");
    Ok(())
}

fn build_platform(
    config: &Config,
    dry_run: bool,
) -> libquotecast::Result<(Box<dyn Platform>, String, Arc<dyn Delay>)> {
    if dry_run {
        let handle = config.username().unwrap_or("dry-run").to_string();
        info!("Dry run: nothing will be uploaded and pauses are skipped");
        return Ok((
            Box::new(DryRunPlatform::new(handle.clone())),
            handle,
            Arc::new(NoDelay),
        ));
    }

    let username = config.username()?.to_string();
    let base_url = config.base_url()?;
    let password =
        password().ok_or_else(|| ConfigError::MissingField(ENV_PASSWORD.to_string()))?;
    let platform = HttpPlatform::new(
        base_url,
        username.clone(),
        password,
        config.platform_timeout()?,
    )?;
    Ok((Box::new(platform), username, Arc::new(TokioDelay)))
}

fn build_source(config: &Config) -> anyhow::Result<Arc<dyn QuoteSource>> {
    match gemini_api_key() {
        Some(key) => Ok(Arc::new(GeminiSource::new(
            Some(key),
            config.gemini_config()?,
        )?)),
        None => {
            warn!("QUOTECAST_GEMINI_API_KEY not set, using the built-in quotes");
            Ok(Arc::new(FallbackSource))
        }
    }
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::sync::atomic::Ordering;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            info!("Received shutdown signal, stopping after the current run...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
    Ok(())
}
