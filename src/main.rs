use anyhow::Result;
use dotenvy::dotenv;
use simplelog::LevelFilter;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tubeforge::cli::{Cli, Commands};
use tubeforge::core::config::{self, apply_proxy, EngineConfig, Settings};
use tubeforge::core::shutdown::{ShutdownGuard, ShutdownReason};
use tubeforge::core::{init_logger, log_startup_configuration, trigger};
use tubeforge::download::{
    ArchiveFile, ArchiveStore, FfmpegTranscoder, JobRunner, LogSink, TaskInput, TaskQueue, YtDlpFetcher,
};

/// Main entry point
///
/// Parses CLI arguments, loads configuration and dispatches to the subcommand.
/// Without a subcommand the engine runs in `serve` mode.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Panics inside jobs are caught by the worker; this only records where they happened
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    init_logger(&config::LOG_FILE_PATH, level)?;

    let settings = Settings::load(Path::new(config::SETTINGS_FILE.as_str()))?;
    let engine_config = EngineConfig::from_env(&settings)?;

    let inputs = cli.command.as_ref().map(Commands::task_inputs).unwrap_or_default();
    match cli.command {
        Some(Commands::Archive { check }) => run_archive(&engine_config, check).await,
        Some(Commands::Download { .. }) => run_download(engine_config, inputs).await,
        Some(Commands::Serve { addr }) => run_serve(engine_config, addr).await,
        None => {
            log::info!("No command specified, running in serve mode");
            run_serve(engine_config, None).await
        }
    }
}

/// Wires fetcher, transcoder and runner into a queue that logs its events.
fn build_queue(config: &EngineConfig) -> (TaskQueue, tubeforge::TaskSubmitter) {
    let fetcher = Arc::new(YtDlpFetcher::from_config(config));
    let transcoder = Arc::new(FfmpegTranscoder::new(config.ffmpeg_bin.clone(), config.encode_timeout));
    let runner = JobRunner::new(fetcher, transcoder, config.download_dir.clone());
    TaskQueue::new(runner, Arc::new(LogSink))
}

async fn prepare(config: &EngineConfig) -> Result<()> {
    config.ensure_directories()?;
    apply_proxy(config.proxy.as_deref());
    let archive = ArchiveFile::load(&config.archive_file).await?;
    log_startup_configuration(config, archive.len());
    Ok(())
}

/// Run the worker and the trigger endpoint until Ctrl-C
async fn run_serve(mut config: EngineConfig, addr: Option<SocketAddr>) -> Result<()> {
    if let Some(addr) = addr {
        config.trigger_addr = addr;
    }
    prepare(&config).await?;

    let (queue, submitter) = build_queue(&config);
    let guard = ShutdownGuard::new(queue.status());
    tokio::spawn(queue.run());

    let trigger_addr = config.trigger_addr;
    let trigger_submitter = submitter.clone();
    tokio::spawn(async move {
        if let Err(e) = trigger::serve(trigger_addr, trigger_submitter).await {
            log::error!("Trigger endpoint stopped: {}", e);
        }
    });

    let reason = guard.wait().await;
    if reason == ShutdownReason::Forced {
        log::warn!("Exiting with a task still running");
    }
    Ok(())
}

/// Run the given URLs through the worker and exit when the queue drains
async fn run_download(config: EngineConfig, inputs: Vec<TaskInput>) -> Result<()> {
    prepare(&config).await?;

    let (queue, submitter) = build_queue(&config);
    for input in inputs {
        submitter.submit(input);
    }
    drop(submitter);

    let summary = queue.run().await;
    log::info!("Done: {} completed, {} failed", summary.completed, summary.failed);
    if summary.failed > 0 {
        anyhow::bail!("{} task(s) failed", summary.failed);
    }
    Ok(())
}

/// Print archive statistics, optionally checking one media id
async fn run_archive(config: &EngineConfig, check: Option<String>) -> Result<()> {
    let archive = ArchiveFile::load(&config.archive_file).await?;
    println!("Archive: {}", archive.path().display());
    println!("Entries: {}", archive.len());
    if let Some(id) = check {
        if archive.contains(&id) {
            println!("{}: recorded", id);
        } else {
            println!("{}: not recorded", id);
        }
    }
    Ok(())
}
