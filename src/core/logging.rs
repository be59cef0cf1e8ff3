//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup report of the external tools and download settings

use anyhow::Result;
use simplelog::*;
use std::fs::OpenOptions;
use std::path::Path;

use crate::core::config::EngineConfig;

/// Initialize logger for both console and file output
///
/// The log file is appended to, so history survives restarts.
///
/// # Arguments
/// * `log_file_path` - Path to the log file
/// * `level` - Minimum level for both outputs
pub fn init_logger(log_file_path: &str, level: LevelFilter) -> Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Resolves a binary name through PATH; explicit paths are checked directly.
fn locate_binary(binary: &str) -> Option<std::path::PathBuf> {
    let path = Path::new(binary);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .flat_map(|dir| [dir.join(binary), dir.join(format!("{}.exe", binary))])
        .find(|candidate| candidate.is_file())
}

/// Logs the download configuration at application startup
///
/// Reports where yt-dlp and ffmpeg were found, the browser used for cookies, the
/// proxy, the archive size and the active credential-error rules.
pub fn log_startup_configuration(config: &EngineConfig, archive_entries: usize) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🎬 tubeforge {} configuration", env!("CARGO_PKG_VERSION"));
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for (name, binary) in [("yt-dlp", &config.ytdlp_bin), ("ffmpeg", &config.ffmpeg_bin)] {
        match locate_binary(binary) {
            Some(path) => log::info!("✅ {}: {}", name, path.display()),
            None => {
                log::error!("❌ {}: '{}' not found", name, binary);
                log::error!("   Install it or point TUBEFORGE_{}_BIN at it", name.replace('-', "").to_uppercase());
            }
        }
    }

    log::info!("📁 Download directory: {}", config.download_dir.display());
    log::info!(
        "📚 Archive: {} ({} entries)",
        config.archive_file.display(),
        archive_entries
    );
    log::info!("🍪 Cookies browser: {}", config.cookies_browser);
    match &config.proxy {
        Some(proxy) => log::info!("🌐 Proxy: {}", proxy),
        None => log::info!("🌐 Proxy: none"),
    }
    log::info!(
        "🔐 Credential error patterns: {}",
        config.credential_rules.patterns().join(", ")
    );
    log::info!(
        "⏱️  Timeouts: fetch {}s, encode {}s",
        config.fetch_timeout.as_secs(),
        config.encode_timeout.as_secs()
    );
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
