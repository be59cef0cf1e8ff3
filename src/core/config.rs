//! Engine configuration.
//!
//! Values come from (lowest to highest priority): built-in defaults, the optional JSON
//! settings file, environment variables (a `.env` file is loaded by `main`).
//! The core reads the result only; nothing here is written back.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{AppError, AppResult};
use crate::download::ytdlp_errors::CredentialErrorRules;

/// Log file path
/// Read from TUBEFORGE_LOG_FILE environment variable
/// Default: tubeforge.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("TUBEFORGE_LOG_FILE").unwrap_or_else(|_| "tubeforge.log".to_string()));

/// Settings file path
/// Read from TUBEFORGE_SETTINGS_FILE environment variable
/// Default: data/settings.json
pub static SETTINGS_FILE: Lazy<String> =
    Lazy::new(|| env::var("TUBEFORGE_SETTINGS_FILE").unwrap_or_else(|_| "data/settings.json".to_string()));

/// Download configuration
pub mod download {
    use super::Duration;

    /// Wall-clock ceiling for one yt-dlp attempt (in seconds)
    pub const FETCH_TIMEOUT_SECS: u64 = 3600;

    /// Wall-clock ceiling for one ffmpeg burn-in run (in seconds)
    pub const ENCODE_TIMEOUT_SECS: u64 = 7200;

    /// yt-dlp network retries and fragment retries
    pub const YTDLP_RETRIES: u32 = 10;

    /// Browser whose session cookies unlock restricted streams
    pub const DEFAULT_COOKIES_BROWSER: &str = "edge";

    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

    pub fn fetch_timeout() -> Duration {
        Duration::from_secs(FETCH_TIMEOUT_SECS)
    }

    pub fn encode_timeout() -> Duration {
        Duration::from_secs(ENCODE_TIMEOUT_SECS)
    }
}

/// Trigger endpoint configuration
pub mod trigger {
    /// Default listen address for the HTTP trigger
    pub const DEFAULT_ADDR: &str = "127.0.0.1:12345";
}

/// Keys read from the JSON settings file. Unknown keys (theme etc.) are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Settings {
    /// Loads the settings file. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolved engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root under which per-video directories are created
    pub download_dir: PathBuf,
    pub ytdlp_bin: String,
    /// Transcoder binary (name on PATH or explicit path)
    pub ffmpeg_bin: String,
    /// yt-dlp download archive
    pub archive_file: PathBuf,
    pub cookies_browser: String,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub referer: Option<String>,
    pub trigger_addr: SocketAddr,
    pub fetch_timeout: Duration,
    pub encode_timeout: Duration,
    pub credential_rules: CredentialErrorRules,
}

impl EngineConfig {
    /// Builds the configuration from the process environment and the settings file.
    pub fn from_env(settings: &Settings) -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok(), settings)
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, settings: &Settings) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let download_dir = var("TUBEFORGE_DOWNLOAD_DIR")
            .or_else(|| settings.download_dir.clone().filter(|d| !d.trim().is_empty()))
            .unwrap_or_else(|| "Downloads".to_string());
        let archive_file = var("TUBEFORGE_ARCHIVE_FILE").unwrap_or_else(|| "data/archive.txt".to_string());

        let proxy = var("TUBEFORGE_PROXY").or_else(|| {
            settings
                .proxy
                .as_ref()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
        });

        let trigger_addr = var("TUBEFORGE_TRIGGER_ADDR").unwrap_or_else(|| trigger::DEFAULT_ADDR.to_string());
        let trigger_addr = trigger_addr
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("invalid TUBEFORGE_TRIGGER_ADDR '{}': {}", trigger_addr, e)))?;

        let fetch_timeout = parse_secs(var("TUBEFORGE_FETCH_TIMEOUT_SECS"), "TUBEFORGE_FETCH_TIMEOUT_SECS")?
            .unwrap_or_else(download::fetch_timeout);
        let encode_timeout = parse_secs(var("TUBEFORGE_ENCODE_TIMEOUT_SECS"), "TUBEFORGE_ENCODE_TIMEOUT_SECS")?
            .unwrap_or_else(download::encode_timeout);

        let credential_rules = var("TUBEFORGE_CREDENTIAL_ERROR_PATTERNS")
            .map(|list| CredentialErrorRules::parse_list(&list))
            .unwrap_or_default();

        Ok(Self {
            download_dir: expand_path(&download_dir),
            ytdlp_bin: var("TUBEFORGE_YTDLP_BIN").unwrap_or_else(|| "yt-dlp".to_string()),
            ffmpeg_bin: var("TUBEFORGE_FFMPEG_BIN")
                .map(|p| expand_path(&p).to_string_lossy().into_owned())
                .unwrap_or_else(|| "ffmpeg".to_string()),
            archive_file: expand_path(&archive_file),
            cookies_browser: var("TUBEFORGE_COOKIES_BROWSER")
                .unwrap_or_else(|| download::DEFAULT_COOKIES_BROWSER.to_string()),
            proxy,
            user_agent: var("TUBEFORGE_USER_AGENT").unwrap_or_else(|| download::DEFAULT_USER_AGENT.to_string()),
            referer: var("TUBEFORGE_REFERER"),
            trigger_addr,
            fetch_timeout,
            encode_timeout,
            credential_rules,
        })
    }

    /// Creates the download root and the archive's parent directory.
    pub fn ensure_directories(&self) -> AppResult<()> {
        std::fs::create_dir_all(&self.download_dir)?;
        if let Some(parent) = self.archive_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

fn parse_secs(value: Option<String>, key: &str) -> AppResult<Option<Duration>> {
    value
        .map(|v| {
            v.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| AppError::Config(format!("invalid {} '{}': {}", key, v, e)))
        })
        .transpose()
}

/// Expands a leading `~` in a path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Applies the proxy process-wide so every spawned downloader inherits it.
///
/// Must run before the worker starts.
pub fn apply_proxy(proxy: Option<&str>) {
    if let Some(proxy) = proxy {
        env::set_var("http_proxy", proxy);
        env::set_var("https_proxy", proxy);
        log::info!("Proxy applied process-wide");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[]), &Settings::default()).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("Downloads"));
        assert_eq!(config.ytdlp_bin, "yt-dlp");
        assert_eq!(config.ffmpeg_bin, "ffmpeg");
        assert_eq!(config.archive_file, PathBuf::from("data/archive.txt"));
        assert_eq!(config.cookies_browser, "edge");
        assert_eq!(config.proxy, None);
        assert_eq!(config.trigger_addr.port(), 12345);
        assert_eq!(config.fetch_timeout, download::fetch_timeout());
        assert_eq!(config.credential_rules, CredentialErrorRules::default());
    }

    #[test]
    fn test_env_overrides_settings() {
        let settings = Settings {
            download_dir: Some("/from/settings".to_string()),
            proxy: Some("http://settings:1".to_string()),
        };
        let config = EngineConfig::from_lookup(
            lookup(&[
                ("TUBEFORGE_DOWNLOAD_DIR", "/from/env"),
                ("TUBEFORGE_FETCH_TIMEOUT_SECS", "90"),
                ("TUBEFORGE_CREDENTIAL_ERROR_PATTERNS", "keyring"),
            ]),
            &settings,
        )
        .unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/from/env"));
        assert_eq!(config.proxy.as_deref(), Some("http://settings:1"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(90));
        assert_eq!(config.credential_rules.patterns(), &["keyring".to_string()]);
    }

    #[test]
    fn test_blank_settings_values_are_ignored() {
        let settings = Settings {
            download_dir: Some("  ".to_string()),
            proxy: Some("".to_string()),
        };
        let config = EngineConfig::from_lookup(lookup(&[]), &settings).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("Downloads"));
        assert_eq!(config.proxy, None);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = EngineConfig::from_lookup(lookup(&[("TUBEFORGE_TRIGGER_ADDR", "nope")]), &Settings::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = EngineConfig::from_lookup(
            lookup(&[("TUBEFORGE_ENCODE_TIMEOUT_SECS", "soon")]),
            &Settings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("TUBEFORGE_ENCODE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_settings_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"download_dir": "D:/Media", "proxy": "", "theme": "light"}"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.download_dir.as_deref(), Some("D:/Media"));
        assert_eq!(settings.proxy.as_deref(), Some(""));

        assert_eq!(Settings::load(&dir.path().join("missing.json")).unwrap(), Settings::default());

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(AppError::Settings(_))));
    }
}
