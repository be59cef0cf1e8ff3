//! The "extract + download" capability.
//!
//! [`MediaFetcher`] is the seam between the job runner and whatever actually talks to
//! video sites. [`YtDlpFetcher`] drives the `yt-dlp` binary; tests plug in fakes.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::core::config::{self, EngineConfig};
use crate::download::error::{FetchError, FetchErrorKind};
use crate::download::format::FetchSpec;
use crate::download::ytdlp_errors::{fetch_error_from_stderr, CredentialErrorRules};

/// Whether an attempt may use the user's browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    /// Browser-session cookies, unlocks restricted / higher quality streams
    Privileged,
    /// No credential context
    Anonymous,
}

impl CredentialMode {
    pub fn label(self) -> &'static str {
        match self {
            CredentialMode::Privileged => "privileged",
            CredentialMode::Anonymous => "anonymous",
        }
    }
}

/// Everything one fetch attempt needs.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub spec: FetchSpec,
    /// Output template with the per-video directory
    pub output_template: String,
    pub credential: CredentialMode,
    pub write_thumbnail: bool,
    /// Ordered subtitle tags; `None` disables subtitle download
    pub subtitle_langs: Option<Vec<&'static str>>,
}

/// Progress callbacks from a running fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchProgress {
    /// Download percentage of the current stream (0-100)
    Downloading { percent: f64 },
    /// A stream finished downloading; merging/transcoding follows
    Finished,
    /// Non-fatal warning worth showing to the user
    Warning(String),
    /// Error line that is not credential-related
    Error(String),
}

/// Metadata of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub media_id: String,
    pub title: String,
    pub uploader: String,
    /// Final paths reported by the fetcher, in completion order
    pub file_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Downloaded(FetchedMedia),
    /// The archive already lists the item; nothing was downloaded
    AlreadyArchived { media_id: Option<String> },
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Runs one attempt, streaming progress through `progress`.
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: mpsc::UnboundedSender<FetchProgress>,
    ) -> Result<Fetched, FetchError>;
}

/// `--print` template emitting one JSON record per finished file.
const METADATA_PRINT: &str = "after_move:%(.{id,title,uploader,filepath})j";

/// Fetcher backed by the yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    ytdlp_bin: String,
    ffmpeg_bin: String,
    archive_file: PathBuf,
    cookies_browser: String,
    user_agent: String,
    referer: Option<String>,
    timeout: Duration,
    rules: CredentialErrorRules,
}

impl YtDlpFetcher {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            ytdlp_bin: config.ytdlp_bin.clone(),
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            archive_file: config.archive_file.clone(),
            cookies_browser: config.cookies_browser.clone(),
            user_agent: config.user_agent.clone(),
            referer: config.referer.clone(),
            timeout: config.fetch_timeout,
            rules: config.credential_rules.clone(),
        }
    }

    /// Builds the yt-dlp argument list for one attempt.
    pub fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let retries = config::download::YTDLP_RETRIES.to_string();
        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--progress".into(),
            "--no-playlist".into(),
            "--no-check-certificate".into(),
            "--retries".into(),
            retries.clone(),
            "--fragment-retries".into(),
            retries,
            "--download-archive".into(),
            self.archive_file.to_string_lossy().into_owned(),
            "--user-agent".into(),
            self.user_agent.clone(),
            "-o".into(),
            request.output_template.clone(),
            "-f".into(),
            request.spec.format.to_string(),
            "--print".into(),
            METADATA_PRINT.into(),
        ];

        // A bare binary name is resolved through PATH by yt-dlp itself
        if Path::new(&self.ffmpeg_bin).components().count() > 1 {
            args.push("--ffmpeg-location".into());
            args.push(self.ffmpeg_bin.clone());
        }

        if let Some(referer) = &self.referer {
            args.push("--referer".into());
            args.push(referer.clone());
        }

        if let Some(merge) = request.spec.merge_output {
            args.push("--merge-output-format".into());
            args.push(merge.into());
        }

        if let Some(audio) = request.spec.extract_audio {
            args.push("--extract-audio".into());
            args.push("--audio-format".into());
            args.push(audio.codec.into());
            args.push("--audio-quality".into());
            args.push(format!("{}K", audio.bitrate_kbps));
        }

        if request.write_thumbnail {
            args.push("--write-thumbnail".into());
        }

        if let Some(langs) = request.subtitle_langs.as_ref().filter(|_| request.spec.subtitles_allowed) {
            args.push("--write-subs".into());
            args.push("--sub-langs".into());
            args.push(langs.join(","));
        }

        if request.credential == CredentialMode::Privileged {
            args.push("--cookies-from-browser".into());
            args.push(self.cookies_browser.clone());
        }

        args.push("--".into());
        args.push(request.url.clone());
        args
    }

    async fn run(
        &self,
        request: &FetchRequest,
        progress: mpsc::UnboundedSender<FetchProgress>,
    ) -> Result<Fetched, FetchError> {
        let args = self.build_args(request);
        log::info!(
            "Running {} ({} attempt) for {}",
            self.ytdlp_bin,
            request.credential.label(),
            request.url
        );
        log::debug!("yt-dlp args: {:?}", args);

        let mut child = Command::new(&self.ytdlp_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FetchError::new(
                    FetchErrorKind::Spawn,
                    format!("Failed to start downloader '{}': {}", self.ytdlp_bin, e),
                )
            })?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, line_tx.clone()));
        }
        drop(line_tx);

        let mut records = Vec::new();
        let mut archived_id = None;
        let mut error_lines = Vec::new();
        let mut stderr_tail: Vec<String> = Vec::new();

        while let Some(line) = line_rx.recv().await {
            match parse_line(&line) {
                OutputLine::Metadata(record) => records.push(record),
                OutputLine::Archived(id) => archived_id = Some(id),
                OutputLine::Progress(percent) => {
                    let _ = progress.send(FetchProgress::Downloading { percent });
                    if percent >= 100.0 {
                        let _ = progress.send(FetchProgress::Finished);
                    }
                }
                OutputLine::Warning(text) => {
                    log::warn!("[yt-dlp] {}", text);
                    let _ = progress.send(FetchProgress::Warning(text));
                }
                OutputLine::Error(text) => {
                    if self.rules.matches(&text) {
                        // Handled by the retry policy, keep it out of the UI
                        log::warn!("[yt-dlp suppressed] {}", text);
                    } else {
                        log::error!("[yt-dlp] {}", text);
                        let _ = progress.send(FetchProgress::Error(text.clone()));
                    }
                    error_lines.push(text);
                }
                OutputLine::Other => {
                    log::trace!("[yt-dlp] {}", line);
                    stderr_tail.push(line);
                    if stderr_tail.len() > 20 {
                        stderr_tail.remove(0);
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| FetchError::new(FetchErrorKind::Other, format!("Failed to wait for yt-dlp: {}", e)))?;

        if !status.success() {
            return Err(fetch_error_from_stderr(&error_lines, &stderr_tail.join("\n"), &self.rules));
        }

        Ok(fetched_from_records(records, archived_id))
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: mpsc::UnboundedSender<FetchProgress>,
    ) -> Result<Fetched, FetchError> {
        match tokio::time::timeout(self.timeout, self.run(request, progress)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                FetchErrorKind::Timeout,
                format!("yt-dlp did not finish within {}s", self.timeout.as_secs()),
            )),
        }
    }
}

async fn forward_lines<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    // Output may not be UTF-8 (legacy code pages). Must drain to EOF: a closed pipe
    // kills yt-dlp with SIGPIPE.
    let mut segments = BufReader::new(stream).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(raw)) => {
                let line = String::from_utf8_lossy(&raw);
                let _ = tx.send(line.trim_end_matches('\r').to_string());
            }
            Ok(None) => break,
            Err(e) => {
                log::warn!("Failed to read yt-dlp output: {}", e);
                break;
            }
        }
    }
}

/// One JSON record printed after a file reached its final location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct MetadataRecord {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    filepath: Option<String>,
}

#[derive(Debug, PartialEq)]
enum OutputLine {
    Metadata(MetadataRecord),
    Archived(String),
    Progress(f64),
    Warning(String),
    Error(String),
    Other,
}

fn parse_line(line: &str) -> OutputLine {
    let trimmed = line.trim();
    if trimmed.starts_with('{') {
        if let Ok(record) = serde_json::from_str::<MetadataRecord>(trimmed) {
            return OutputLine::Metadata(record);
        }
    }
    if let Some(rest) = trimmed.strip_prefix("WARNING:") {
        return OutputLine::Warning(rest.trim().to_string());
    }
    if trimmed.starts_with("ERROR:") {
        return OutputLine::Error(trimmed.to_string());
    }
    if let Some(id) = parse_archived(trimmed) {
        return OutputLine::Archived(id);
    }
    if let Some(percent) = parse_progress(trimmed) {
        return OutputLine::Progress(percent);
    }
    OutputLine::Other
}

/// Parses progress from a yt-dlp output line
/// Example: "[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10"
pub fn parse_progress(line: &str) -> Option<f64> {
    if !line.starts_with("[download]") || !line.contains('%') {
        return None;
    }
    line.split_whitespace()
        .find(|part| part.ends_with('%'))
        .and_then(|part| part.trim_end_matches('%').parse::<f64>().ok())
        .map(|p| p.clamp(0.0, 100.0))
}

/// "[download] <name> has already been recorded in the archive"
fn parse_archived(line: &str) -> Option<String> {
    let rest = line.strip_prefix("[download]")?;
    let name = rest.trim().strip_suffix("has already been recorded in the archive")?;
    Some(name.trim().trim_end_matches(':').trim().to_string())
}

/// A successful run without any after-move record means the archive check skipped
/// the item before anything was written.
fn fetched_from_records(records: Vec<MetadataRecord>, archived_id: Option<String>) -> Fetched {
    let Some(first) = records.first() else {
        if archived_id.is_none() {
            log::warn!("yt-dlp succeeded without an after-move record or archive notice; assuming archived");
        }
        return Fetched::AlreadyArchived { media_id: archived_id };
    };

    Fetched::Downloaded(FetchedMedia {
        media_id: first.id.clone(),
        title: first.title.clone().unwrap_or_else(|| "NA".to_string()),
        uploader: first.uploader.clone().unwrap_or_else(|| "NA".to_string()),
        file_paths: records
            .iter()
            .filter_map(|r| r.filepath.as_ref().map(PathBuf::from))
            .collect(),
    })
}
