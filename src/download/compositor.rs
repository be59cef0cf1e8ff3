//! Subtitle burn-in.
//!
//! Finds a subtitle file next to a downloaded video and renders a `_Master.mp4` copy
//! with the subtitles drawn into the picture. The hardware (NVENC) encoder is tried
//! first; any failure there falls back to libx264 with the same filter.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::{AppError, AppResult};
use crate::core::process::{run_with_timeout, tail};
use crate::download::events::Events;

/// Suffix appended to the video stem for the burned-in copy.
pub const MASTER_SUFFIX: &str = "_Master";

/// Language markers accepted for a same-basename `.srt`.
const SRT_LANGUAGE_MARKERS: [&str; 3] = ["zh", "CN", "en"];

/// Which encoder pipeline a job runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePath {
    /// CUDA decode + h264_nvenc
    Hardware,
    /// libx264
    Software,
}

impl EncodePath {
    pub fn label(self) -> &'static str {
        match self {
            EncodePath::Hardware => "GPU",
            EncodePath::Software => "CPU",
        }
    }
}

/// One transcoder invocation. Paths other than `working_dir` are relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJob {
    pub working_dir: PathBuf,
    pub input: String,
    pub subtitle: String,
    pub output: String,
    pub path: EncodePath,
}

impl EncodeJob {
    /// ffmpeg arguments for this job.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let filter = format!("subtitles='{}'", escape_filter_path(&self.subtitle));
        let mut args: Vec<String> = vec!["-y".into()];
        if self.path == EncodePath::Hardware {
            args.extend(["-hwaccel".into(), "cuda".into()]);
        }
        args.extend(["-i".into(), self.input.clone(), "-vf".into(), filter]);
        match self.path {
            EncodePath::Hardware => args.extend(
                ["-c:v", "h264_nvenc", "-preset", "p7", "-cq", "19"]
                    .iter()
                    .map(|s| s.to_string()),
            ),
            EncodePath::Software => args.extend(["-c:v", "libx264", "-crf", "23"].iter().map(|s| s.to_string())),
        }
        args.extend(["-c:a".into(), "copy".into(), self.output.clone()]);
        args
    }
}

/// Escapes a path for use inside a single-quoted ffmpeg filter argument.
///
/// Two unescaping levels apply: the filtergraph parser, which takes quoted text
/// literally, and the option parser. A quote therefore has to leave the quoted span,
/// appear as `\\\'` and reopen it.
fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', r"'\\\''")
}

/// The transcoding capability.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob) -> AppResult<()>;
}

/// Transcoder backed by the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn encode(&self, job: &EncodeJob) -> AppResult<()> {
        let args = job.ffmpeg_args();
        log::info!(
            "🎬 Running {} ({}) in {}: {}",
            self.binary,
            job.path.label(),
            job.working_dir.display(),
            args.join(" ")
        );

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .current_dir(&job.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = run_with_timeout(&mut cmd, self.timeout).await?;
        if output.status.success() {
            return Ok(());
        }

        Err(AppError::Transcode(format!(
            "{} encode exited with {}: {}",
            job.path.label(),
            output.status,
            tail(&output.stderr, 500)
        )))
    }
}

/// Result of one burn-in request. Never an error: failures are reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeOutcome {
    /// No subtitle file was found
    Skipped,
    Burned { output: PathBuf, encoder: EncodePath },
    Failed(String),
}

pub struct SubtitleCompositor {
    transcoder: Arc<dyn Transcoder>,
}

impl SubtitleCompositor {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }

    /// Burns the subtitle found next to `video` into a `_Master.mp4` copy.
    ///
    /// The original video is never touched. The subtitle file is removed after a
    /// successful encode unless `keep_subtitle_file` is set.
    pub async fn burn_in(&self, video: &Path, keep_subtitle_file: bool, events: &Events) -> CompositeOutcome {
        let subtitle = match discover_subtitle(video).await {
            Ok(Some(subtitle)) => subtitle,
            Ok(None) => {
                events.log("⏩ No subtitles found, skipping burn-in");
                return CompositeOutcome::Skipped;
            }
            Err(e) => {
                let reason = format!("Failed to scan for subtitles: {}", e);
                log::error!("{}", reason);
                events.log(format!("❌ {}", reason));
                return CompositeOutcome::Failed(reason);
            }
        };

        let (Some(working_dir), Some(input), Some(subtitle_name)) = (
            video.parent(),
            file_name(video),
            file_name(&subtitle),
        ) else {
            let reason = format!("Unusable video path: {}", video.display());
            events.log(format!("❌ {}", reason));
            return CompositeOutcome::Failed(reason);
        };
        let output = master_output_path(video);
        let Some(output_name) = file_name(&output) else {
            return CompositeOutcome::Failed(format!("Unusable output path: {}", output.display()));
        };

        events.status("GPU rendering...");
        events.log(format!("🔥 Burning subtitles: {}", subtitle_name));

        let mut job = EncodeJob {
            working_dir: working_dir.to_path_buf(),
            input,
            subtitle: subtitle_name,
            output: output_name,
            path: EncodePath::Hardware,
        };

        let encoder = match self.transcoder.encode(&job).await {
            Ok(()) => EncodePath::Hardware,
            Err(hw_err) => {
                log::warn!("Hardware encode failed: {}", hw_err);
                events.log("⚠️ GPU encode failed, switching to CPU...");
                events.status("CPU rendering...");
                job.path = EncodePath::Software;
                match self.transcoder.encode(&job).await {
                    Ok(()) => EncodePath::Software,
                    Err(sw_err) => {
                        let reason = format!("Subtitle burn-in failed: {}", sw_err);
                        log::error!("{}", reason);
                        events.log(format!("❌ {}", reason));
                        return CompositeOutcome::Failed(reason);
                    }
                }
            }
        };

        events.log(format!("✅ Done: burned-in copy created ({})", encoder.label()));

        if !keep_subtitle_file {
            if let Err(e) = tokio::fs::remove_file(&subtitle).await {
                log::warn!("Failed to remove subtitle {}: {}", subtitle.display(), e);
            }
        }

        CompositeOutcome::Burned { output, encoder }
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

/// `<dir>/<stem>_Master.mp4`
pub fn master_output_path(video: &Path) -> PathBuf {
    let stem = video.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    video.with_file_name(format!("{}{}.mp4", stem, MASTER_SUFFIX))
}

/// Picks the subtitle to burn into `video`.
///
/// Precedence: same-stem `.ass`, same-stem `.srt` with a zh/CN/en marker after the
/// stem, any `.ass`, any `.srt`. Names are compared in sorted order inside each tier.
pub async fn discover_subtitle(video: &Path) -> AppResult<Option<PathBuf>> {
    let Some(dir) = video.parent() else {
        return Ok(None);
    };
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    let has_ext = |name: &str, ext: &str| {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    };
    let same_stem = |name: &str| !stem.is_empty() && name.starts_with(&stem);

    let pick = names
        .iter()
        .find(|n| same_stem(n.as_str()) && has_ext(n.as_str(), "ass"))
        .or_else(|| {
            names.iter().find(|n| {
                same_stem(n.as_str())
                    && has_ext(n.as_str(), "srt")
                    && SRT_LANGUAGE_MARKERS.iter().any(|m| n[stem.len()..].contains(m))
            })
        })
        .or_else(|| names.iter().find(|n| has_ext(n.as_str(), "ass")))
        .or_else(|| names.iter().find(|n| has_ext(n.as_str(), "srt")));

    Ok(pick.map(|name| dir.join(name)))
}
