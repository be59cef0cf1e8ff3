//! Quality mode → yt-dlp fetch specification, and output naming.

use std::path::{Path, PathBuf};

use crate::download::request::QualityMode;

/// Name pattern shared by the per-video directory and the primary media file.
pub const OUTPUT_NAME_TEMPLATE: &str = "%(uploader)s - %(title)s [%(id)s]";

/// Audio transcode settings for [`QualityMode::AudioOnly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: &'static str,
    pub bitrate_kbps: u32,
}

/// How one quality mode is expressed to the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSpec {
    /// yt-dlp `--format` selector
    pub format: &'static str,
    /// `--merge-output-format`, when streams are muxed
    pub merge_output: Option<&'static str>,
    pub extract_audio: Option<AudioExtraction>,
    /// Whether subtitle files may be requested in this mode
    pub subtitles_allowed: bool,
}

impl FetchSpec {
    pub fn for_mode(mode: QualityMode) -> Self {
        match mode {
            QualityMode::SmartMux => FetchSpec {
                format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
                merge_output: Some("mp4"),
                extract_audio: None,
                subtitles_allowed: true,
            },
            QualityMode::VideoOnly => FetchSpec {
                format: "bestvideo",
                merge_output: None,
                extract_audio: None,
                subtitles_allowed: true,
            },
            QualityMode::AudioOnly => FetchSpec {
                format: "bestaudio/best",
                merge_output: None,
                extract_audio: Some(AudioExtraction {
                    codec: "mp3",
                    bitrate_kbps: 192,
                }),
                subtitles_allowed: false,
            },
            QualityMode::RawStreams => FetchSpec {
                format: "bestvideo,bestaudio",
                merge_output: None,
                extract_audio: None,
                subtitles_allowed: true,
            },
            QualityMode::Mux1080p => FetchSpec {
                format: "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best",
                merge_output: Some("mp4"),
                extract_audio: None,
                subtitles_allowed: true,
            },
        }
    }
}

/// Output template handed to yt-dlp: `<root>/<name>/<name>.%(ext)s`.
pub fn output_template(download_root: &Path) -> String {
    download_root
        .join(OUTPUT_NAME_TEMPLATE)
        .join(format!("{}.%(ext)s", OUTPUT_NAME_TEMPLATE))
        .to_string_lossy()
        .into_owned()
}

/// Per-video directory name rebuilt from fetch metadata: `{uploader} - {title} [{id}]`.
pub fn video_dir_name(uploader: &str, title: &str, media_id: &str) -> String {
    sanitize_path_component(&format!("{} - {} [{}]", uploader, title, media_id))
}

/// Per-video directory under the download root.
pub fn video_dir(download_root: &Path, uploader: &str, title: &str, media_id: &str) -> PathBuf {
    download_root.join(video_dir_name(uploader, title, media_id))
}

/// Replaces characters that cannot appear in a single path component.
fn sanitize_path_component(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Whether a file name looks like a video container the burn-in stage can consume.
pub fn is_video_container(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("mp4" | "webm" | "mkv")
    )
}
