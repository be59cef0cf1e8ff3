//! Task requests as submitted by producers and as executed by the worker.
//!
//! Producers hand in a [`TaskInput`] (a bare URL converts into one). The job runner
//! turns it into a fully populated [`TaskRequest`] through [`TaskInput::normalize`],
//! the single place where defaults are applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};

/// Stream selection / container mode of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum QualityMode {
    /// Best mp4 video + best m4a audio muxed into mp4
    #[default]
    SmartMux,
    /// Best video stream alone
    VideoOnly,
    /// Best audio transcoded to mp3
    AudioOnly,
    /// Best video and best audio left as separate files
    RawStreams,
    /// Like `SmartMux`, capped at 1080p
    Mux1080p,
}

impl QualityMode {
    /// Human-readable name used in log lines.
    pub fn display_name(self) -> &'static str {
        match self {
            QualityMode::SmartMux => "Smart mux (MP4)",
            QualityMode::VideoOnly => "Video stream only",
            QualityMode::AudioOnly => "Audio stream only",
            QualityMode::RawStreams => "Raw streams",
            QualityMode::Mux1080p => "1080p mux",
        }
    }

    /// Whether this mode produces one muxed video file that subtitles can be burned into.
    pub fn subtitle_eligible(self) -> bool {
        matches!(self, QualityMode::SmartMux | QualityMode::VideoOnly | QualityMode::Mux1080p)
    }
}

/// Preferred subtitle language set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SubtitleLanguage {
    #[default]
    Auto,
    ChineseSimplified,
    ChineseTraditional,
    English,
    Japanese,
}

impl SubtitleLanguage {
    /// Ordered subtitle tags handed to the fetcher; the first available one wins.
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            SubtitleLanguage::Auto => &["ja", "zh-Hans", "zh-CN", "en", "zh-Hant", "zh-TW"],
            SubtitleLanguage::ChineseSimplified => &["zh-Hans", "zh-CN", "zh"],
            SubtitleLanguage::ChineseTraditional => &["zh-Hant", "zh-TW"],
            SubtitleLanguage::English => &["en", "en-US"],
            SubtitleLanguage::Japanese => &["ja"],
        }
    }
}

/// A request as a producer submits it. Every field except `url` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub url: String,
    #[serde(default)]
    pub quality_mode: Option<QualityMode>,
    #[serde(default)]
    pub save_cover: Option<bool>,
    #[serde(default)]
    pub embed_subtitles: Option<bool>,
    #[serde(default)]
    pub save_subtitle_file: Option<bool>,
    #[serde(default)]
    pub subtitle_language: Option<SubtitleLanguage>,
}

impl TaskInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn quality_mode(mut self, mode: QualityMode) -> Self {
        self.quality_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn save_cover(mut self, save: bool) -> Self {
        self.save_cover = Some(save);
        self
    }

    #[must_use]
    pub fn embed_subtitles(mut self, embed: bool) -> Self {
        self.embed_subtitles = Some(embed);
        self
    }

    #[must_use]
    pub fn save_subtitle_file(mut self, save: bool) -> Self {
        self.save_subtitle_file = Some(save);
        self
    }

    #[must_use]
    pub fn subtitle_language(mut self, language: SubtitleLanguage) -> Self {
        self.subtitle_language = Some(language);
        self
    }

    /// Label used for lifecycle events before normalization has run.
    pub fn display_url(&self) -> &str {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            "<empty url>"
        } else {
            trimmed
        }
    }

    /// Applies defaults and validates the URL.
    ///
    /// Defaults: `SmartMux`, cover on, subtitle burn-in on, subtitle file not kept,
    /// `Auto` language list.
    pub fn normalize(self) -> AppResult<TaskRequest> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            return Err(AppError::Validation("task URL is empty".to_string()));
        }

        Ok(TaskRequest {
            id: uuid::Uuid::new_v4().to_string(),
            url,
            quality_mode: self.quality_mode.unwrap_or_default(),
            save_cover: self.save_cover.unwrap_or(true),
            embed_subtitles: self.embed_subtitles.unwrap_or(true),
            save_subtitle_file: self.save_subtitle_file.unwrap_or(false),
            subtitle_language: self.subtitle_language.unwrap_or_default(),
            submitted_at: Utc::now(),
        })
    }
}

impl From<&str> for TaskInput {
    fn from(url: &str) -> Self {
        TaskInput::new(url)
    }
}

impl From<String> for TaskInput {
    fn from(url: String) -> Self {
        TaskInput::new(url)
    }
}

/// A fully populated, immutable task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Unique task identifier (UUID)
    pub id: String,
    pub url: String,
    pub quality_mode: QualityMode,
    pub save_cover: bool,
    pub embed_subtitles: bool,
    pub save_subtitle_file: bool,
    pub subtitle_language: SubtitleLanguage,
    pub submitted_at: DateTime<Utc>,
}

impl TaskRequest {
    /// Whether the fetch should download subtitle files at all.
    pub fn wants_subtitle_files(&self) -> bool {
        (self.embed_subtitles || self.save_subtitle_file) && self.quality_mode != QualityMode::AudioOnly
    }

    /// Whether burn-in runs after a successful download.
    pub fn wants_burn_in(&self) -> bool {
        self.embed_subtitles && self.quality_mode.subtitle_eligible()
    }
}
