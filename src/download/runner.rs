//! One task end to end: normalize, fetch with credential fallback, burn-in.
//!
//! # Retry policy
//!
//! The first attempt always runs with browser cookies. Only a failure the fetcher
//! classifies as [`FetchErrorKind::CredentialAccess`](crate::download::error::FetchErrorKind)
//! earns a second, anonymous attempt. Everything else is final.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::download::artifact::DownloadedArtifact;
use crate::download::compositor::{CompositeOutcome, SubtitleCompositor, Transcoder};
use crate::download::error::FetchError;
use crate::download::events::Events;
use crate::download::fetcher::{CredentialMode, FetchProgress, FetchRequest, Fetched, MediaFetcher};
use crate::download::format::{output_template, FetchSpec};
use crate::download::request::{TaskInput, TaskRequest};
use crate::download::ytdlp_errors::get_error_message;

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure(String),
    FatalFailure(String),
}

impl AttemptOutcome {
    fn from_error(err: &FetchError) -> Self {
        if err.is_retryable() {
            AttemptOutcome::RetryableFailure(err.to_string())
        } else {
            AttemptOutcome::FatalFailure(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobAttempt {
    pub credential: CredentialMode,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Downloaded(DownloadedArtifact),
    AlreadyArchived { media_id: Option<String> },
    Failed(String),
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub url: String,
    pub attempts: Vec<JobAttempt>,
    pub outcome: JobOutcome,
    /// Burn-in result; `None` when the stage did not run
    pub post_processing: Option<CompositeOutcome>,
}

impl JobReport {
    fn failed(url: String, attempts: Vec<JobAttempt>, reason: String) -> Self {
        Self {
            url,
            attempts,
            outcome: JobOutcome::Failed(reason),
            post_processing: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, JobOutcome::Failed(_))
    }
}

pub struct JobRunner {
    fetcher: Arc<dyn MediaFetcher>,
    compositor: SubtitleCompositor,
    download_root: PathBuf,
}

impl JobRunner {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        transcoder: Arc<dyn Transcoder>,
        download_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            compositor: SubtitleCompositor::new(transcoder),
            download_root: download_root.into(),
        }
    }

    /// Runs one task. Never fails: every problem ends up in the report and in `events`.
    pub async fn execute(&self, input: TaskInput, events: &Events) -> JobReport {
        let display_url = input.display_url().to_string();
        let request = match input.normalize() {
            Ok(request) => request,
            Err(e) => {
                log::error!("Rejected task {}: {}", display_url, e);
                events.log(format!("❌ Invalid task: {}", e));
                return JobReport::failed(display_url, Vec::new(), e.to_string());
            }
        };

        log::info!(
            "Task {} ({}) submitted at {}",
            request.id,
            request.quality_mode.display_name(),
            request.submitted_at
        );
        events.log(format!("🚀 Starting task: {}", request.url));
        events.log("🍪 Trying browser cookies...");

        let mut attempts = Vec::new();
        let mut result = self.attempt(&request, CredentialMode::Privileged, events).await;
        attempts.push(JobAttempt {
            credential: CredentialMode::Privileged,
            outcome: attempt_outcome(&result),
        });

        if let Err(err) = &result {
            if err.is_retryable() {
                log::warn!("Credential access failed for {}: {}", request.url, err);
                events.log("⚠️ Browser credential store is busy (locked)");
                events.log("🔄 Retrying in anonymous mode...");
                events.log(format!("🔧 Mode: {} (anonymous)", request.quality_mode.display_name()));

                result = self.attempt(&request, CredentialMode::Anonymous, events).await;
                let outcome = match &result {
                    Ok(_) => AttemptOutcome::Success,
                    // Nothing left to fall back to
                    Err(e) => AttemptOutcome::FatalFailure(e.to_string()),
                };
                attempts.push(JobAttempt {
                    credential: CredentialMode::Anonymous,
                    outcome,
                });
                if let Err(e) = &result {
                    log::error!(
                        "Anonymous attempt failed for {} [{}]: {}",
                        request.url,
                        e.kind.subcategory(),
                        e
                    );
                    events.log(format!("❌ Anonymous download failed: {}", e));
                    events.log(format!("💡 {}", get_error_message(e.kind)));
                    return JobReport::failed(request.url, attempts, e.to_string());
                }
            } else {
                log::error!(
                    "Download failed for {} [{}]: {}",
                    request.url,
                    err.kind.subcategory(),
                    err
                );
                events.log(format!("❌ Download failed: {}", err));
                events.log(format!("💡 {}", get_error_message(err.kind)));
                return JobReport::failed(request.url, attempts, err.to_string());
            }
        }

        match result {
            Ok(Fetched::AlreadyArchived { media_id }) => {
                log::info!("{} already in archive ({:?})", request.url, media_id);
                events.log("📚 Already downloaded (recorded in archive), skipping");
                JobReport {
                    url: request.url,
                    attempts,
                    outcome: JobOutcome::AlreadyArchived { media_id },
                    post_processing: None,
                }
            }
            Ok(Fetched::Downloaded(media)) => {
                let artifact =
                    match DownloadedArtifact::locate(&self.download_root, request.quality_mode, &media).await {
                        Ok(artifact) => artifact,
                        Err(e) => {
                            log::error!("Failed to locate output of {}: {}", request.url, e);
                            events.log(format!("❌ Failed to locate downloaded files: {}", e));
                            return JobReport::failed(request.url, attempts, e.to_string());
                        }
                    };
                events.log(format!("✅ Downloaded: {}", artifact.output_dir.display()));

                let post_processing = self.post_process(&request, &artifact, events).await;
                JobReport {
                    url: request.url,
                    attempts,
                    outcome: JobOutcome::Downloaded(artifact),
                    post_processing,
                }
            }
            // Both error paths returned above
            Err(e) => JobReport::failed(request.url, attempts, e.to_string()),
        }
    }

    async fn post_process(
        &self,
        request: &TaskRequest,
        artifact: &DownloadedArtifact,
        events: &Events,
    ) -> Option<CompositeOutcome> {
        if !request.wants_burn_in() {
            return None;
        }
        let Some(video) = artifact.container_file.as_ref() else {
            log::warn!("No video container found in {}", artifact.output_dir.display());
            return None;
        };
        Some(
            self.compositor
                .burn_in(video, request.save_subtitle_file, events)
                .await,
        )
    }

    async fn attempt(
        &self,
        request: &TaskRequest,
        credential: CredentialMode,
        events: &Events,
    ) -> Result<Fetched, FetchError> {
        let fetch_request = FetchRequest {
            url: request.url.clone(),
            spec: FetchSpec::for_mode(request.quality_mode),
            output_template: output_template(&self.download_root),
            credential,
            write_thumbnail: request.save_cover,
            subtitle_langs: request
                .wants_subtitle_files()
                .then(|| request.subtitle_language.tags().to_vec()),
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let fetch = self.fetcher.fetch(&fetch_request, tx);
        tokio::pin!(fetch);

        let result = loop {
            tokio::select! {
                result = &mut fetch => break result,
                Some(progress) = rx.recv() => forward_progress(progress, events),
            }
        };
        while let Ok(progress) = rx.try_recv() {
            forward_progress(progress, events);
        }
        result
    }
}

fn attempt_outcome(result: &Result<Fetched, FetchError>) -> AttemptOutcome {
    match result {
        Ok(_) => AttemptOutcome::Success,
        Err(e) => AttemptOutcome::from_error(e),
    }
}

fn forward_progress(progress: FetchProgress, events: &Events) {
    match progress {
        FetchProgress::Downloading { percent } => {
            events.progress(percent);
            events.status(format!("Downloading... {:.1}%", percent));
        }
        FetchProgress::Finished => {
            events.progress(100.0);
            events.status("Processing...");
        }
        FetchProgress::Warning(text) => events.log(format!("⚠️ {}", text)),
        FetchProgress::Error(text) => events.log(format!("❌ {}", text)),
    }
}
