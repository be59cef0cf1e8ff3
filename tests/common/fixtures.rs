//! Test fixtures
//!
//! [`Harness`] wires a scripted fetcher, a recording transcoder and a recording sink
//! into a real job runner / task queue over a temporary download root.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use tubeforge::core::config::{EngineConfig, Settings};
use tubeforge::download::events::Events;
use tubeforge::download::queue::{TaskQueue, TaskSubmitter};
use tubeforge::download::runner::JobRunner;

use super::recorder::RecordingSink;
use crate::mocks::{MockFetcher, MockResponse, MockTranscoder};

pub struct Harness {
    pub root: TempDir,
    pub fetcher: Arc<MockFetcher>,
    pub transcoder: Arc<MockTranscoder>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self::with_transcoder(responses, MockTranscoder::working())
    }

    pub fn with_transcoder(responses: Vec<MockResponse>, transcoder: MockTranscoder) -> Self {
        let root = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new(root.path(), responses));
        Self {
            root,
            fetcher,
            transcoder: Arc::new(transcoder),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn video_dir(&self, dir_name: &str) -> PathBuf {
        self.root().join(dir_name)
    }

    pub fn runner(&self) -> JobRunner {
        JobRunner::new(self.fetcher.clone(), self.transcoder.clone(), self.root().to_path_buf())
    }

    pub fn events(&self) -> Events {
        Events::new(self.sink.clone())
    }

    /// Queue whose sink samples the worker's busy flag.
    pub fn queue(&self) -> (TaskQueue, TaskSubmitter) {
        let (queue, submitter) = TaskQueue::new(self.runner(), self.sink.clone());
        self.sink.watch(queue.status());
        (queue, submitter)
    }

    /// Files currently in a per-video directory, sorted.
    pub fn files_in(&self, dir_name: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.video_dir(dir_name))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Writes an executable `/bin/sh` script standing in for an external tool.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Engine configuration rooted at `root` that runs `ytdlp` as the downloader.
pub fn engine_config(root: &Path, ytdlp: &Path, fetch_timeout_secs: u64) -> EngineConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("TUBEFORGE_DOWNLOAD_DIR", root.to_string_lossy().into_owned()),
        ("TUBEFORGE_ARCHIVE_FILE", root.join("archive.txt").to_string_lossy().into_owned()),
        ("TUBEFORGE_YTDLP_BIN", ytdlp.to_string_lossy().into_owned()),
        ("TUBEFORGE_FETCH_TIMEOUT_SECS", fetch_timeout_secs.to_string()),
    ]);
    EngineConfig::from_lookup(|key| vars.get(key).cloned(), &Settings::default()).unwrap()
}
