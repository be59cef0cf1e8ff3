//! Recording transcoder with configurable failures

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;

use tubeforge::core::error::{AppError, AppResult};
use tubeforge::download::compositor::{EncodeJob, EncodePath, Transcoder};

pub struct MockTranscoder {
    failing: Vec<EncodePath>,
    jobs: Mutex<Vec<EncodeJob>>,
}

impl MockTranscoder {
    /// Succeeds on every path.
    pub fn working() -> Self {
        Self::failing(Vec::new())
    }

    pub fn failing(paths: Vec<EncodePath>) -> Self {
        Self {
            failing: paths,
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<EncodePath> {
        self.jobs().iter().map(|j| j.path).collect()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn encode(&self, job: &EncodeJob) -> AppResult<()> {
        self.jobs.lock().unwrap().push(job.clone());
        if self.failing.contains(&job.path) {
            return Err(AppError::Transcode(format!("{} encoder unavailable", job.path.label())));
        }
        std::fs::write(job.working_dir.join(&job.output), b"master")?;
        Ok(())
    }
}
