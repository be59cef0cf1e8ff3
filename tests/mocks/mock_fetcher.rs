//! Scripted fetcher
//!
//! Each call consumes the next [`MockResponse`]. Downloads write real (tiny) files
//! under the download root so the runner's directory scan and the compositor see them.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

use tubeforge::download::error::{FetchError, FetchErrorKind};
use tubeforge::download::fetcher::{CredentialMode, FetchProgress, FetchRequest, Fetched, FetchedMedia, MediaFetcher};

/// Media a scripted download produces.
#[derive(Debug, Clone)]
pub struct MockMedia {
    pub id: &'static str,
    pub title: &'static str,
    pub uploader: &'static str,
    /// File names created inside the per-video directory
    pub files: Vec<&'static str>,
}

impl MockMedia {
    pub fn new(id: &'static str, files: Vec<&'static str>) -> Self {
        Self {
            id,
            title: "Clip",
            uploader: "Alice",
            files,
        }
    }

    pub fn dir_name(&self) -> String {
        format!("{} - {} [{}]", self.uploader, self.title, self.id)
    }
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Download(MockMedia),
    Archived(&'static str),
    Fail(FetchErrorKind, &'static str),
    Panic(&'static str),
    /// Waits for the notify before producing the inner response
    Gated(Arc<Notify>, Box<MockResponse>),
}

pub struct MockFetcher {
    root: PathBuf,
    responses: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new(root: impl Into<PathBuf>, responses: Vec<MockResponse>) -> Self {
        Self {
            root: root.into(),
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn credential_modes(&self) -> Vec<CredentialMode> {
        self.calls().iter().map(|c| c.credential).collect()
    }

    fn write_media(&self, media: &MockMedia) -> FetchedMedia {
        let dir = self.root.join(media.dir_name());
        std::fs::create_dir_all(&dir).unwrap();
        for file in &media.files {
            std::fs::write(dir.join(file), b"data").unwrap();
        }
        FetchedMedia {
            media_id: media.id.to_string(),
            title: media.title.to_string(),
            uploader: media.uploader.to_string(),
            file_paths: Vec::new(),
        }
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: mpsc::UnboundedSender<FetchProgress>,
    ) -> Result<Fetched, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        let mut response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockResponse::Fail(FetchErrorKind::Other, "no scripted response"));

        while let MockResponse::Gated(gate, inner) = response {
            gate.notified().await;
            response = *inner;
        }

        match response {
            MockResponse::Download(media) => {
                let _ = progress.send(FetchProgress::Downloading { percent: 50.0 });
                let _ = progress.send(FetchProgress::Finished);
                Ok(Fetched::Downloaded(self.write_media(&media)))
            }
            MockResponse::Archived(id) => Ok(Fetched::AlreadyArchived {
                media_id: Some(id.to_string()),
            }),
            MockResponse::Fail(kind, message) => Err(FetchError::new(kind, message)),
            MockResponse::Panic(message) => panic!("{}", message),
            MockResponse::Gated(..) => unreachable!(),
        }
    }
}
