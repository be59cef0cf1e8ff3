//! Read-only view of the download-history archive.
//!
//! The archive is written by yt-dlp (`--download-archive`), one `<extractor> <id>`
//! record per line. The engine treats it as an opaque key set: membership by media id
//! and size, used for diagnostics and the `archive` CLI command.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::error::AppResult;

/// Identifier membership test over the archive.
pub trait ArchiveStore {
    fn contains(&self, media_id: &str) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot of a yt-dlp archive file.
#[derive(Debug, Clone, Default)]
pub struct ArchiveFile {
    path: PathBuf,
    ids: HashSet<String>,
}

impl ArchiveFile {
    /// Loads the archive. A missing file is an empty archive.
    pub async fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::parse(path, &content))
    }

    fn parse(path: PathBuf, content: &str) -> Self {
        let ids = content
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let first = parts.next()?;
                // "<extractor> <id>"; tolerate bare ids
                Some(parts.next().unwrap_or(first).to_string())
            })
            .collect();
        Self { path, ids }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveStore for ArchiveFile {
    fn contains(&self, media_id: &str) -> bool {
        self.ids.contains(media_id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
