//! Locating what a finished fetch left on disk.

use std::path::{Path, PathBuf};

use crate::core::error::AppResult;
use crate::download::fetcher::FetchedMedia;
use crate::download::format::{is_video_container, video_dir};
use crate::download::request::QualityMode;

/// Files produced by one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// Muxed video file; absent for modes without a single video container
    pub container_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub media_id: String,
    pub title: String,
    pub uploader: String,
}

impl DownloadedArtifact {
    /// Rebuilds the output directory from fetch metadata and finds the container in it.
    ///
    /// A reported file path wins over the reconstructed directory name, since the
    /// fetcher sanitizes names on its own.
    pub async fn locate(download_root: &Path, mode: QualityMode, media: &FetchedMedia) -> AppResult<Self> {
        let reported = media.file_paths.first();
        let output_dir = reported
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| video_dir(download_root, &media.uploader, &media.title, &media.media_id));

        let container_file = if mode.subtitle_eligible() {
            match reported.filter(|p| is_video_container(p)) {
                Some(path) => Some(path.clone()),
                None => find_container(&output_dir).await?,
            }
        } else {
            None
        };

        Ok(Self {
            container_file,
            output_dir,
            media_id: media.media_id.clone(),
            title: media.title.clone(),
            uploader: media.uploader.clone(),
        })
    }
}

/// First video container in `dir` by name, skipping burned-in outputs.
pub async fn find_container(dir: &Path) -> AppResult<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_master = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("_Master"));
        if is_video_container(&path) && !is_master && entry.file_type().await?.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(paths: Vec<PathBuf>) -> FetchedMedia {
        FetchedMedia {
            media_id: "id1".to_string(),
            title: "Clip".to_string(),
            uploader: "Alice".to_string(),
            file_paths: paths,
        }
    }

    #[tokio::test]
    async fn test_reported_path_is_authoritative() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Alice - Clip_ [id1]");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("Alice - Clip_ [id1].mp4");
        std::fs::write(&file, b"v").unwrap();

        let artifact = DownloadedArtifact::locate(root.path(), QualityMode::SmartMux, &media(vec![file.clone()]))
            .await
            .unwrap();
        assert_eq!(artifact.output_dir, dir);
        assert_eq!(artifact.container_file, Some(file));
    }

    #[tokio::test]
    async fn test_scans_reconstructed_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Alice - Clip [id1]");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.mkv"), b"v").unwrap();
        std::fs::write(dir.join("a_Master.mp4"), b"v").unwrap();
        std::fs::write(dir.join("a.jpg"), b"i").unwrap();

        let artifact = DownloadedArtifact::locate(root.path(), QualityMode::VideoOnly, &media(Vec::new()))
            .await
            .unwrap();
        assert_eq!(artifact.output_dir, dir);
        assert_eq!(artifact.container_file, Some(dir.join("b.mkv")));
    }

    #[tokio::test]
    async fn test_audio_mode_has_no_container() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Alice - Clip [id1]");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("x.mp4"), b"v").unwrap();

        let artifact = DownloadedArtifact::locate(root.path(), QualityMode::AudioOnly, &media(vec![dir.join("x.mp3")]))
            .await
            .unwrap();
        assert_eq!(artifact.container_file, None);
    }

    #[tokio::test]
    async fn test_missing_directory_yields_none() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(find_container(&root.path().join("gone")).await.unwrap(), None);
    }
}
