//! Artifact handoff.
//!
//! The finished overlay is handed to an [`ArtifactSink`] while the render
//! workspace still exists; the workspace is removed afterwards.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::WorkerResult;
use bowl_media::fs_utils::file_size;
use bowl_media::{generate_thumbnail, move_file};

/// Location of a delivered overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactHandle {
    pub id: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub size_bytes: u64,
}

/// Persists a finished overlay and returns where it can be fetched.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Take ownership of `local_path` (it may be moved) and publish it under
    /// `logical_id`.
    async fn publish(&self, local_path: &Path, logical_id: &str) -> WorkerResult<ArtifactHandle>;
}

/// Stores artifacts in a local directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactSink {
    root: PathBuf,
    base_url: Option<String>,
}

impl LocalArtifactSink {
    pub fn new(root: impl AsRef<Path>, base_url: Option<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    fn url_for(&self, file_name: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/{file_name}"),
            None => format!("file://{}", self.root.join(file_name).display()),
        }
    }
}

#[async_trait]
impl ArtifactSink for LocalArtifactSink {
    async fn publish(&self, local_path: &Path, logical_id: &str) -> WorkerResult<ArtifactHandle> {
        tokio::fs::create_dir_all(&self.root).await?;

        let video_name = format!("{logical_id}.mp4");
        let thumb_name = format!("{logical_id}.jpg");
        let thumb_path = self.root.join(&thumb_name);

        // Poster frames are optional
        let thumbnail_url = match generate_thumbnail(local_path, &thumb_path).await {
            Ok(()) if thumb_path.exists() => Some(self.url_for(&thumb_name)),
            Ok(()) => None,
            Err(e) => {
                warn!(id = %logical_id, error = %e, "Thumbnail generation failed");
                None
            }
        };

        let video_path = self.root.join(&video_name);
        move_file(local_path, &video_path).await?;
        let size_bytes = file_size(&video_path).await;

        info!(id = %logical_id, path = %video_path.display(), size_bytes, "Artifact stored");

        Ok(ArtifactHandle {
            id: logical_id.to_string(),
            video_url: self.url_for(&video_name),
            thumbnail_url,
            size_bytes,
        })
    }
}
