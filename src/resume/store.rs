//! Checkpoint persistence
//!
//! Checkpoints are stored as one opaque text blob addressed by name. A
//! [`BlobStore`] provides the key-value file abstraction; [`CheckpointStore`]
//! maps the blob to and from a [`CheckpointList`].

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::checkpoint::CheckpointList;
use super::{ResumeError, ResumeResult};

/// Maximum blob size read back (10 MB)
pub const MAX_BLOB_SIZE: u64 = 10 * 1024 * 1024;

/// Named text blobs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the blob, `None` if it does not exist
    async fn read(&self, name: &str) -> ResumeResult<Option<String>>;

    /// Replace the blob's contents; either the whole write lands or nothing does
    async fn write(&self, name: &str, contents: &str) -> ResumeResult<()>;
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn read(&self, name: &str) -> ResumeResult<Option<String>> {
        (**self).read(name).await
    }

    async fn write(&self, name: &str, contents: &str) -> ResumeResult<()> {
        (**self).write(name, contents).await
    }
}

/// Blobs as files in a local directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
}

impl LocalBlobStore {
    /// Store rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn read(&self, name: &str) -> ResumeResult<Option<String>> {
        let path = self.path_for(name);
        tokio::task::spawn_blocking(move || read_file(&path))
            .await
            .map_err(|e| ResumeError::IoError(e.to_string()))?
    }

    async fn write(&self, name: &str, contents: &str) -> ResumeResult<()> {
        let path = self.path_for(name);
        let contents = contents.to_string();
        tokio::task::spawn_blocking(move || write_file_atomic(&path, &contents))
            .await
            .map_err(|e| ResumeError::IoError(e.to_string()))?
    }
}

fn read_file(path: &Path) -> ResumeResult<Option<String>> {
    if !path.exists() {
        debug!(path = %path.display(), "Checkpoint blob not found");
        return Ok(None);
    }

    let metadata = std::fs::metadata(path).map_err(|e| ResumeError::IoError(e.to_string()))?;
    if metadata.len() > MAX_BLOB_SIZE {
        return Err(ResumeError::StateTooLarge {
            size: metadata.len(),
            max: MAX_BLOB_SIZE,
        });
    }

    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| ResumeError::IoError(e.to_string()))
}

/// Write through a temp file in the same directory, fsync, then rename over the target
fn write_file_atomic(path: &Path, contents: &str) -> ResumeResult<()> {
    let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir).map_err(|e| ResumeError::IoError(e.to_string()))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
        .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;

    temp_file
        .write_all(contents.as_bytes())
        .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
    temp_file
        .flush()
        .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;

    temp_file
        .persist(path)
        .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

    if let Ok(dir) = std::fs::File::open(parent_dir) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Loads and saves the checkpoint list under a fixed blob name
///
/// No locking: two overlapping runs race and the last write wins.
pub struct CheckpointStore<B> {
    blobs: B,
    name: String,
}

impl<B: BlobStore> CheckpointStore<B> {
    /// Store the list under `name` in `blobs`
    pub fn new(blobs: B, name: impl Into<String>) -> Self {
        Self {
            blobs,
            name: name.into(),
        }
    }

    /// Blob name in use
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying blob store
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Load the list; an absent or blank blob is an empty list (first run)
    pub async fn load(&self) -> ResumeResult<CheckpointList> {
        let contents = match self.blobs.read(&self.name).await? {
            Some(contents) => contents,
            None => {
                info!(name = %self.name, "No checkpoint list stored yet, starting empty");
                return Ok(CheckpointList::new());
            }
        };

        let trimmed = contents.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Ok(CheckpointList::new());
        }

        let list: CheckpointList = serde_json::from_str(trimmed).map_err(|e| {
            warn!(error = %e, name = %self.name, "Failed to deserialize checkpoint list");
            ResumeError::DeserializationError(e.to_string())
        })?;

        debug!(name = %self.name, accounts = list.len(), "Checkpoint list loaded");
        Ok(list)
    }

    /// Persist the list as compact JSON; equal lists produce identical bytes
    pub async fn save(&self, list: &CheckpointList) -> ResumeResult<()> {
        let json = serde_json::to_string(list).map_err(|e| ResumeError::SerializationError(e.to_string()))?;
        self.blobs.write(&self.name, &json).await?;
        info!(name = %self.name, accounts = list.len(), "Checkpoint list saved");
        Ok(())
    }
}
