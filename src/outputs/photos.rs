//! Photo archive on local disk.
//!
//! Every fetched photo is written here, whether or not it gets sent, so the
//! directory doubles as a local archive. Paths only depend on the journal
//! date and the content hash, which makes rewriting the same photo a no-op.
//!
//! # Output Structure
//!
//! ```text
//! photos_dir/
//! ├── 2021-05-21-3a7bd3e2360a3d….jpg
//! └── 2021-05-22-9f86d081884c7d….jpg
//! ```

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument};

use crate::utils::file_safe;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write {path}: {source}")]
    Io { path: String, source: io::Error },
}

/// Durable storage for photo bytes.
pub trait PhotoStore {
    /// Persist `content` and return the path the gateway should attach.
    async fn write(&self, date: &str, hash: &str, content: &[u8]) -> Result<PathBuf, StoreError>;
}

/// Writes photos as `{dir}/{date}-{hash}.jpg`.
#[derive(Debug, Clone)]
pub struct FsPhotoStore {
    dir: PathBuf,
}

impl FsPhotoStore {
    /// The directory is made absolute because the gateway daemon reads
    /// attachments from its own working directory.
    pub fn new(dir: &Path) -> io::Result<Self> {
        Ok(Self {
            dir: std::path::absolute(dir)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: &str, hash: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.jpg", file_safe(date), hash))
    }
}

impl PhotoStore for FsPhotoStore {
    #[instrument(level = "debug", skip(self, content), fields(bytes = content.len()))]
    async fn write(&self, date: &str, hash: &str, content: &[u8]) -> Result<PathBuf, StoreError> {
        let path = self.path_for(date, hash);
        fs::write(&path, content)
            .await
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
        debug!(path = %path.display(), "Stored photo");
        Ok(path)
    }
}
