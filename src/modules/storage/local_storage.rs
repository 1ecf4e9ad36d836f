//! Local filesystem storage for incident attachments
//!
//! Committed files live at `<root>/<incident_id>/<storage_key>`. Writes go to
//! `<root>/.staging/<incident_id>/<storage_key>` first and are moved into place
//! with a rename once their metadata row exists, so a committed path never
//! holds a partially written file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::AppError;
use crate::shared::validation::storage_extension;

const STAGING_DIR: &str = ".staging";

/// A staged upload left behind by an interrupted write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub incident_id: Uuid,
    pub storage_key: String,
}

/// Attachment storage rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open the uploads root, creating it (and the staging area) if needed.
    ///
    /// The root is canonicalized so stored paths are absolute.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(root.join(STAGING_DIR)).await?;
        let root = fs::canonicalize(&root).await?;

        info!("Local storage initialized at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generate an opaque storage key, keeping a sanitized extension of the
    /// client file name when there is one
    pub fn generate_key(file_name: &str) -> String {
        let id = Uuid::new_v4();
        match storage_extension(file_name) {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        }
    }

    /// Final location of a committed file
    pub fn file_path(&self, incident_id: Uuid, storage_key: &str) -> PathBuf {
        self.root.join(incident_id.to_string()).join(storage_key)
    }

    fn staging_path(&self, incident_id: Uuid, storage_key: &str) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(incident_id.to_string())
            .join(storage_key)
    }

    /// Write bytes to the staging area and flush them to disk
    pub async fn stage(
        &self,
        incident_id: Uuid,
        storage_key: &str,
        data: &[u8],
    ) -> Result<(), AppError> {
        let path = self.staging_path(incident_id, storage_key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        debug!("Staged {} bytes at {}", data.len(), path.display());
        Ok(())
    }

    /// Move a staged file to its final location
    pub async fn promote(&self, incident_id: Uuid, storage_key: &str) -> Result<PathBuf, AppError> {
        let staged = self.staging_path(incident_id, storage_key);
        let target = self.file_path(incident_id, storage_key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&staged, &target).await?;

        debug!("Promoted {} to {}", staged.display(), target.display());
        Ok(target)
    }

    /// Remove a staged file; a missing file is not an error
    pub async fn discard(&self, incident_id: Uuid, storage_key: &str) -> Result<(), AppError> {
        let staged = self.staging_path(incident_id, storage_key);
        match fs::remove_file(&staged).await {
            Ok(()) => {
                debug!("Discarded staged file {}", staged.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a committed file
    pub async fn read(&self, incident_id: Uuid, storage_key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.file_path(incident_id, storage_key);
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound(format!(
                "File content for '{}' is missing",
                storage_key
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// List staged files that were never promoted or discarded
    pub async fn pending_uploads(&self) -> Result<Vec<StagedUpload>, AppError> {
        let staging_root = self.root.join(STAGING_DIR);
        let mut pending = Vec::new();

        let mut incident_dirs = match fs::read_dir(&staging_root).await {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(pending),
            Err(e) => return Err(e.into()),
        };

        while let Some(dir) = incident_dirs.next_entry().await? {
            let dir_name = dir.file_name();
            let Some(incident_id) = dir_name.to_str().and_then(|s| Uuid::parse_str(s).ok())
            else {
                warn!(
                    "Ignoring unexpected entry in staging area: {}",
                    dir.path().display()
                );
                continue;
            };

            if !dir.file_type().await?.is_dir() {
                continue;
            }

            let mut files = fs::read_dir(dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                if let Some(storage_key) = file.file_name().to_str() {
                    pending.push(StagedUpload {
                        incident_id,
                        storage_key: storage_key.to_string(),
                    });
                }
            }
        }

        Ok(pending)
    }
}
