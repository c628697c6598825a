//! Copies the staged files into a destination tree.
//!
//! Every file is handled independently and concurrently: one failure never
//! stops its siblings. Files are copied, never renamed, so sources on another
//! volume work and the originals stay where they were.

use super::{FileCategory, FileDescriptor};
use crate::config::FileSettings;
use crate::error::{Result, ShelfError, TransferErrorKind};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Upper bound on numbered retries once the timestamped name is also taken.
const MAX_CONFLICT_ATTEMPTS: u32 = 100;

/// How a single file fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferStatus {
    Copied { final_path: PathBuf },
    Failed { kind: TransferErrorKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub descriptor: FileDescriptor,
    pub status: TransferStatus,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TransferStatus::Copied { .. })
    }

    pub fn final_path(&self) -> Option<&Path> {
        match &self.status {
            TransferStatus::Copied { final_path } => Some(final_path),
            TransferStatus::Failed { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<TransferErrorKind> {
        match &self.status {
            TransferStatus::Copied { .. } => None,
            TransferStatus::Failed { kind, .. } => Some(*kind),
        }
    }

    fn failed(descriptor: FileDescriptor, error: &ShelfError) -> Self {
        Self {
            descriptor,
            status: TransferStatus::Failed {
                kind: error.transfer_kind(),
                message: error.to_string(),
            },
        }
    }
}

/// Success and failure tallies handed back to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub successes: usize,
    pub failures: usize,
}

impl TransferSummary {
    pub fn from_outcomes(outcomes: &[TransferOutcome]) -> Self {
        let successes = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            successes,
            failures: outcomes.len() - successes,
        }
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures
    }
}

/// Everything one transfer batch produced.
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub destination_root: PathBuf,
    /// False when the root itself could not be created; every outcome then
    /// carries [`TransferErrorKind::DestinationUncreatable`].
    pub root_available: bool,
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    pub fn summary(&self) -> TransferSummary {
        TransferSummary::from_outcomes(&self.outcomes)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransferEngine {
    categorize_by_type: bool,
}

impl TransferEngine {
    pub fn new(categorize_by_type: bool) -> Self {
        Self { categorize_by_type }
    }

    pub fn from_settings(settings: &FileSettings) -> Self {
        Self::new(settings.categorize_by_type)
    }

    pub fn categorizes_by_type(&self) -> bool {
        self.categorize_by_type
    }

    /// Directory a file of `category` lands in under `root`.
    pub fn target_dir(&self, root: &Path, category: FileCategory) -> PathBuf {
        if self.categorize_by_type {
            root.join(category.dir_name())
        } else {
            root.to_path_buf()
        }
    }

    /// Copies every file in `files` under `destination_root`, waiting for all
    /// of them before returning.
    pub async fn transfer_all(
        &self,
        files: &[FileDescriptor],
        destination_root: &Path,
    ) -> TransferReport {
        if let Err(e) = ensure_dir(destination_root).await {
            warn!(
                destination = %destination_root.display(),
                error = %e,
                "Destination root is unavailable"
            );
            return TransferReport {
                destination_root: destination_root.to_path_buf(),
                root_available: false,
                outcomes: files
                    .iter()
                    .map(|f| TransferOutcome::failed(f.clone(), &e))
                    .collect(),
            };
        }

        let outcomes =
            join_all(files.iter().map(|f| self.transfer_one(f, destination_root))).await;

        TransferReport {
            destination_root: destination_root.to_path_buf(),
            root_available: true,
            outcomes,
        }
    }

    async fn transfer_one(&self, file: &FileDescriptor, root: &Path) -> TransferOutcome {
        match self.place(file, root).await {
            Ok(final_path) => {
                debug!(
                    source = %file.path.display(),
                    destination = %final_path.display(),
                    "Copied staged file"
                );
                TransferOutcome {
                    descriptor: file.clone(),
                    status: TransferStatus::Copied { final_path },
                }
            }
            Err(e) => {
                warn!(source = %file.path.display(), error = %e, "Failed to copy staged file");
                TransferOutcome::failed(file.clone(), &e)
            }
        }
    }

    async fn place(&self, file: &FileDescriptor, root: &Path) -> Result<PathBuf> {
        let dir = self.target_dir(root, file.category);
        ensure_dir(&dir).await?;

        // `name` is lossy; the on-disk name keeps the source's exact bytes
        let file_name = file
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| OsString::from(&file.name));

        let mut source = File::open(&file.path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ShelfError::NotFound {
                    path: file.path.clone(),
                }
            } else {
                ShelfError::copy_failed(file.path.clone(), dir.join(&file_name), e)
            }
        })?;

        let (final_path, mut dest) = claim_destination(&file.path, &dir, &file_name).await?;

        if let Err(e) = copy_contents(&mut source, &mut dest).await {
            drop(dest);
            fs::remove_file(&final_path).await.ok();
            return Err(ShelfError::copy_failed(file.path.clone(), final_path, e));
        }

        Ok(final_path)
    }
}

/// Name used when `name` is already taken in the target directory:
/// `<stem>_<stamp>.<ext>`, or `<stem>_<stamp>` without an extension.
pub fn conflict_name(name: impl AsRef<OsStr>, stamp: &str) -> OsString {
    let path = Path::new(name.as_ref());
    let mut renamed = path
        .file_stem()
        .unwrap_or_else(|| path.as_os_str())
        .to_os_string();
    renamed.push("_");
    renamed.push(stamp);
    if let Some(ext) = path.extension() {
        renamed.push(".");
        renamed.push(ext);
    }
    renamed
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| ShelfError::DestinationUncreatable {
            path: dir.to_path_buf(),
            source: e,
        })
}

/// Creates the destination file, never replacing an existing one.
///
/// The plain name is tried first. If it is taken, the timestamp is read at
/// that moment and the conflict name is tried, then numbered variants of it.
async fn claim_destination(
    source: &Path,
    dir: &Path,
    name: &OsStr,
) -> Result<(PathBuf, File)> {
    let plain = dir.join(name);
    match create_new(&plain).await {
        Ok(file) => return Ok((plain, file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(ShelfError::copy_failed(source.to_path_buf(), plain, e)),
    }

    let timestamp = Utc::now().timestamp_millis();
    let mut last = plain;
    for attempt in 0..MAX_CONFLICT_ATTEMPTS {
        let stamp = if attempt == 0 {
            timestamp.to_string()
        } else {
            format!("{}_{}", timestamp, attempt)
        };
        let candidate = dir.join(conflict_name(name, &stamp));
        match create_new(&candidate).await {
            Ok(file) => {
                debug!(renamed = %candidate.display(), "Destination name taken, renamed copy");
                return Ok((candidate, file));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last = candidate,
            Err(e) => return Err(ShelfError::copy_failed(source.to_path_buf(), candidate, e)),
        }
    }

    Err(ShelfError::copy_failed(
        source.to_path_buf(),
        last,
        io::Error::from(io::ErrorKind::AlreadyExists),
    ))
}

async fn copy_contents(source: &mut File, dest: &mut File) -> io::Result<()> {
    tokio::io::copy(source, dest).await?;
    dest.flush().await
}

async fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}
