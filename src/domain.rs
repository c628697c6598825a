use crate::error::{Result, ShelfError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub mod stack;
pub mod transfer;

pub use stack::{AddPlan, Selection, StackStore};
pub use transfer::{
    conflict_name, TransferEngine, TransferOutcome, TransferReport, TransferStatus,
    TransferSummary,
};

/// Coarse file-type classification used for destination routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Document,
    Video,
    Audio,
    Archive,
    Code,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 7] = [
        FileCategory::Image,
        FileCategory::Document,
        FileCategory::Video,
        FileCategory::Audio,
        FileCategory::Archive,
        FileCategory::Code,
        FileCategory::Other,
    ];

    /// Maps an extension to its category. A leading dot is accepted and the
    /// match is case-insensitive.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "svg" | "ico" => {
                FileCategory::Image
            }

            "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "pdf" | "txt" | "rtf" | "odt" => {
                FileCategory::Document
            }

            "mp4" | "avi" | "mov" | "wmv" | "flv" | "webm" | "mkv" => FileCategory::Video,

            "mp3" | "wav" | "ogg" | "flac" | "aac" | "wma" => FileCategory::Audio,

            "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" => FileCategory::Archive,

            "js" | "ts" | "py" | "java" | "c" | "cpp" | "cs" | "html" | "css" | "php" | "rb"
            | "go" | "rs" => FileCategory::Code,

            _ => FileCategory::Other,
        }
    }

    /// Name of the subfolder files of this category are routed into.
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Document => "document",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Archive => "archive",
            FileCategory::Code => "code",
            FileCategory::Other => "other",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque token identifying one staged file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorId(String);

impl DescriptorId {
    /// Builds `<name>-<millis>-<seq><random>`. The process-wide sequence keeps
    /// ids distinct even when several files with the same name are captured
    /// in the same millisecond.
    pub fn generate(name: &str) -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}-{:x}{}", name, millis, seq, &random[..7]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DescriptorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of a staged file, taken when it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub id: DescriptorId,
    pub path: PathBuf,
    pub name: String,
    /// Extension without the leading dot, empty when the name has none.
    pub extension: String,
    pub category: FileCategory,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl FileDescriptor {
    /// Builds a descriptor from metadata that has already been read.
    pub fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let last_modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());

        FileDescriptor {
            id: DescriptorId::generate(&name),
            path: path.to_path_buf(),
            category: FileCategory::from_extension(&extension),
            name,
            extension,
            size: metadata.len(),
            last_modified,
        }
    }

    /// Blocking classification of `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| stat_error(path, e))?;
        Ok(Self::from_metadata(path, &metadata))
    }
}

/// Reads filesystem metadata for `path` and turns it into a descriptor.
///
/// Only observes the filesystem. Fails with [`ShelfError::NotFound`] when the
/// path no longer exists.
pub async fn classify(path: &Path) -> Result<FileDescriptor> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| stat_error(path, e))?;
    Ok(FileDescriptor::from_metadata(path, &metadata))
}

fn stat_error(path: &Path, error: io::Error) -> ShelfError {
    if error.kind() == io::ErrorKind::NotFound {
        ShelfError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        ShelfError::Io(error)
    }
}
