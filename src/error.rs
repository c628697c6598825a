//! Error types for the drop shelf

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShelfError {
    /// The source path vanished before it could be classified or copied.
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A destination directory could not be created.
    #[error("Failed to create directory: {}", path.display())]
    DestinationUncreatable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Copying bytes to the destination failed.
    #[error("Failed to copy {} to {}", from.display(), to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ShelfError {
    pub fn copy_failed(from: PathBuf, to: PathBuf, source: io::Error) -> Self {
        Self::CopyFailed { from, to, source }
    }

    /// Maps an error raised while handling one file onto the kind recorded
    /// in its transfer outcome.
    pub fn transfer_kind(&self) -> TransferErrorKind {
        match self {
            Self::NotFound { .. } => TransferErrorKind::NotFound,
            Self::DestinationUncreatable { .. } => TransferErrorKind::DestinationUncreatable,
            Self::Io(e) if e.kind() == io::ErrorKind::NotFound => TransferErrorKind::NotFound,
            Self::CopyFailed { .. } | Self::ConfigError(_) | Self::Io(_) => {
                TransferErrorKind::CopyFailed
            }
        }
    }
}

/// Why a single file failed to reach its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferErrorKind {
    NotFound,
    DestinationUncreatable,
    CopyFailed,
}

impl fmt::Display for TransferErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "source not found",
            Self::DestinationUncreatable => "destination uncreatable",
            Self::CopyFailed => "copy failed",
        };
        f.write_str(label)
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
