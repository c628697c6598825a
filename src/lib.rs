//! DropShelf - a temporary staging shelf for files
//!
//! Files are dropped onto a stack, optionally selected, and then dispatched:
//! copied into a destination folder (sorted by category when enabled) or
//! handed out as a list of paths.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod manager;
pub mod notify;

// Re-export primary types for convenience
pub use config::{FileSettings, SettingsProvider, SettingsStore, UserSettings};
pub use domain::{
    classify, DescriptorId, FileCategory, FileDescriptor, Selection, StackStore, TransferEngine,
    TransferOutcome, TransferReport, TransferSummary,
};
pub use error::{Result, ShelfError, TransferErrorKind};
pub use manager::{AddOutcome, StackManager};
pub use notify::{ChannelObserver, Notification, NotificationKind, ShelfEvent, ShelfObserver};
