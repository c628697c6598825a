//! Outcome reporting and the push channel towards the presentation layer

use crate::domain::{FileDescriptor, TransferReport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Added,
    Duplicate,
    Cleared,
    Moved,
    PartialMoved,
    Copied,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, "Error", body)
    }

    /// Summary of a drop. `None` when nothing happened worth telling.
    pub fn for_add(added: usize, duplicates: usize, failed: usize) -> Option<Self> {
        let mut notification = match (added, duplicates) {
            (0, 0) if failed == 0 => return None,
            (0, 0) => {
                return Some(Self::error(format!(
                    "Failed to process {} dropped file(s).",
                    failed
                )))
            }
            (added, 0) => Self::new(
                NotificationKind::Added,
                "Files Added",
                format!("Added {} files.", added),
            ),
            (0, duplicates) => Self::new(
                NotificationKind::Duplicate,
                "Duplicate Files",
                format!("All {} file(s) already exist.", duplicates),
            ),
            (added, duplicates) => Self::new(
                NotificationKind::Added,
                "Files Added",
                format!(
                    "Added {} files. Skipped {} duplicate file(s).",
                    added, duplicates
                ),
            ),
        };

        if failed > 0 {
            notification
                .body
                .push_str(&format!(" Could not read {} file(s).", failed));
        }
        Some(notification)
    }

    pub fn cleared() -> Self {
        Self::new(
            NotificationKind::Cleared,
            "Stack Cleared",
            "All files have been removed from the stack.",
        )
    }

    /// Summary of a move batch.
    pub fn for_transfer(report: &TransferReport) -> Self {
        let summary = report.summary();

        if !report.root_available {
            return Self::error("Failed to move files to destination.");
        }

        if summary.failures == 0 {
            return Self::new(
                NotificationKind::Moved,
                "Success",
                format!(
                    "Moved {} files to {}.",
                    summary.successes,
                    leaf_name(&report.destination_root)
                ),
            );
        }

        let body = format!(
            "Moved {} files, {} failed.",
            summary.successes, summary.failures
        );
        if summary.successes == 0 {
            Self::error(body)
        } else {
            Self::new(NotificationKind::PartialMoved, "Partial Success", body)
        }
    }

    pub fn copied(count: usize) -> Self {
        Self::new(
            NotificationKind::Copied,
            "Copied",
            format!("{} file paths copied to clipboard.", count),
        )
    }
}

fn leaf_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Receives pushes from the stack manager.
///
/// Calls are fire-and-forget and made while the manager holds its state, so
/// implementations must return quickly and must not call back into the
/// manager.
pub trait ShelfObserver: Send + Sync {
    fn on_files_updated(&self, snapshot: &[FileDescriptor]);

    fn on_notification(&self, notification: &Notification);

    /// Text the user asked to place on the clipboard.
    fn on_clipboard_text(&self, _text: &str) {}
}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ShelfEvent {
    FilesUpdated(Vec<FileDescriptor>),
    Notification(Notification),
    ClipboardText(String),
}

/// Observer forwarding every push into an unbounded channel, for consumers
/// living on another task.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ShelfEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ShelfEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ShelfEvent) {
        if self.tx.send(event).is_err() {
            trace!("Shelf event dropped, receiver is gone");
        }
    }
}

impl ShelfObserver for ChannelObserver {
    fn on_files_updated(&self, snapshot: &[FileDescriptor]) {
        self.send(ShelfEvent::FilesUpdated(snapshot.to_vec()));
    }

    fn on_notification(&self, notification: &Notification) {
        self.send(ShelfEvent::Notification(notification.clone()));
    }

    fn on_clipboard_text(&self, text: &str) {
        self.send(ShelfEvent::ClipboardText(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileDescriptor, TransferOutcome, TransferStatus};
    use crate::error::TransferErrorKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    mod add_message_tests {
        use super::*;

        #[test]
        fn test_all_new() {
            let n = Notification::for_add(3, 0, 0).unwrap();
            assert_eq!(n.kind, NotificationKind::Added);
            assert_eq!(n.title, "Files Added");
            assert_eq!(n.body, "Added 3 files.");
        }

        #[test]
        fn test_all_duplicates() {
            let n = Notification::for_add(0, 2, 0).unwrap();
            assert_eq!(n.kind, NotificationKind::Duplicate);
            assert_eq!(n.body, "All 2 file(s) already exist.");
        }

        #[test]
        fn test_mixed() {
            let n = Notification::for_add(2, 1, 0).unwrap();
            assert_eq!(n.kind, NotificationKind::Added);
            assert_eq!(n.body, "Added 2 files. Skipped 1 duplicate file(s).");
        }

        #[test]
        fn test_nothing_happened() {
            assert!(Notification::for_add(0, 0, 0).is_none());
        }

        #[test]
        fn test_only_failures_is_error() {
            let n = Notification::for_add(0, 0, 2).unwrap();
            assert_eq!(n.kind, NotificationKind::Error);
            assert_eq!(n.body, "Failed to process 2 dropped file(s).");
        }

        #[test]
        fn test_failures_are_appended() {
            let n = Notification::for_add(1, 0, 1).unwrap();
            assert_eq!(n.body, "Added 1 files. Could not read 1 file(s).");
        }
    }

    mod transfer_message_tests {
        use super::*;

        fn report(root: &str, results: &[bool], root_available: bool) -> TransferReport {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("a.txt");
            std::fs::write(&path, b"a").unwrap();
            let descriptor = FileDescriptor::from_path(&path).unwrap();
            TransferReport {
                destination_root: PathBuf::from(root),
                root_available,
                outcomes: results
                    .iter()
                    .map(|ok| TransferOutcome {
                        descriptor: descriptor.clone(),
                        status: if *ok {
                            TransferStatus::Copied {
                                final_path: PathBuf::from(root).join("a.txt"),
                            }
                        } else {
                            TransferStatus::Failed {
                                kind: TransferErrorKind::CopyFailed,
                                message: "boom".to_string(),
                            }
                        },
                    })
                    .collect(),
            }
        }

        #[test]
        fn test_full_success_names_destination_leaf() {
            let n = Notification::for_transfer(&report("/home/me/Inbox", &[true, true], true));
            assert_eq!(n.kind, NotificationKind::Moved);
            assert_eq!(n.title, "Success");
            assert_eq!(n.body, "Moved 2 files to Inbox.");
        }

        #[test]
        fn test_partial_failure() {
            let n = Notification::for_transfer(&report("/d", &[true, true, false], true));
            assert_eq!(n.kind, NotificationKind::PartialMoved);
            assert_eq!(n.body, "Moved 2 files, 1 failed.");
        }

        #[test]
        fn test_total_failure_is_error() {
            let n = Notification::for_transfer(&report("/d", &[false, false], true));
            assert_eq!(n.kind, NotificationKind::Error);
            assert_eq!(n.body, "Moved 0 files, 2 failed.");
        }

        #[test]
        fn test_uncreatable_root_is_error() {
            let n = Notification::for_transfer(&report("/d", &[false], false));
            assert_eq!(n.kind, NotificationKind::Error);
            assert_eq!(n.body, "Failed to move files to destination.");
        }
    }

    mod channel_observer_tests {
        use super::*;

        #[test]
        fn test_events_are_forwarded_in_order() {
            let (observer, mut rx) = ChannelObserver::new();

            observer.on_files_updated(&[]);
            observer.on_notification(&Notification::cleared());
            observer.on_clipboard_text("/a\n/b");

            assert_eq!(rx.try_recv().unwrap(), ShelfEvent::FilesUpdated(vec![]));
            assert_eq!(
                rx.try_recv().unwrap(),
                ShelfEvent::Notification(Notification::cleared())
            );
            assert_eq!(
                rx.try_recv().unwrap(),
                ShelfEvent::ClipboardText("/a\n/b".to_string())
            );
        }

        #[test]
        fn test_closed_receiver_is_tolerated() {
            let (observer, rx) = ChannelObserver::new();
            drop(rx);

            observer.on_notification(&Notification::cleared());
        }
    }
}
