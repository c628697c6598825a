//! Request/response facade over the stack
//!
//! [`StackManager`] owns the stack and the selection overlay. Every public
//! operation returns a well-formed result and pushes the new snapshot plus a
//! toast to the registered observers. Batch operations (`add_files`,
//! `move_files_to_destination`) hold the state lock for their whole run, so a
//! second batch waits its turn instead of interleaving with the first.

use crate::config::SettingsProvider;
use crate::domain::{
    classify, DescriptorId, FileCategory, FileDescriptor, Selection, StackStore, TransferEngine,
    TransferSummary,
};
use crate::notify::{Notification, ShelfObserver};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct ShelfState {
    stack: StackStore,
    selection: Selection,
}

/// What a drop did to the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOutcome {
    /// Newly staged files, drop order
    pub added: Vec<FileDescriptor>,
    /// Paths already staged or repeated within the drop
    pub duplicate_count: usize,
    /// Paths that could not be classified
    pub failed_count: usize,
}

pub struct StackManager {
    state: Mutex<ShelfState>,
    settings: Arc<dyn SettingsProvider>,
    observers: RwLock<Vec<Arc<dyn ShelfObserver>>>,
}

impl StackManager {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            state: Mutex::new(ShelfState::default()),
            settings,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Registers an observer for snapshot and notification pushes.
    pub fn subscribe(&self, observer: Arc<dyn ShelfObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// Stages dropped paths.
    ///
    /// Paths already on the stack, or repeated within `paths`, are counted
    /// as duplicates without being classified again. Paths that cannot be
    /// classified are skipped and counted as failures. An empty drop is a
    /// no-op.
    pub async fn add_files(&self, paths: Vec<PathBuf>) -> AddOutcome {
        if paths.is_empty() {
            return AddOutcome::default();
        }

        let mut state = self.state.lock().await;
        let plan = state.stack.plan_add(&paths);
        debug!(
            dropped = paths.len(),
            fresh = plan.fresh.len(),
            duplicates = plan.duplicate_count,
            "Classifying dropped files"
        );

        let results = join_all(plan.fresh.iter().map(|p| classify(p))).await;

        let mut descriptors = Vec::with_capacity(results.len());
        let mut failed_count = 0;
        for (path, result) in plan.fresh.iter().zip(results) {
            match result {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping dropped file");
                    failed_count += 1;
                }
            }
        }

        let added = state.stack.extend(descriptors);
        if !added.is_empty() {
            self.publish_snapshot(&state.stack);
        }

        let outcome = AddOutcome {
            added,
            duplicate_count: plan.duplicate_count,
            failed_count,
        };
        if let Some(notification) = Notification::for_add(
            outcome.added.len(),
            outcome.duplicate_count,
            outcome.failed_count,
        ) {
            self.publish(&notification);
        }

        info!(
            added = outcome.added.len(),
            duplicates = outcome.duplicate_count,
            failed = outcome.failed_count,
            staged = state.stack.len(),
            "Processed dropped files"
        );
        outcome
    }

    /// Removes the file staged under `path` and returns the resulting stack.
    pub async fn remove_file(&self, path: &Path) -> Vec<FileDescriptor> {
        let mut state = self.state.lock().await;
        if state.stack.remove_path(path).is_some() {
            debug!(path = %path.display(), "Removed file from stack");
            let ShelfState { stack, selection } = &mut *state;
            selection.prune(stack);
        }
        self.publish_snapshot(&state.stack);
        state.stack.snapshot()
    }

    /// Removes the file with the given id and returns the resulting stack.
    pub async fn remove_by_id(&self, id: &DescriptorId) -> Vec<FileDescriptor> {
        let mut state = self.state.lock().await;
        if state.stack.remove_id(id).is_some() {
            state.selection.deselect(id);
        }
        self.publish_snapshot(&state.stack);
        state.stack.snapshot()
    }

    /// Empties the stack unconditionally.
    pub async fn clear_stack(&self) -> Vec<FileDescriptor> {
        let mut state = self.state.lock().await;
        let removed = state.stack.clear();
        state.selection.clear();
        debug!(removed = removed.len(), "Cleared stack");

        self.publish_snapshot(&state.stack);
        self.publish(&Notification::cleared());
        Vec::new()
    }

    pub async fn snapshot(&self) -> Vec<FileDescriptor> {
        self.state.lock().await.stack.snapshot()
    }

    pub async fn files_by_category(&self) -> BTreeMap<FileCategory, Vec<FileDescriptor>> {
        self.state.lock().await.stack.by_category()
    }

    /// Copies every staged file under `destination`, then clears the stack
    /// whatever the per-file outcome.
    pub async fn move_files_to_destination(&self, destination: &Path) -> TransferSummary {
        let mut state = self.state.lock().await;
        let files = state.stack.snapshot();
        let engine = TransferEngine::from_settings(&self.settings.file_settings());

        info!(
            files = files.len(),
            destination = %destination.display(),
            categorize = engine.categorizes_by_type(),
            "Moving staged files"
        );
        let report = engine.transfer_all(&files, destination).await;

        if report.root_available {
            let settings = Arc::clone(&self.settings);
            let root = destination.to_path_buf();
            let recorded =
                tokio::task::spawn_blocking(move || settings.add_recent_destination(&root)).await;
            if let Err(e) = recorded {
                warn!(error = %e, "Failed to record recent destination");
            }
        }

        state.stack.clear();
        state.selection.clear();
        self.publish_snapshot(&state.stack);
        self.publish(&Notification::for_transfer(&report));

        let summary = report.summary();
        info!(
            successes = summary.successes,
            failures = summary.failures,
            "Finished moving staged files"
        );
        summary
    }

    /// Moves the stack to the configured default destination.
    pub async fn move_files_to_default_destination(&self) -> TransferSummary {
        let destination = self.settings.file_settings().default_destination;
        self.move_files_to_destination(&destination).await
    }

    /// Hands the paths to copy to the observers' clipboard.
    ///
    /// An explicit, non-empty `paths` list is used as given. Otherwise the
    /// selected files are used, or every staged file when nothing is
    /// selected.
    pub async fn copy_file_paths(&self, paths: Option<Vec<PathBuf>>) -> Vec<PathBuf> {
        let state = self.state.lock().await;
        let paths = match paths {
            Some(paths) if !paths.is_empty() => paths,
            _ => state
                .selection
                .resolve(&state.stack)
                .into_iter()
                .map(|f| f.path.clone())
                .collect(),
        };

        let text = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        for observer in self.observers() {
            observer.on_clipboard_text(&text);
        }
        self.publish(&Notification::copied(paths.len()));
        paths
    }

    /// Paths for an outgoing drag: the dispatch targets that still exist on
    /// disk. Empty means no drag should start.
    pub async fn prepare_drag_out(&self) -> Vec<PathBuf> {
        let targets = self.dispatch_targets().await;
        let mut paths = Vec::with_capacity(targets.len());
        for target in targets {
            if tokio::fs::try_exists(&target.path).await.unwrap_or(false) {
                paths.push(target.path);
            } else {
                warn!(path = %target.path.display(), "Staged file no longer exists, not dragging it");
            }
        }
        paths
    }

    /// Files a copy-paths or drag-out acts on.
    pub async fn dispatch_targets(&self) -> Vec<FileDescriptor> {
        let state = self.state.lock().await;
        state
            .selection
            .resolve(&state.stack)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn select(&self, id: &DescriptorId) -> bool {
        let mut state = self.state.lock().await;
        let ShelfState { stack, selection } = &mut *state;
        selection.select(stack, id)
    }

    pub async fn deselect(&self, id: &DescriptorId) -> bool {
        self.state.lock().await.selection.deselect(id)
    }

    /// Returns whether `id` is selected afterwards.
    pub async fn toggle_selection(&self, id: &DescriptorId) -> bool {
        let mut state = self.state.lock().await;
        let ShelfState { stack, selection } = &mut *state;
        selection.toggle(stack, id)
    }

    pub async fn toggle_select_all(&self) {
        let mut state = self.state.lock().await;
        let ShelfState { stack, selection } = &mut *state;
        selection.toggle_all(stack);
    }

    pub async fn clear_selection(&self) {
        self.state.lock().await.selection.clear();
    }

    /// Selected ids in stack order.
    pub async fn selected_ids(&self) -> Vec<DescriptorId> {
        let state = self.state.lock().await;
        state
            .stack
            .iter()
            .filter(|f| state.selection.is_selected(&f.id))
            .map(|f| f.id.clone())
            .collect()
    }

    fn observers(&self) -> Vec<Arc<dyn ShelfObserver>> {
        self.observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn publish_snapshot(&self, stack: &StackStore) {
        let snapshot = stack.snapshot();
        for observer in self.observers() {
            observer.on_files_updated(&snapshot);
        }
    }

    fn publish(&self, notification: &Notification) {
        debug!(kind = ?notification.kind, body = %notification.body, "Notifying");
        for observer in self.observers() {
            observer.on_notification(notification);
        }
    }
}
