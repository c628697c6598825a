use super::{DescriptorId, FileCategory, FileDescriptor};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Ordered, path-unique collection of staged files. Oldest drop first.
#[derive(Debug, Default, Clone)]
pub struct StackStore {
    files: Vec<FileDescriptor>,
}

/// Result of splitting a drop into paths worth classifying and duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddPlan {
    /// Paths not yet staged, first occurrence order.
    pub fresh: Vec<PathBuf>,
    /// Paths already staged or repeated within the same drop.
    pub duplicate_count: usize,
}

impl StackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn get(&self, id: &DescriptorId) -> Option<&FileDescriptor> {
        self.files.iter().find(|f| &f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.files.iter()
    }

    /// Decides which dropped paths need classification.
    ///
    /// The dedup key is the raw path: two spellings of the same file are
    /// treated as distinct entries.
    pub fn plan_add(&self, paths: &[PathBuf]) -> AddPlan {
        let mut seen: HashSet<&Path> = self.files.iter().map(|f| f.path.as_path()).collect();
        let mut plan = AddPlan::default();

        for path in paths {
            if seen.insert(path.as_path()) {
                plan.fresh.push(path.clone());
            } else {
                plan.duplicate_count += 1;
            }
        }

        plan
    }

    /// Appends descriptors after the existing ones, returning the ones that
    /// were actually stored. A descriptor whose path is already staged is
    /// dropped so the uniqueness invariant holds whatever the caller passes.
    pub fn extend(&mut self, descriptors: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
        let mut added = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if self.contains_path(&descriptor.path) {
                continue;
            }
            added.push(descriptor.clone());
            self.files.push(descriptor);
        }
        added
    }

    /// Removes the descriptor staged under `path`, if any.
    pub fn remove_path(&mut self, path: &Path) -> Option<FileDescriptor> {
        let index = self.files.iter().position(|f| f.path == path)?;
        Some(self.files.remove(index))
    }

    pub fn remove_id(&mut self, id: &DescriptorId) -> Option<FileDescriptor> {
        let index = self.files.iter().position(|f| &f.id == id)?;
        Some(self.files.remove(index))
    }

    /// Empties the stack, handing back what it held.
    pub fn clear(&mut self) -> Vec<FileDescriptor> {
        std::mem::take(&mut self.files)
    }

    /// Owned copy of the stack in insertion order.
    pub fn snapshot(&self) -> Vec<FileDescriptor> {
        self.files.clone()
    }

    /// Groups the stack by category, keeping stack order inside each group.
    pub fn by_category(&self) -> BTreeMap<FileCategory, Vec<FileDescriptor>> {
        let mut groups: BTreeMap<FileCategory, Vec<FileDescriptor>> = BTreeMap::new();
        for file in &self.files {
            groups.entry(file.category).or_default().push(file.clone());
        }
        groups
    }
}

/// Set of descriptor ids marking the targets of copy-paths and drag-out.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    ids: HashSet<DescriptorId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_selected(&self, id: &DescriptorId) -> bool {
        self.ids.contains(id)
    }

    /// Selects `id` if it names a staged file.
    pub fn select(&mut self, stack: &StackStore, id: &DescriptorId) -> bool {
        if stack.get(id).is_none() {
            return false;
        }
        self.ids.insert(id.clone());
        true
    }

    pub fn deselect(&mut self, id: &DescriptorId) -> bool {
        self.ids.remove(id)
    }

    /// Flips the selection state of `id`, returning whether it is now selected.
    pub fn toggle(&mut self, stack: &StackStore, id: &DescriptorId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.select(stack, id)
        }
    }

    /// Selects every staged file, or clears the selection when everything is
    /// already selected.
    pub fn toggle_all(&mut self, stack: &StackStore) {
        let all_selected = !stack.is_empty() && stack.iter().all(|f| self.ids.contains(&f.id));
        if all_selected {
            self.ids.clear();
        } else {
            self.ids = stack.iter().map(|f| f.id.clone()).collect();
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids that no longer name a staged file.
    pub fn prune(&mut self, stack: &StackStore) {
        self.ids.retain(|id| stack.get(id).is_some());
    }

    /// Files a dispatch should act on: everything when nothing is selected,
    /// otherwise only the selected files. Stack order is kept.
    pub fn resolve<'a>(&self, stack: &'a StackStore) -> Vec<&'a FileDescriptor> {
        if self.ids.is_empty() {
            return stack.iter().collect();
        }
        stack.iter().filter(|f| self.ids.contains(&f.id)).collect()
    }
}
