//! File-handling settings and their persistence

use crate::error::{Result, ShelfError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Most destinations remembered in [`FileSettings::recent_destinations`].
pub const MAX_RECENT_DESTINATIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileSettings {
    /// Destination used when the user does not pick one
    pub default_destination: PathBuf,
    /// Route moved files into one subfolder per category
    pub categorize_by_type: bool,
    /// Most recent first, no repeats
    pub recent_destinations: Vec<PathBuf>,
}

impl Default for FileSettings {
    fn default() -> Self {
        let base = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            default_destination: base.join("DropShelf"),
            categorize_by_type: true,
            recent_destinations: Vec::new(),
        }
    }
}

impl FileSettings {
    /// Moves `destination` to the front of the recent list. Matching is on
    /// the exact path bytes; an empty path is ignored.
    pub fn add_recent_destination(&mut self, destination: &Path) {
        if destination.as_os_str().is_empty() {
            return;
        }
        self.recent_destinations
            .retain(|d| d.as_os_str() != destination.as_os_str());
        self.recent_destinations.insert(0, destination.to_path_buf());
        self.recent_destinations.truncate(MAX_RECENT_DESTINATIONS);
    }

    pub fn clear_recent_destinations(&mut self) {
        self.recent_destinations.clear();
    }
}

/// Persisted settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub files: FileSettings,
    /// Whether the default destination still has to be created
    pub first_run: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            files: FileSettings::default(),
            first_run: true,
        }
    }
}

/// What the stack manager needs from whoever owns the settings.
pub trait SettingsProvider: Send + Sync {
    fn file_settings(&self) -> FileSettings;

    /// May block on persistence. The stack manager calls it on tokio's
    /// blocking pool.
    fn add_recent_destination(&self, destination: &Path);
}

/// Settings held in memory, optionally backed by a JSON file.
#[derive(Debug)]
pub struct SettingsStore {
    settings: RwLock<UserSettings>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Store that never touches disk.
    pub fn in_memory(files: FileSettings) -> Self {
        Self {
            settings: RwLock::new(UserSettings {
                files,
                first_run: false,
            }),
            path: None,
        }
    }

    /// Get the settings file path (~/.config/dropshelf/settings.json)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dropshelf").join("settings.json"))
    }

    /// Load settings from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::config_path().ok_or_else(|| {
            ShelfError::ConfigError("Could not determine config directory".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load settings from `path`, falling back to defaults when it does not
    /// exist yet.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let settings = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|e| {
                ShelfError::ConfigError(format!("Failed to read settings file: {}", e))
            })?;
            serde_json::from_str(&contents).map_err(|e| {
                ShelfError::ConfigError(format!("Failed to parse settings file: {}", e))
            })?
        } else {
            UserSettings::default()
        };

        Ok(Self {
            settings: RwLock::new(settings),
            path: Some(path),
        })
    }

    /// Write the settings to their backing file, if any.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ShelfError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(&*self.read()).map_err(|e| {
            ShelfError::ConfigError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, contents).map_err(|e| {
            ShelfError::ConfigError(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> UserSettings {
        self.read().clone()
    }

    /// Apply `update` to the file settings and persist the result.
    pub fn update_file_settings(&self, update: impl FnOnce(&mut FileSettings)) -> Result<()> {
        update(&mut self.write().files);
        self.save()
    }

    pub fn clear_recent_destinations(&self) -> Result<()> {
        self.update_file_settings(FileSettings::clear_recent_destinations)
    }

    /// Restore defaults and persist them.
    pub fn reset(&self) -> Result<()> {
        *self.write() = UserSettings {
            first_run: false,
            ..UserSettings::default()
        };
        self.save()
    }

    /// On first run, create the default destination and remember that it
    /// exists. Failures are logged and retried on the next start.
    pub fn complete_first_run(&self) {
        if !self.read().first_run {
            return;
        }

        let destination = self.read().files.default_destination.clone();
        if let Err(e) = fs::create_dir_all(&destination) {
            warn!(
                destination = %destination.display(),
                error = %e,
                "Failed to create default destination"
            );
            return;
        }

        self.write().first_run = false;
        if let Err(e) = self.save() {
            warn!(error = %e, "Failed to save settings after first run");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.settings.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsProvider for SettingsStore {
    fn file_settings(&self) -> FileSettings {
        self.read().files.clone()
    }

    fn add_recent_destination(&self, destination: &Path) {
        debug!(destination = %destination.display(), "Recording recent destination");
        let update = self.update_file_settings(|files| files.add_recent_destination(destination));
        if let Err(e) = update {
            warn!(error = %e, "Failed to persist recent destinations");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod file_settings_tests {
        use super::*;

        #[test]
        fn test_default_settings() {
            let settings = FileSettings::default();
            assert!(settings.categorize_by_type);
            assert!(settings.recent_destinations.is_empty());
            assert!(settings.default_destination.ends_with("DropShelf"));
        }

        #[test]
        fn test_recent_most_recent_first_without_repeats() {
            let mut settings = FileSettings::default();
            settings.add_recent_destination(Path::new("/a"));
            settings.add_recent_destination(Path::new("/b"));
            settings.add_recent_destination(Path::new("/a"));

            assert_eq!(
                settings.recent_destinations,
                vec![PathBuf::from("/a"), PathBuf::from("/b")]
            );
        }

        #[test]
        fn test_recent_capped() {
            let mut settings = FileSettings::default();
            for i in 0..15 {
                settings.add_recent_destination(&PathBuf::from(format!("/dest/{}", i)));
            }

            assert_eq!(settings.recent_destinations.len(), MAX_RECENT_DESTINATIONS);
            assert_eq!(settings.recent_destinations[0], PathBuf::from("/dest/14"));
            assert_eq!(settings.recent_destinations[9], PathBuf::from("/dest/5"));
        }

        #[test]
        fn test_recent_matches_exact_spelling() {
            let mut settings = FileSettings::default();
            settings.add_recent_destination(Path::new("/a/b"));
            settings.add_recent_destination(Path::new("/a/b/"));

            assert_eq!(settings.recent_destinations.len(), 2);
        }

        #[test]
        fn test_recent_ignores_empty() {
            let mut settings = FileSettings::default();
            settings.add_recent_destination(Path::new(""));
            assert!(settings.recent_destinations.is_empty());
        }

        #[test]
        fn test_settings_serialization_uses_camel_case() {
            let settings = FileSettings {
                default_destination: PathBuf::from("/d"),
                categorize_by_type: false,
                recent_destinations: vec![PathBuf::from("/r")],
            };
            let json = serde_json::to_string(&settings).unwrap();
            assert!(json.contains("\"categorizeByType\":false"));
            let back: FileSettings = serde_json::from_str(&json).unwrap();
            assert_eq!(back, settings);
        }

        #[test]
        fn test_missing_fields_use_defaults() {
            let settings: FileSettings = serde_json::from_str("{\"categorizeByType\":false}").unwrap();
            assert!(!settings.categorize_by_type);
            assert!(settings.recent_destinations.is_empty());
        }
    }

    mod settings_store_tests {
        use super::*;

        fn fresh_settings(temp_dir: &TempDir) -> UserSettings {
            UserSettings {
                files: FileSettings {
                    default_destination: temp_dir.path().join("Inbox"),
                    categorize_by_type: true,
                    recent_destinations: Vec::new(),
                },
                first_run: true,
            }
        }

        #[test]
        fn test_load_missing_file_gives_defaults() {
            let temp_dir = TempDir::new().unwrap();
            let store = SettingsStore::load_from(temp_dir.path().join("none.json")).unwrap();
            assert!(store.file_settings().categorize_by_type);
        }

        #[test]
        fn test_first_run_creates_default_destination() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("settings.json");
            fs::write(&path, serde_json::to_string(&fresh_settings(&temp_dir)).unwrap()).unwrap();

            let store = SettingsStore::load_from(&path).unwrap();
            assert!(store.snapshot().first_run);
            store.complete_first_run();

            assert!(temp_dir.path().join("Inbox").is_dir());
            assert!(!store.snapshot().first_run);
            let saved: UserSettings =
                serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
            assert!(!saved.first_run);
        }

        #[test]
        fn test_load_invalid_json_is_config_error() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("settings.json");
            fs::write(&path, "{not json").unwrap();

            let result = SettingsStore::load_from(&path);
            assert!(matches!(result, Err(ShelfError::ConfigError(_))));
        }

        #[test]
        fn test_recent_destination_is_persisted() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("cfg").join("settings.json");
            let store = SettingsStore::load_from(&path).unwrap();

            store.add_recent_destination(Path::new("/somewhere"));

            let reloaded = SettingsStore::load_from(&path).unwrap();
            assert_eq!(
                reloaded.file_settings().recent_destinations,
                vec![PathBuf::from("/somewhere")]
            );
        }

        #[test]
        fn test_clear_recent_and_reset() {
            let temp_dir = TempDir::new().unwrap();
            let store = SettingsStore::load_from(temp_dir.path().join("s.json")).unwrap();
            store.add_recent_destination(Path::new("/x"));
            store
                .update_file_settings(|f| f.categorize_by_type = false)
                .unwrap();

            store.clear_recent_destinations().unwrap();
            assert!(store.file_settings().recent_destinations.is_empty());
            assert!(!store.file_settings().categorize_by_type);

            store.reset().unwrap();
            assert!(store.file_settings().categorize_by_type);
        }

        #[test]
        fn test_in_memory_store_never_writes() {
            let store = SettingsStore::in_memory(FileSettings::default());
            store.add_recent_destination(Path::new("/x"));

            assert!(store.path().is_none());
            assert_eq!(store.file_settings().recent_destinations.len(), 1);
            assert!(store.save().is_ok());
        }
    }
}
