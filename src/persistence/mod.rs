//! Save/load persistence with migration and recovery
//!
//! Features:
//! - Versioned JSON document with an explicit migration chain
//! - Default backfill by deep merge
//! - Backup rotation (old save -> `.backup`, new save via tmp + rename)
//! - Corruption detection and recovery (`.corrupted` quarantine)

pub mod atomic_write;
pub mod merge;
pub mod migration;
pub mod schema;

pub use merge::deep_merge;
pub use migration::{CURRENT_VERSION, MigrationReport, SaveVersion};
pub use schema::{PlayerData, Progress, SaveData};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistenceError;
use atomic_write::{atomic_write, sibling_path};
use merge::{get_path, set_path};
use migration::{MigrationRegistry, build_migration_registry};
use schema::{default_document, timestamp_value};

/// JSON save document bound to a file
pub struct PersistentStore {
    path: PathBuf,
    document: Value,
    dirty: bool,
    registry: MigrationRegistry,
    last_migration: Option<MigrationReport>,
}

impl PersistentStore {
    /// Store for `path` holding the default document; nothing is read
    /// until `load`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: default_document(Utc::now()),
            dirty: false,
            registry: build_migration_registry(),
            last_migration: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the previous save is kept during and after a write
    pub fn backup_path(&self) -> PathBuf {
        sibling_path(&self.path, ".backup")
    }

    /// Where an unreadable save is moved aside
    pub fn corrupted_path(&self) -> PathBuf {
        sibling_path(&self.path, ".corrupted")
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Report from the migration run by the last successful `load`
    pub fn last_migration(&self) -> Option<&MigrationReport> {
        self.last_migration.as_ref()
    }

    /// Version stamped on the in-memory document
    pub fn version(&self) -> SaveVersion {
        self.document
            .as_object()
            .map(SaveVersion::of_document)
            .unwrap_or(migration::LEGACY_VERSION)
    }

    /// Read the save file, migrating and backfilling it.
    ///
    /// Never fails. An unreadable file is moved to `.corrupted`. When the
    /// primary file is missing or unreadable, the `.backup` left by an
    /// interrupted save is used instead, and defaults only when that is
    /// unusable too.
    pub fn load(&mut self) -> &Value {
        self.last_migration = None;

        let primary = if self.path.exists() {
            match self.read_document(&self.path) {
                Ok(loaded) => Some(loaded),
                Err(err) => {
                    log::warn!("Save at {} is unusable: {}", self.path.display(), err);
                    self.quarantine();
                    None
                }
            }
        } else {
            None
        };

        if let Some(loaded) = primary {
            self.document = self.reconcile(loaded);
            self.dirty = self
                .last_migration
                .as_ref()
                .is_some_and(|r| r.steps_applied() > 0);
            log::info!("Loaded save from {}", self.path.display());
        } else if let Some(loaded) = self.read_backup() {
            self.document = self.reconcile(loaded);
            self.dirty = true;
            log::warn!("Recovered save from {}", self.backup_path().display());
        } else {
            log::info!("No usable save at {}, starting fresh", self.path.display());
            self.document = default_document(Utc::now());
            self.dirty = true;
        }
        &self.document
    }

    fn read_backup(&self) -> Option<Map<String, Value>> {
        let backup = self.backup_path();
        if !backup.exists() {
            return None;
        }
        match self.read_document(&backup) {
            Ok(loaded) => Some(loaded),
            Err(err) => {
                log::warn!("Backup {} is unusable too: {}", backup.display(), err);
                None
            }
        }
    }

    fn read_document(&self, path: &Path) -> Result<Map<String, Value>, PersistenceError> {
        let text = fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            Value::Null => Err(PersistenceError::NotAnObject("null")),
            Value::Bool(_) => Err(PersistenceError::NotAnObject("a boolean")),
            Value::Number(_) => Err(PersistenceError::NotAnObject("a number")),
            Value::String(_) => Err(PersistenceError::NotAnObject("a string")),
            Value::Array(_) => Err(PersistenceError::NotAnObject("an array")),
        }
    }

    /// Migrate, then backfill defaults under the loaded values
    fn reconcile(&mut self, mut loaded: Map<String, Value>) -> Value {
        let report = self.registry.migrate(&mut loaded);
        if report.final_version > self.registry.current() {
            log::warn!(
                "Save is from newer version v{} (this build writes v{}); keeping it as-is",
                report.final_version,
                self.registry.current()
            );
        } else if report.steps_applied() > 0 {
            log::info!(
                "Migrated save v{} -> v{}: {}",
                report.original_version,
                report.final_version,
                report.step_descriptions.join("; ")
            );
        }
        self.last_migration = Some(report);
        deep_merge(default_document(Utc::now()), Value::Object(loaded))
    }

    /// Move an unreadable save out of the way so the next save does not
    /// overwrite the only copy
    fn quarantine(&self) {
        let target = self.corrupted_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => log::warn!("Moved corrupt save to {}", target.display()),
            Err(err) => log::error!(
                "Could not move corrupt save {} aside: {}",
                self.path.display(),
                err
            ),
        }
    }

    /// Write the in-memory document. Returns `false` (with the previous
    /// file restored) if the write fails.
    pub fn save(&mut self) -> bool {
        set_path(&mut self.document, "updated_at", timestamp_value(Utc::now()));

        let text = match serde_json::to_string_pretty(&self.document) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("Save skipped, document failed to serialize: {}", err);
                return false;
            }
        };

        match self.write_with_backup(text.as_bytes()) {
            Ok(()) => {
                self.dirty = false;
                log::info!("Saved to {}", self.path.display());
                true
            }
            Err(err) => {
                log::warn!("Save failed, keeping previous file: {}", err);
                false
            }
        }
    }

    /// Replace the in-memory document and write it
    pub fn save_document(&mut self, document: Value) -> bool {
        if !document.is_object() {
            log::warn!("Refusing to save a document whose root is not an object");
            return false;
        }
        self.document = document;
        self.dirty = true;
        self.save()
    }

    /// Between the rename and the write only `.backup` exists on disk;
    /// `load` falls back to it
    fn write_with_backup(&self, data: &[u8]) -> Result<(), PersistenceError> {
        let backup = self.backup_path();
        let had_previous = self.path.exists();
        if had_previous {
            fs::rename(&self.path, &backup).map_err(|e| PersistenceError::io(&backup, e))?;
        }

        if let Err(err) = atomic_write(&self.path, data) {
            if had_previous {
                if let Err(restore_err) = fs::rename(&backup, &self.path) {
                    log::error!(
                        "Could not restore backup {}: {}",
                        backup.display(),
                        restore_err
                    );
                }
            }
            return Err(PersistenceError::io(&self.path, err));
        }
        Ok(())
    }

    /// Value at a dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.document, path)
    }

    /// Value at a dotted path, or `default` if absent
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Value at a dotted path decoded as `T`; `None` if absent or the
    /// wrong shape
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        T::deserialize(self.get(path)?).ok()
    }

    /// Store a value at a dotted path, creating intermediate objects
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        if set_path(&mut self.document, path, value.into()) {
            self.dirty = true;
        } else {
            log::warn!("Ignoring set on invalid path '{}'", path);
        }
    }

    /// Decode a top-level section, falling back to its default
    pub fn section<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.get(key).map(T::deserialize) {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                log::warn!("Section '{}' is malformed, using defaults: {}", key, err);
                T::default()
            }
            None => T::default(),
        }
    }

    /// Replace a top-level section with `value`
    pub fn set_section<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.set(key, value);
                true
            }
            Err(err) => {
                log::warn!("Section '{}' failed to serialize: {}", key, err);
                false
            }
        }
    }

    /// The whole document decoded into the typed schema
    pub fn data(&self) -> Result<SaveData, PersistenceError> {
        Ok(SaveData::deserialize(&self.document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use chrono::DateTime;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> PersistentStore {
        PersistentStore::new(dir.path().join("save.json"))
    }

    #[test]
    fn test_load_without_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let doc = store.load().clone();
        assert_eq!(doc["version"], "1.2.0");
        assert!(doc["created_at"].is_string());
        assert!(store.has_unsaved_changes());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_round_trip_through_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        store.set("player.selected_character", "sami");
        store.set("settings.master_volume", 0.25);
        store.set("progress.unlocked.vegas", true);
        store.set(
            "high_scores.ski.danny.easy",
            json!([{
                "player_name": "ana", "score": 40.2, "character": "danny",
                "game_mode": "ski", "difficulty": "easy",
                "timestamp": "2024-01-01T00:00:00Z", "time_elapsed": 40.2,
                "combo_multiplier": 1.0
            }]),
        );
        assert!(store.save());
        assert!(!store.has_unsaved_changes());

        let mut reloaded = store_in(&dir);
        reloaded.load();
        for path in [
            "player.selected_character",
            "settings.master_volume",
            "progress.unlocked.vegas",
            "high_scores.ski.danny.easy",
            "created_at",
        ] {
            assert_eq!(reloaded.get(path), store.get(path), "mismatch at {path}");
        }
        assert!(reloaded.last_migration().unwrap().steps_applied() == 0);
        assert!(!reloaded.has_unsaved_changes());
    }

    #[test]
    fn test_migration_backfills_missing_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(
            &path,
            r#"{"version": "1.0.0", "settings": {"master_volume": 0.35, "sound_volume": 0.5}}"#,
        )
        .unwrap();

        let mut store = PersistentStore::new(&path);
        store.load();

        assert_eq!(store.get("version"), Some(&json!("1.2.0")));
        assert_eq!(store.get("settings.master_volume"), Some(&json!(0.35)));
        assert_eq!(store.get("settings.sfx_volume"), Some(&json!(0.5)));
        assert_eq!(store.get("settings.sound_volume"), None);
        assert_eq!(store.get("high_scores.pool.sami.hard"), Some(&json!([])));
        assert!(store.get("player.name").is_some());
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn test_corrupted_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, "{ this is not json").unwrap();

        let mut store = PersistentStore::new(&path);
        let doc = store.load().clone();

        assert_eq!(doc["version"], "1.2.0");
        assert_eq!(doc["high_scores"]["ski"]["danny"]["normal"], json!([]));
        let quarantined = store.corrupted_path();
        assert_eq!(fs::read_to_string(quarantined).unwrap(), "{ this is not json");
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_primary_recovers_from_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        store.set("player.name", "kept");
        assert!(store.save());
        // Crash after the rename to .backup, before the new file landed
        fs::rename(store.path(), store.backup_path()).unwrap();

        let mut reloaded = store_in(&dir);
        reloaded.load();
        assert_eq!(reloaded.get("player.name"), Some(&json!("kept")));
        assert!(reloaded.has_unsaved_changes());
        assert!(reloaded.save());
        assert!(reloaded.path().exists());
    }

    #[test]
    fn test_corrupted_primary_recovers_from_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        store.set("player.name", "older");
        assert!(store.save());
        store.set("player.name", "newer");
        assert!(store.save());
        fs::write(store.path(), "{ truncated").unwrap();

        let mut reloaded = store_in(&dir);
        reloaded.load();
        assert_eq!(reloaded.get("player.name"), Some(&json!("older")));
        assert!(reloaded.corrupted_path().exists());
    }

    #[test]
    fn test_unusable_backup_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.backup_path(), "not json").unwrap();

        let mut reloaded = store_in(&dir);
        reloaded.load();
        assert_eq!(reloaded.get("player.name"), Some(&json!("Player")));
    }

    #[test]
    fn test_non_object_root_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let mut store = PersistentStore::new(&path);
        store.load();
        assert!(store.corrupted_path().exists());
        assert!(store.get("settings").is_some());
    }

    #[test]
    fn test_save_keeps_previous_file_as_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        store.set("player.name", "first");
        assert!(store.save());
        store.set("updated_at", "2000-01-01T00:00:00.000Z");
        store.set("player.name", "second");
        assert!(store.save());
        let stamped: DateTime<Utc> = store.get_as("updated_at").unwrap();
        assert!(stamped > "2000-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap());

        let backup: Value =
            serde_json::from_str(&fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup["player"]["name"], "first");
        let current: Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(current["player"]["name"], "second");
        assert_eq!(current["updated_at"], store.get("updated_at").cloned().unwrap());
    }

    #[test]
    fn test_failed_write_restores_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        store.set("player.name", "safe");
        assert!(store.save());
        let before = fs::read_to_string(store.path()).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(sibling_path(store.path(), ".tmp")).unwrap();
        store.set("player.name", "lost");
        assert!(!store.save());

        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        assert!(store.has_unsaved_changes());
        // In-memory state is still the newest
        assert_eq!(store.get("player.name"), Some(&json!("lost")));
    }

    #[test]
    fn test_get_or_and_get_as() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        assert_eq!(store.get_or("settings.nope", json!(7)), json!(7));
        assert_eq!(store.get_or("settings.master_volume.deeper", json!(1)), json!(1));
        assert_eq!(store.get_as::<bool>("progress.unlocked.ski"), Some(true));
        assert_eq!(store.get_as::<bool>("player.name"), None);
    }

    #[test]
    fn test_set_ignores_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        assert!(store.save());
        store.set("", 1);
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn test_typed_sections() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.load();
        let mut settings: Settings = store.section("settings");
        settings.fullscreen = true;
        assert!(store.set_section("settings", &settings));
        assert_eq!(store.get("settings.fullscreen"), Some(&json!(true)));

        // Wrong shape falls back to defaults
        store.set("settings", "oops");
        assert_eq!(store.section::<Settings>("settings"), Settings::default());
        store.set_section("settings", &Settings::default());
        assert!(store.data().is_ok());
    }

    #[test]
    fn test_save_document_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        assert!(!store.save_document(json!([1])));
        assert!(store.save_document(json!({"version": "1.2.0"})));
        assert!(store.path().exists());
    }

    #[test]
    fn test_newer_version_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, r#"{"version": "3.0.0"}"#).unwrap();
        let mut store = PersistentStore::new(&path);
        store.load();
        assert_eq!(store.version(), SaveVersion::new(3, 0, 0));
        assert!(store.get("high_scores").is_some());
    }
}
