//! Save document migration chain
//!
//! Each step moves a document from one version to the next. Steps only
//! need to handle renames and reshapes; new sections are backfilled by the
//! deep merge with defaults that runs after migration.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::merge::{set_path, take_path};

/// Version written by this build
pub const CURRENT_VERSION: SaveVersion = SaveVersion::new(1, 2, 0);

/// Version assumed for documents with a missing or unreadable version
pub const LEGACY_VERSION: SaveVersion = SaveVersion::new(1, 0, 0);

/// A `MAJOR.MINOR.PATCH` save version, ordered numerically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SaveVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SaveVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Read the `version` field of a document, falling back to the legacy
    /// baseline when it is absent or malformed
    pub fn of_document(doc: &Map<String, Value>) -> Self {
        doc.get("version")
            .and_then(Value::as_str)
            .and_then(|v| v.parse().ok())
            .unwrap_or(LEGACY_VERSION)
    }
}

impl fmt::Display for SaveVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SaveVersion {
    type Err = String;

    /// Accepts `1`, `1.2` and `1.2.3`; missing components are zero
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u32; 3];
        let mut count = 0;
        for (i, piece) in s.trim().split('.').enumerate() {
            if i >= 3 {
                return Err(format!("too many components in version '{s}'"));
            }
            parts[i] = piece
                .parse()
                .map_err(|_| format!("bad version component '{piece}' in '{s}'"))?;
            count += 1;
        }
        if count == 0 {
            return Err("empty version".to_string());
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// A single step: transforms a document from `from` to `to`
pub(crate) struct MigrationStep {
    pub from: SaveVersion,
    pub to: SaveVersion,
    pub description: &'static str,
    pub migrate_fn: fn(&mut Map<String, Value>),
}

/// What `MigrationRegistry::migrate` did to a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub original_version: SaveVersion,
    pub final_version: SaveVersion,
    pub step_descriptions: Vec<&'static str>,
}

impl MigrationReport {
    pub fn steps_applied(&self) -> usize {
        self.step_descriptions.len()
    }
}

/// Ordered, validated chain of migration steps
pub(crate) struct MigrationRegistry {
    steps: Vec<MigrationStep>,
    current: SaveVersion,
}

impl MigrationRegistry {
    /// Build a registry from a list of steps.
    ///
    /// # Panics
    ///
    /// Panics if the steps do not form a contiguous chain from
    /// `LEGACY_VERSION` to `current`.
    pub fn new(mut steps: Vec<MigrationStep>, current: SaveVersion) -> Self {
        steps.sort_by_key(|s| s.from);
        let mut expected = LEGACY_VERSION;
        for step in &steps {
            assert_eq!(
                step.from, expected,
                "migration chain gap: expected a step from v{expected}, found v{}",
                step.from
            );
            assert!(step.to > step.from, "migration step v{} goes backwards", step.from);
            expected = step.to;
        }
        assert_eq!(
            expected, current,
            "migration chain ends at v{expected}, current version is v{current}"
        );
        Self { steps, current }
    }

    pub fn current(&self) -> SaveVersion {
        self.current
    }

    /// Bring `doc` up to the current version, stamping its `version` field.
    ///
    /// Documents from a newer build are left untouched.
    pub fn migrate(&self, doc: &mut Map<String, Value>) -> MigrationReport {
        let original_version = SaveVersion::of_document(doc);
        let mut version = original_version;
        let mut step_descriptions = Vec::new();

        if version < self.current {
            for step in &self.steps {
                // Versions between registered steps start at the next step up
                if step.to <= version {
                    continue;
                }
                (step.migrate_fn)(doc);
                version = step.to;
                step_descriptions.push(step.description);
            }
            doc.insert("version".to_string(), Value::String(version.to_string()));
        }

        MigrationReport {
            original_version,
            final_version: version,
            step_descriptions,
        }
    }
}

/// The full chain for this build
pub(crate) fn build_migration_registry() -> MigrationRegistry {
    let steps = vec![
        MigrationStep {
            from: SaveVersion::new(1, 0, 0),
            to: SaveVersion::new(1, 1, 0),
            description: "Add high_scores tables",
            migrate_fn: |_doc| {},
        },
        MigrationStep {
            from: SaveVersion::new(1, 1, 0),
            to: SaveVersion::new(1, 2, 0),
            description: "Rename settings.sound_volume and player.character",
            migrate_fn: migrate_1_1_to_1_2,
        },
    ];
    MigrationRegistry::new(steps, CURRENT_VERSION)
}

fn migrate_1_1_to_1_2(doc: &mut Map<String, Value>) {
    let mut root = Value::Object(std::mem::take(doc));
    for (old, new) in [
        ("settings.sound_volume", "settings.sfx_volume"),
        ("player.character", "player.selected_character"),
    ] {
        if let Some(value) = take_path(&mut root, old) {
            set_path(&mut root, new, value);
        }
    }
    if let Value::Object(map) = root {
        *doc = map;
    }
}
