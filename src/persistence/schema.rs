//! Typed save schema
//!
//! The default document is this struct serialized. Each top-level field is
//! one section of the file.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::migration::CURRENT_VERSION;
use crate::highscores::{Character, HighScoreTables};
use crate::settings::Settings;

/// Player profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerData {
    pub name: String,
    pub selected_character: Character,
    pub games_played: u32,
    /// Seconds across all sessions
    pub total_play_time: f64,
}

impl Default for PlayerData {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            selected_character: Character::default(),
            games_played: 0,
            total_play_time: 0.0,
        }
    }
}

/// Unlocks and trophies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    /// Minigames and characters by name
    pub unlocked: BTreeMap<String, bool>,
    pub trophies: BTreeMap<String, bool>,
    pub total_snowflakes: u64,
}

impl Default for Progress {
    fn default() -> Self {
        let unlocked = [("ski", true), ("pool", true), ("vegas", false)]
            .into_iter()
            .map(|(name, open)| (name.to_string(), open))
            .collect();
        Self {
            unlocked,
            trophies: BTreeMap::new(),
            total_snowflakes: 0,
        }
    }
}

/// The whole save file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub player: PlayerData,
    pub settings: Settings,
    pub progress: Progress,
    pub high_scores: HighScoreTables,
}

impl SaveData {
    /// Fresh save stamped with `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            player: PlayerData::default(),
            settings: Settings::default(),
            progress: Progress::default(),
            high_scores: HighScoreTables::default(),
        }
    }
}

/// `SaveData::new(now)` as a JSON tree
pub fn default_document(now: DateTime<Utc>) -> Value {
    serde_json::to_value(SaveData::new(now)).unwrap_or_else(|err| {
        log::error!("Default save schema failed to serialize: {}", err);
        Value::Object(Map::new())
    })
}

/// Timestamp as stored in the document
pub fn timestamp_value(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true))
}
