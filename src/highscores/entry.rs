//! Score records and the closed sets they are keyed by

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Minigames that keep leaderboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Ski,
    Pool,
    Vegas,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [GameMode::Ski, GameMode::Pool, GameMode::Vegas];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Ski => "ski",
            GameMode::Pool => "pool",
            GameMode::Vegas => "vegas",
        }
    }

    /// How scores in this mode are ranked
    pub fn scoring(&self) -> ScoringKind {
        match self {
            GameMode::Ski => ScoringKind::TimeBased,
            GameMode::Pool => ScoringKind::PointsBased,
            GameMode::Vegas => ScoringKind::Combined,
        }
    }
}

impl FromStr for GameMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ski" => Ok(GameMode::Ski),
            "pool" => Ok(GameMode::Pool),
            "vegas" => Ok(GameMode::Vegas),
            _ => Err(ValidationError::UnknownGameMode(s.to_string())),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playable characters
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Character {
    #[default]
    Danny,
    Sami,
}

impl Character {
    pub const ALL: [Character; 2] = [Character::Danny, Character::Sami];

    pub fn as_str(&self) -> &'static str {
        match self {
            Character::Danny => "danny",
            Character::Sami => "sami",
        }
    }
}

impl FromStr for Character {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "danny" => Ok(Character::Danny),
            "sami" => Ok(Character::Sami),
            _ => Err(ValidationError::UnknownCharacter(s.to_string())),
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Difficulty levels
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ValidationError::UnknownDifficulty(s.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranking rule for a game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringKind {
    /// Lower is better (race times)
    TimeBased,
    /// Higher is better
    PointsBased,
    /// Higher is better; score is rebuilt from base, combo and time bonus
    Combined,
}

impl ScoringKind {
    /// Strictly better; ties are not an improvement
    pub fn is_better(&self, candidate: f64, existing: f64) -> bool {
        self.compare(candidate, existing) == Ordering::Less
    }

    /// Best-first ordering for sorting leaderboards
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match self {
            ScoringKind::TimeBased => a.total_cmp(&b),
            ScoringKind::PointsBased | ScoringKind::Combined => b.total_cmp(&a),
        }
    }
}

fn default_combo() -> f64 {
    1.0
}

/// One finished round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player_name: String,
    pub score: f64,
    pub character: Character,
    pub game_mode: GameMode,
    pub difficulty: Difficulty,
    pub timestamp: DateTime<Utc>,
    /// Round length in seconds
    pub time_elapsed: f64,
    #[serde(default = "default_combo")]
    pub combo_multiplier: f64,
}

impl ScoreEntry {
    /// New entry stamped with the current time
    pub fn new(
        player_name: impl Into<String>,
        score: f64,
        game_mode: GameMode,
        character: Character,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            player_name: player_name.into(),
            score,
            character,
            game_mode,
            difficulty,
            timestamp: Utc::now(),
            time_elapsed: 0.0,
            combo_multiplier: 1.0,
        }
    }

    /// Build an entry from loosely-typed names (menus, CLI, imports)
    pub fn parse(
        player_name: impl Into<String>,
        score: f64,
        game_mode: &str,
        character: &str,
        difficulty: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(
            player_name,
            score,
            game_mode.parse()?,
            character.parse()?,
            difficulty.parse()?,
        ))
    }

    pub fn with_time_elapsed(mut self, seconds: f64) -> Self {
        self.time_elapsed = seconds;
        self
    }

    pub fn with_combo(mut self, multiplier: f64) -> Self {
        self.combo_multiplier = multiplier;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check the numeric fields
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.score.is_finite() {
            return Err(ValidationError::NonFiniteScore(self.score));
        }
        if !self.time_elapsed.is_finite() || self.time_elapsed < 0.0 {
            return Err(ValidationError::InvalidElapsedTime(self.time_elapsed));
        }
        if !self.combo_multiplier.is_finite() || self.combo_multiplier <= 0.0 {
            return Err(ValidationError::InvalidCombo(self.combo_multiplier));
        }
        Ok(())
    }

    /// Decode and validate a record from untrusted JSON.
    ///
    /// Enum fields go through `FromStr` so unknown names produce the
    /// specific validation error rather than a generic decode failure.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let raw = RawScoreEntry::deserialize(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let timestamp = match raw.timestamp {
            Some(ts) => DateTime::parse_from_rfc3339(&ts)
                .map_err(|e| ValidationError::Malformed(format!("timestamp '{ts}': {e}")))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };
        let entry = Self {
            player_name: raw.player_name,
            score: raw.score,
            character: raw.character.parse()?,
            game_mode: raw.game_mode.parse()?,
            difficulty: raw.difficulty.parse()?,
            timestamp,
            time_elapsed: raw.time_elapsed,
            combo_multiplier: raw.combo_multiplier,
        };
        entry.validate()?;
        Ok(entry)
    }
}

#[derive(Deserialize)]
struct RawScoreEntry {
    player_name: String,
    score: f64,
    character: String,
    game_mode: String,
    difficulty: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    time_elapsed: f64,
    #[serde(default = "default_combo")]
    combo_multiplier: f64,
}

type CharacterTables = BTreeMap<Character, BTreeMap<Difficulty, Vec<ScoreEntry>>>;

/// Ranked lists keyed `[game_mode][character][difficulty]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScoreTables(BTreeMap<GameMode, CharacterTables>);

impl Default for HighScoreTables {
    /// Every combination present with an empty list
    fn default() -> Self {
        let mut tables = BTreeMap::new();
        for mode in GameMode::ALL {
            let characters: &mut CharacterTables = tables.entry(mode).or_default();
            for character in Character::ALL {
                let difficulties = characters.entry(character).or_default();
                for difficulty in Difficulty::ALL {
                    difficulties.insert(difficulty, Vec::new());
                }
            }
        }
        Self(tables)
    }
}

impl HighScoreTables {
    pub fn list(
        &self,
        mode: GameMode,
        character: Character,
        difficulty: Difficulty,
    ) -> &[ScoreEntry] {
        self.0
            .get(&mode)
            .and_then(|c| c.get(&character))
            .and_then(|d| d.get(&difficulty))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn list_mut(
        &mut self,
        mode: GameMode,
        character: Character,
        difficulty: Difficulty,
    ) -> &mut Vec<ScoreEntry> {
        self.0
            .entry(mode)
            .or_default()
            .entry(character)
            .or_default()
            .entry(difficulty)
            .or_default()
    }

    /// Every list with its key
    pub fn iter(&self) -> impl Iterator<Item = (GameMode, Character, Difficulty, &[ScoreEntry])> {
        self.0.iter().flat_map(|(&mode, characters)| {
            characters.iter().flat_map(move |(&character, difficulties)| {
                difficulties
                    .iter()
                    .map(move |(&difficulty, list)| (mode, character, difficulty, list.as_slice()))
            })
        })
    }

    pub fn lists_mut(&mut self) -> impl Iterator<Item = &mut Vec<ScoreEntry>> {
        self.0
            .values_mut()
            .flat_map(|c| c.values_mut())
            .flat_map(|d| d.values_mut())
    }

    /// Rebuild tables from a stored `high_scores` section, keeping every
    /// record that validates. Returns the tables and the number of records
    /// dropped.
    pub fn from_section(section: &Value) -> (Self, usize) {
        let mut tables = Self::default();
        let mut skipped = 0;
        let Some(modes) = section.as_object() else {
            return (tables, skipped);
        };
        for (mode_key, characters) in modes {
            let Some(characters) = characters.as_object() else {
                continue;
            };
            for (character_key, difficulties) in characters {
                let Some(difficulties) = difficulties.as_object() else {
                    continue;
                };
                for (difficulty_key, list) in difficulties {
                    for record in list.as_array().into_iter().flatten() {
                        match ScoreEntry::from_value(record) {
                            Ok(entry)
                                if entry.game_mode.as_str() == mode_key
                                    && entry.character.as_str() == character_key
                                    && entry.difficulty.as_str() == difficulty_key =>
                            {
                                tables
                                    .list_mut(entry.game_mode, entry.character, entry.difficulty)
                                    .push(entry);
                            }
                            Ok(_) => {
                                log::warn!(
                                    "Dropping score filed under {mode_key}/{character_key}/{difficulty_key} with mismatched keys"
                                );
                                skipped += 1;
                            }
                            Err(err) => {
                                log::warn!(
                                    "Dropping invalid score in {mode_key}/{character_key}/{difficulty_key}: {err}"
                                );
                                skipped += 1;
                            }
                        }
                    }
                }
            }
        }
        (tables, skipped)
    }
}
