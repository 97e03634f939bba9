//! High score leaderboard system
//!
//! One ranked list per (game mode, character, difficulty), top 10 each,
//! persisted in the `high_scores` section of the save document.

pub mod entry;

pub use entry::{Character, Difficulty, GameMode, HighScoreTables, ScoreEntry, ScoringKind};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;
use crate::persistence::{CURRENT_VERSION, PersistentStore};
use crate::tuning::ScoringTuning;

/// Maximum number of high scores to keep per list
pub const MAX_HIGH_SCORES: usize = 10;

/// Document section holding the tables
const SECTION: &str = "high_scores";

/// Aggregates over one mode's scores
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeaderboardStats {
    pub count: usize,
    pub average_score: f64,
    pub top_score: Option<f64>,
    pub top_player: Option<String>,
}

/// Outcome of `ScoreLedger::import_leaderboard`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// Records that validated and were merged in
    pub imported: usize,
    /// Of those, how many are still on a leaderboard after truncation
    pub ranked: usize,
    /// Malformed records that were skipped
    pub skipped: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct LeaderboardExport {
    version: String,
    exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    game_mode: Option<GameMode>,
    entries: Vec<ScoreEntry>,
}

/// Ranked score lists layered on the persistent store
pub struct ScoreLedger {
    store: PersistentStore,
    tables: HighScoreTables,
    tuning: ScoringTuning,
}

impl ScoreLedger {
    /// Take ownership of a (loaded) store and read its tables
    pub fn new(store: PersistentStore, tuning: ScoringTuning) -> Self {
        let empty = Value::Null;
        let section = store.get(SECTION).unwrap_or(&empty);
        let (mut tables, skipped) = HighScoreTables::from_section(section);
        if skipped > 0 {
            log::warn!("Dropped {} invalid high score records", skipped);
        }
        // Hand-edited files may be out of order or over the cap
        for list in tables.lists_mut() {
            if let Some(first) = list.first() {
                let kind = first.game_mode.scoring();
                list.sort_by(|a, b| kind.compare(a.score, b.score));
                list.truncate(tuning.max_entries);
            }
        }
        log::info!(
            "Loaded {} high scores",
            tables.iter().map(|(.., list)| list.len()).sum::<usize>()
        );
        Self {
            store,
            tables,
            tuning,
        }
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PersistentStore {
        &mut self.store
    }

    pub fn into_store(self) -> PersistentStore {
        self.store
    }

    pub fn tables(&self) -> &HighScoreTables {
        &self.tables
    }

    /// Final score for the combined mode:
    /// `base * combo + max(0, (time_limit - elapsed) * bonus_rate)`
    pub fn combined_score(&self, base_score: f64, combo_multiplier: f64, time_elapsed: f64) -> f64 {
        let time_bonus =
            ((self.tuning.time_limit - time_elapsed) * self.tuning.time_bonus_rate).max(0.0);
        base_score * combo_multiplier + time_bonus
    }

    /// Record a finished round.
    ///
    /// Returns whether the entry made its leaderboard. A failed save is
    /// logged and the in-memory tables stay authoritative.
    pub fn submit_score(&mut self, mut entry: ScoreEntry) -> Result<bool, LedgerError> {
        entry.validate()?;
        if entry.game_mode.scoring() == ScoringKind::Combined {
            entry.score =
                self.combined_score(entry.score, entry.combo_multiplier, entry.time_elapsed);
        }
        log::info!(
            "Score submitted: {} {} by {} ({}/{})",
            entry.game_mode,
            entry.score,
            entry.player_name,
            entry.character,
            entry.difficulty
        );
        let made_board = self.insert(entry).is_some();
        self.persist();
        Ok(made_board)
    }

    /// Insert into the matching list, returning the 1-based rank if the
    /// entry survives truncation
    fn insert(&mut self, entry: ScoreEntry) -> Option<usize> {
        let kind = entry.game_mode.scoring();
        let max = self.tuning.max_entries;
        let list = self
            .tables
            .list_mut(entry.game_mode, entry.character, entry.difficulty);

        // After every entry it strictly beats; ties keep older entries first
        let pos = list
            .iter()
            .position(|e| kind.is_better(entry.score, e.score))
            .unwrap_or(list.len());
        list.insert(pos, entry);
        list.truncate(max);

        (pos < max).then_some(pos + 1)
    }

    fn persist(&mut self) -> bool {
        if !self.store.set_section(SECTION, &self.tables) {
            return false;
        }
        let saved = self.store.save();
        if !saved {
            log::warn!("High scores kept in memory only; save failed");
        }
        saved
    }

    /// Ranked entries for a character; with no difficulty the three lists
    /// are merged and cut back to the top 10
    pub fn leaderboard(
        &self,
        mode: GameMode,
        character: Character,
        difficulty: Option<Difficulty>,
    ) -> Vec<ScoreEntry> {
        match difficulty {
            Some(difficulty) => self.tables.list(mode, character, difficulty).to_vec(),
            None => {
                let kind = mode.scoring();
                let mut merged: Vec<ScoreEntry> = Difficulty::ALL
                    .iter()
                    .flat_map(|&d| self.tables.list(mode, character, d).iter().cloned())
                    .collect();
                merged.sort_by(|a, b| kind.compare(a.score, b.score));
                merged.truncate(self.tuning.max_entries);
                merged
            }
        }
    }

    /// Whether `score` would make the list: room left, or strictly better
    /// than the current worst
    pub fn is_high_score(
        &self,
        score: f64,
        mode: GameMode,
        character: Character,
        difficulty: Difficulty,
    ) -> bool {
        let list = self.tables.list(mode, character, difficulty);
        if list.len() < self.tuning.max_entries {
            return true;
        }
        list.last()
            .map(|worst| mode.scoring().is_better(score, worst.score))
            .unwrap_or(true)
    }

    /// 1-based rank `score` would take. Larger than the list cap when it
    /// would not qualify.
    pub fn rank(
        &self,
        score: f64,
        mode: GameMode,
        character: Character,
        difficulty: Difficulty,
    ) -> usize {
        let kind = mode.scoring();
        let ahead = self
            .tables
            .list(mode, character, difficulty)
            .iter()
            .filter(|e| !kind.is_better(score, e.score))
            .count();
        ahead + 1
    }

    /// A player's best entry in a mode, optionally narrowed
    pub fn personal_best(
        &self,
        player_name: &str,
        mode: GameMode,
        character: Option<Character>,
        difficulty: Option<Difficulty>,
    ) -> Option<ScoreEntry> {
        let kind = mode.scoring();
        self.tables
            .iter()
            .filter(|(m, c, d, _)| {
                *m == mode
                    && character.is_none_or(|want| want == *c)
                    && difficulty.is_none_or(|want| want == *d)
            })
            .flat_map(|(.., list)| list.iter())
            .filter(|e| e.player_name == player_name)
            .min_by(|a, b| kind.compare(a.score, b.score))
            .cloned()
    }

    /// Empty every list matching the filters (`None` matches all)
    pub fn clear_scores(
        &mut self,
        mode: Option<GameMode>,
        character: Option<Character>,
        difficulty: Option<Difficulty>,
    ) {
        let mut cleared = 0;
        for m in GameMode::ALL.into_iter().filter(|m| mode.is_none_or(|w| w == *m)) {
            for c in Character::ALL.into_iter().filter(|c| character.is_none_or(|w| w == *c)) {
                for d in Difficulty::ALL.into_iter().filter(|d| difficulty.is_none_or(|w| w == *d)) {
                    let list = self.tables.list_mut(m, c, d);
                    cleared += list.len();
                    list.clear();
                }
            }
        }
        log::info!("Cleared {} high scores", cleared);
        self.persist();
    }

    /// Count, mean and best over a mode (all difficulties)
    pub fn statistics(&self, mode: GameMode, character: Option<Character>) -> LeaderboardStats {
        let kind = mode.scoring();
        let entries: Vec<&ScoreEntry> = self
            .tables
            .iter()
            .filter(|(m, c, ..)| *m == mode && character.is_none_or(|want| want == *c))
            .flat_map(|(.., list)| list.iter())
            .collect();
        if entries.is_empty() {
            return LeaderboardStats::default();
        }
        let total: f64 = entries.iter().map(|e| e.score).sum();
        let top = entries
            .iter()
            .min_by(|a, b| kind.compare(a.score, b.score));
        LeaderboardStats {
            count: entries.len(),
            average_score: total / entries.len() as f64,
            top_score: top.map(|e| e.score),
            top_player: top.map(|e| e.player_name.clone()),
        }
    }

    /// Serialize scores (one mode or all) for sharing or backup
    pub fn export_leaderboard(&self, mode: Option<GameMode>) -> Result<String, LedgerError> {
        let entries = self
            .tables
            .iter()
            .filter(|(m, ..)| mode.is_none_or(|want| want == *m))
            .flat_map(|(.., list)| list.iter().cloned())
            .collect();
        let export = LeaderboardExport {
            version: CURRENT_VERSION.to_string(),
            exported_at: Utc::now(),
            game_mode: mode,
            entries,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Merge an export back in.
    ///
    /// Each record is validated like a submission; bad ones are skipped
    /// with a warning. Scores are taken as final (no combined-mode
    /// recompute).
    pub fn import_leaderboard(&mut self, json: &str) -> Result<ImportSummary, LedgerError> {
        let document: Value = serde_json::from_str(json)?;
        let records = document
            .get("entries")
            .and_then(Value::as_array)
            .ok_or(LedgerError::MissingEntries)?;

        let mut summary = ImportSummary::default();
        for (i, record) in records.iter().enumerate() {
            match ScoreEntry::from_value(record) {
                Ok(entry) => {
                    summary.imported += 1;
                    if self.insert(entry).is_some() {
                        summary.ranked += 1;
                    }
                }
                Err(err) => {
                    log::warn!("Skipping imported score #{}: {}", i, err);
                    summary.skipped += 1;
                }
            }
        }
        if summary.imported > 0 {
            self.persist();
        }
        log::info!(
            "Imported {} scores ({} ranked, {} skipped)",
            summary.imported,
            summary.ranked,
            summary.skipped
        );
        Ok(summary)
    }
}

/// Format a timestamp as a relative date string
pub fn format_date(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(timestamp);
    let days = diff.num_days();
    let hours = diff.num_hours();
    let mins = diff.num_minutes();

    if days >= 1 {
        if days == 1 {
            "Yesterday".to_string()
        } else if days < 7 {
            format!("{} days ago", days)
        } else {
            format!(
                "{}/{}/{:02}",
                timestamp.month(),
                timestamp.day(),
                timestamp.year() % 100
            )
        }
    } else if hours >= 1 {
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if mins >= 1 {
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", mins)
        }
    } else {
        "Just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, ScoreLedger) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::new(dir.path().join("save.json"));
        store.load();
        (dir, ScoreLedger::new(store, ScoringTuning::default()))
    }

    fn entry(mode: GameMode, score: f64) -> ScoreEntry {
        ScoreEntry::new("tester", score, mode, Character::Danny, Difficulty::Normal)
    }

    fn scores(ledger: &ScoreLedger, mode: GameMode) -> Vec<f64> {
        ledger
            .leaderboard(mode, Character::Danny, Some(Difficulty::Normal))
            .iter()
            .map(|e| e.score)
            .collect()
    }

    #[test]
    fn test_time_based_sorts_ascending() {
        let (_dir, mut ledger) = ledger();
        for time in [45.5, 40.2, 50.0] {
            assert!(ledger.submit_score(entry(GameMode::Ski, time)).unwrap());
        }
        assert_eq!(scores(&ledger, GameMode::Ski), vec![40.2, 45.5, 50.0]);
    }

    #[test]
    fn test_top_ten_cap_points_based() {
        let (_dir, mut ledger) = ledger();
        for i in 0..15 {
            ledger.submit_score(entry(GameMode::Pool, i as f64 * 100.0)).unwrap();
        }
        let expected: Vec<f64> = (5..15).rev().map(|i| i as f64 * 100.0).collect();
        assert_eq!(scores(&ledger, GameMode::Pool), expected);
    }

    #[test]
    fn test_submit_reports_whether_entry_ranked() {
        let (_dir, mut ledger) = ledger();
        for i in 0..10 {
            ledger.submit_score(entry(GameMode::Pool, 1000.0 + i as f64)).unwrap();
        }
        assert!(!ledger.submit_score(entry(GameMode::Pool, 5.0)).unwrap());
        // Ties with the worst entry do not displace it
        assert!(!ledger.submit_score(entry(GameMode::Pool, 1000.0)).unwrap());
        assert!(ledger.submit_score(entry(GameMode::Pool, 1000.5)).unwrap());
    }

    #[test]
    fn test_vegas_combined_formula() {
        let (_dir, mut ledger) = ledger();
        let vegas = entry(GameMode::Vegas, 5000.0)
            .with_combo(1.5)
            .with_time_elapsed(120.0);
        ledger.submit_score(vegas).unwrap();
        assert_eq!(scores(&ledger, GameMode::Vegas), vec![9300.0]);
    }

    #[test]
    fn test_vegas_time_bonus_never_negative() {
        let (_dir, ledger) = ledger();
        assert_eq!(ledger.combined_score(100.0, 2.0, 400.0), 200.0);
    }

    #[test]
    fn test_submit_rejects_invalid_entry() {
        let (_dir, mut ledger) = ledger();
        let result = ledger.submit_score(entry(GameMode::Pool, f64::INFINITY));
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert!(scores(&ledger, GameMode::Pool).is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        let err = ScoreEntry::parse("x", 1.0, "golf", "danny", "easy").unwrap_err();
        assert_eq!(err.to_string(), "unknown game mode 'golf'");
        assert!(ScoreEntry::parse("x", 1.0, "ski", "danny", "impossible").is_err());
    }

    #[test]
    fn test_is_high_score_and_rank() {
        let (_dir, mut ledger) = ledger();
        let (c, d) = (Character::Danny, Difficulty::Normal);
        assert!(ledger.is_high_score(99.0, GameMode::Ski, c, d));
        for t in 1..=10 {
            ledger.submit_score(entry(GameMode::Ski, t as f64 * 10.0)).unwrap();
        }
        assert!(ledger.is_high_score(99.0, GameMode::Ski, c, d));
        assert!(!ledger.is_high_score(100.0, GameMode::Ski, c, d));
        assert!(!ledger.is_high_score(150.0, GameMode::Ski, c, d));

        assert_eq!(ledger.rank(5.0, GameMode::Ski, c, d), 1);
        assert_eq!(ledger.rank(25.0, GameMode::Ski, c, d), 3);
        // Ties rank behind the existing entry
        assert_eq!(ledger.rank(20.0, GameMode::Ski, c, d), 3);
        assert_eq!(ledger.rank(500.0, GameMode::Ski, c, d), 11);
    }

    #[test]
    fn test_leaderboard_merges_difficulties() {
        let (_dir, mut ledger) = ledger();
        for (i, d) in Difficulty::ALL.into_iter().enumerate() {
            for j in 0..5 {
                let score = (i * 5 + j) as f64;
                let e = ScoreEntry::new("p", score, GameMode::Pool, Character::Sami, d);
                ledger.submit_score(e).unwrap();
            }
        }
        let merged = ledger.leaderboard(GameMode::Pool, Character::Sami, None);
        assert_eq!(merged.len(), 10);
        assert_eq!(merged[0].score, 14.0);
        assert_eq!(merged[9].score, 5.0);
        assert!(ledger.leaderboard(GameMode::Pool, Character::Danny, None).is_empty());
    }

    #[test]
    fn test_personal_best_and_statistics() {
        let (_dir, mut ledger) = ledger();
        for (name, time, d) in [
            ("ana", 50.0, Difficulty::Easy),
            ("ana", 42.0, Difficulty::Hard),
            ("bo", 39.0, Difficulty::Easy),
        ] {
            let e = ScoreEntry::new(name, time, GameMode::Ski, Character::Danny, d);
            ledger.submit_score(e).unwrap();
        }
        let best = ledger
            .personal_best("ana", GameMode::Ski, None, None)
            .unwrap();
        assert_eq!(best.score, 42.0);
        let easy_best = ledger
            .personal_best("ana", GameMode::Ski, None, Some(Difficulty::Easy))
            .unwrap();
        assert_eq!(easy_best.score, 50.0);
        assert!(ledger.personal_best("cy", GameMode::Ski, None, None).is_none());

        let stats = ledger.statistics(GameMode::Ski, None);
        assert_eq!(stats.count, 3);
        assert!((stats.average_score - 131.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.top_score, Some(39.0));
        assert_eq!(stats.top_player.as_deref(), Some("bo"));
        assert_eq!(ledger.statistics(GameMode::Pool, None), LeaderboardStats::default());
    }

    #[test]
    fn test_clear_scores_by_filter() {
        let (_dir, mut ledger) = ledger();
        ledger.submit_score(entry(GameMode::Ski, 40.0)).unwrap();
        ledger.submit_score(entry(GameMode::Pool, 400.0)).unwrap();
        ledger.clear_scores(Some(GameMode::Ski), None, None);
        assert!(scores(&ledger, GameMode::Ski).is_empty());
        assert_eq!(scores(&ledger, GameMode::Pool), vec![400.0]);
        ledger.clear_scores(None, None, None);
        assert!(scores(&ledger, GameMode::Pool).is_empty());
    }

    #[test]
    fn test_scores_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        {
            let mut store = PersistentStore::new(&path);
            store.load();
            let mut ledger = ScoreLedger::new(store, ScoringTuning::default());
            ledger.submit_score(entry(GameMode::Ski, 41.0)).unwrap();
            ledger.submit_score(entry(GameMode::Ski, 39.5)).unwrap();
        }
        let mut store = PersistentStore::new(&path);
        store.load();
        let ledger = ScoreLedger::new(store, ScoringTuning::default());
        assert_eq!(scores(&ledger, GameMode::Ski), vec![39.5, 41.0]);
    }

    #[test]
    fn test_export_import_round_trip() {
        let (_dir, mut source) = ledger();
        source
            .submit_score(entry(GameMode::Vegas, 1000.0).with_time_elapsed(300.0))
            .unwrap();
        source.submit_score(entry(GameMode::Ski, 33.0)).unwrap();
        let json = source.export_leaderboard(None).unwrap();

        let (_dir2, mut target) = ledger();
        let summary = target.import_leaderboard(&json).unwrap();
        assert_eq!(summary, ImportSummary { imported: 2, ranked: 2, skipped: 0 });
        // Imported combined scores are not recomputed
        assert_eq!(scores(&target, GameMode::Vegas), vec![1000.0]);
        assert_eq!(scores(&target, GameMode::Ski), vec![33.0]);

        let ski_only = source.export_leaderboard(Some(GameMode::Ski)).unwrap();
        let value: Value = serde_json::from_str(&ski_only).unwrap();
        assert_eq!(value["entries"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_import_skips_malformed_entries() {
        let (_dir, mut ledger) = ledger();
        let json = r#"{
            "entries": [
                {"player_name": "ok", "score": 300, "character": "danny",
                 "game_mode": "pool", "difficulty": "normal",
                 "timestamp": "2024-01-01T00:00:00Z"},
                {"player_name": "bad", "score": 1, "character": "danny",
                 "game_mode": "golf", "difficulty": "normal"},
                {"player_name": "worse"}
            ]
        }"#;
        let summary = ledger.import_leaderboard(json).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(scores(&ledger, GameMode::Pool), vec![300.0]);
    }

    #[test]
    fn test_import_rejects_non_export_documents() {
        let (_dir, mut ledger) = ledger();
        assert!(matches!(
            ledger.import_leaderboard("not json"),
            Err(LedgerError::Json(_))
        ));
        assert!(matches!(
            ledger.import_leaderboard(r#"{"scores": []}"#),
            Err(LedgerError::MissingEntries)
        ));
    }

    #[test]
    fn test_format_date() {
        let now = DateTime::parse_from_rfc3339("2024-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_date(now - Duration::seconds(20), now), "Just now");
        assert_eq!(format_date(now - Duration::minutes(1), now), "1 min ago");
        assert_eq!(format_date(now - Duration::minutes(5), now), "5 mins ago");
        assert_eq!(format_date(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(format_date(now - Duration::days(1), now), "Yesterday");
        assert_eq!(format_date(now - Duration::days(4), now), "4 days ago");
        assert_eq!(format_date(now - Duration::days(30), now), "5/16/24");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_leaderboards_stay_ordered_and_capped(
            values in prop::collection::vec(0.0f64..10_000.0, 0..30),
            mode_index in 0usize..3,
        ) {
            let (_dir, mut ledger) = ledger();
            let mode = GameMode::ALL[mode_index];
            for v in &values {
                ledger.submit_score(entry(mode, *v)).unwrap();
            }
            let board = scores(&ledger, mode);
            prop_assert!(board.len() <= MAX_HIGH_SCORES);
            prop_assert_eq!(board.len(), values.len().min(MAX_HIGH_SCORES));
            for pair in board.windows(2) {
                match mode.scoring() {
                    ScoringKind::TimeBased => prop_assert!(pair[0] <= pair[1]),
                    _ => prop_assert!(pair[0] >= pair[1]),
                }
            }
        }
    }
}
