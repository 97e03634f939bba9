//! Data-driven game balance
//!
//! Built once at startup (defaults or a JSON file) and handed to the
//! components that need it.

use serde::{Deserialize, Serialize};

/// All tunable numbers in one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub slope: SlopeTuning,
    pub scoring: ScoringTuning,
}

impl Tuning {
    /// Parse tuning from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Slope generation and scrolling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeTuning {
    /// Viewport size in pixels
    pub screen_width: f32,
    pub screen_height: f32,
    /// Height of one generated chunk
    pub chunk_height: f32,
    /// Spawn cursor at construction/reset (bottom edge of the first chunk)
    pub initial_spawn_offset: f32,

    // === Obstacles ===
    pub min_obstacles: u32,
    pub max_obstacles: u32,
    /// Lateral margin kept free at both screen edges
    pub edge_margin: f32,
    /// Margin kept free at the top and bottom of a chunk
    pub vertical_margin: f32,
    /// Probability an obstacle goes in the left zone
    pub left_zone_bias: f64,
    /// Probability an obstacle is a tree (otherwise a rock)
    pub tree_chance: f64,

    // === Safe corridor ===
    pub safe_zone_width: f32,
    /// Max lateral drift of the corridor between chunks
    pub safe_zone_variance: f32,

    // === Collectibles ===
    pub min_collectibles: u32,
    pub max_collectibles: u32,

    // === Difficulty curve ===
    pub base_difficulty: f32,
    /// Difficulty gained per second of elapsed time
    pub difficulty_rate: f32,
    pub max_difficulty: f32,

    // === Pools ===
    pub obstacle_pool_size: usize,
    pub collectible_pool_size: usize,
}

impl Default for SlopeTuning {
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 720.0,
            chunk_height: 400.0,
            initial_spawn_offset: 360.0,

            min_obstacles: 3,
            max_obstacles: 8,
            edge_margin: 50.0,
            vertical_margin: 20.0,
            left_zone_bias: 0.5,
            tree_chance: 0.6,

            safe_zone_width: 200.0,
            safe_zone_variance: 100.0,

            min_collectibles: 1,
            max_collectibles: 3,

            base_difficulty: 0.2,
            difficulty_rate: 0.01,
            max_difficulty: 0.8,

            obstacle_pool_size: 50,
            collectible_pool_size: 20,
        }
    }
}

/// Score formula constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTuning {
    /// Entries kept per leaderboard
    pub max_entries: usize,
    /// Combined-mode time limit in seconds
    pub time_limit: f64,
    /// Combined-mode bonus points per second left on the clock
    pub time_bonus_rate: f64,
}

impl Default for ScoringTuning {
    fn default() -> Self {
        Self {
            max_entries: crate::highscores::MAX_HIGH_SCORES,
            time_limit: 300.0,
            time_bonus_rate: 10.0,
        }
    }
}
