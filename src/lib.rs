//! Powder Run - procedural ski slope and save-data core
//!
//! Core modules:
//! - `sim`: Slope generation, object pools, collision queries
//! - `persistence`: Versioned save document with migration and recovery
//! - `highscores`: Per-mode ranked leaderboards on top of the save
//! - `settings`: Typed preferences and environment overrides
//! - `tuning`: Data-driven game balance

pub mod error;
pub mod highscores;
pub mod persistence;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{LedgerError, PersistenceError, ValidationError};
pub use highscores::{Character, Difficulty, GameMode, ScoreEntry, ScoreLedger};
pub use persistence::PersistentStore;
pub use settings::{QualityPreset, SettingOverride, Settings};
pub use sim::SlopeSimulation;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;

    /// Downhill speed at the start of a run (pixels/s)
    pub const SKI_BASE_SPEED: f32 = 300.0;
    /// Extra speed per unit of difficulty
    pub const SKI_SPEED_PER_DIFFICULTY: f32 = 250.0;
    /// Skier lateral speed cap (pixels/s)
    pub const SKI_STEER_SPEED: f32 = 420.0;
    /// Skier hitbox
    pub const SKIER_WIDTH: f32 = 24.0;
    pub const SKIER_HEIGHT: f32 = 32.0;
    /// Skier y as a fraction of screen height
    pub const SKIER_SCREEN_Y: f32 = 0.8;
}

/// Downhill speed for the current difficulty
#[inline]
pub fn ski_speed(difficulty: f32) -> f32 {
    consts::SKI_BASE_SPEED + difficulty * consts::SKI_SPEED_PER_DIFFICULTY
}

/// Move `current` toward `target` by at most `max_step`
#[inline]
pub fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approach() {
        assert_eq!(approach(0.0, 10.0, 3.0), 3.0);
        assert_eq!(approach(0.0, -10.0, 3.0), -3.0);
        assert_eq!(approach(9.0, 10.0, 3.0), 10.0);
    }

    #[test]
    fn test_ski_speed_grows_with_difficulty() {
        assert!(ski_speed(0.8) > ski_speed(0.2));
        assert_eq!(ski_speed(0.0), consts::SKI_BASE_SPEED);
    }
}
