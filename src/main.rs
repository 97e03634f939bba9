//! Powder Run entry point
//!
//! Headless run: loads the save, plays one minute of slope with an
//! autopilot skier, records the result and prints the leaderboard.

use std::path::PathBuf;

use chrono::Utc;
use glam::Vec2;

use powder_run::consts::*;
use powder_run::highscores::{Difficulty, GameMode, ScoreEntry, ScoreLedger, format_date};
use powder_run::persistence::{PersistentStore, PlayerData};
use powder_run::settings::{Settings, apply_overrides, overrides_from_env};
use powder_run::sim::{Rect, SlopeAssets, SlopeSimulation};
use powder_run::{Tuning, approach, ski_speed};

/// Length of the demo run in seconds
const RUN_SECONDS: f32 = 60.0;
/// Seconds added to the run time per crash
const CRASH_PENALTY: f64 = 5.0;
/// Seconds taken off per snowflake
const SNOWFLAKE_BONUS: f64 = 0.5;
/// How far above the skier the autopilot reads the corridor
const LOOKAHEAD: f32 = 120.0;

fn save_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("POWDER_SAVE_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("powder_run_save.json"))
}

struct RunResult {
    elapsed: f32,
    snowflakes: u32,
    crashes: u32,
}

impl RunResult {
    fn score(&self) -> f64 {
        let raw = self.elapsed as f64 + self.crashes as f64 * CRASH_PENALTY
            - self.snowflakes as f64 * SNOWFLAKE_BONUS;
        raw.max(0.0)
    }
}

fn run_slope(tuning: &Tuning, settings: &Settings, seed: u64) -> RunResult {
    let slope = &tuning.slope;
    let mut sim = SlopeSimulation::new(slope, SlopeAssets::default(), seed);
    let skier_y = slope.screen_height * SKIER_SCREEN_Y;
    let mut skier_x = slope.screen_width / 2.0;

    let mut result = RunResult {
        elapsed: 0.0,
        snowflakes: 0,
        crashes: 0,
    };
    let mut in_contact = false;
    let steps = (RUN_SECONDS / SIM_DT).round() as u32;

    for _ in 0..steps {
        result.elapsed += SIM_DT;
        sim.update(ski_speed(sim.difficulty()), SIM_DT, result.elapsed);

        if let Some(chunk) = sim.chunk_at(skier_y - LOOKAHEAD) {
            skier_x = approach(skier_x, chunk.safe_x, SKI_STEER_SPEED * SIM_DT);
        }
        let hitbox = Rect::from_center(
            Vec2::new(skier_x, skier_y),
            Vec2::new(SKIER_WIDTH, SKIER_HEIGHT),
        );

        result.snowflakes += sim.check_collection(hitbox).len() as u32;

        // One crash per contact, not per frame of overlap
        match sim.first_collision(hitbox) {
            Some(obstacle) if !in_contact => {
                in_contact = true;
                if settings.debug.invincible {
                    log::debug!("Ghosted through {:?}", obstacle.kind);
                } else {
                    result.crashes += 1;
                    log::debug!(
                        "Crashed into {:?} at {:.1}s (difficulty {:.2})",
                        obstacle.kind,
                        result.elapsed,
                        sim.difficulty()
                    );
                }
            }
            Some(_) => {}
            None => in_contact = false,
        }
    }

    log::info!(
        "Run finished: {:.1}s, {} snowflakes, {} crashes, final difficulty {:.2}",
        result.elapsed,
        result.snowflakes,
        result.crashes,
        sim.difficulty()
    );
    result
}

fn main() {
    env_logger::init();
    log::info!("Powder Run (headless) starting...");

    let tuning = Tuning::default();
    let mut store = PersistentStore::new(save_path());
    store.load();
    apply_overrides(&mut store, &overrides_from_env());

    let settings = Settings::load(&store);
    log::info!(
        "Quality {}, sfx gain {:.2}, screen shake {}",
        settings.quality.as_str(),
        settings.effective_sfx_volume(),
        settings.effective_screen_shake()
    );

    let seed = Utc::now().timestamp_millis() as u64;
    let result = run_slope(&tuning, &settings, seed);

    let mut player: PlayerData = store.section("player");
    player.games_played += 1;
    player.total_play_time += result.elapsed as f64;
    store.set_section("player", &player);
    let total_snowflakes = store
        .get_as::<u64>("progress.total_snowflakes")
        .unwrap_or(0)
        + result.snowflakes as u64;
    store.set("progress.total_snowflakes", total_snowflakes);

    let character = player.selected_character;
    let entry = ScoreEntry::new(
        player.name.clone(),
        result.score(),
        GameMode::Ski,
        character,
        Difficulty::Normal,
    )
    .with_time_elapsed(result.elapsed as f64);

    let mut ledger = ScoreLedger::new(store, tuning.scoring.clone());
    match ledger.submit_score(entry) {
        Ok(true) => println!("New high score: {:.2}s!", result.score()),
        Ok(false) => println!("Run time {:.2}s, no high score this time", result.score()),
        Err(err) => {
            log::error!("Could not record run: {}", err);
            ledger.store_mut().save();
        }
    }

    let now = Utc::now();
    println!("\nSki / {} / {}", character, Difficulty::Normal);
    for (i, e) in ledger
        .leaderboard(GameMode::Ski, character, Some(Difficulty::Normal))
        .iter()
        .enumerate()
    {
        println!(
            "{:>2}. {:<12} {:>8.2}s  {}",
            i + 1,
            e.player_name,
            e.score,
            format_date(e.timestamp, now)
        );
    }
}
