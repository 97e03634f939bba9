//! Procedural terrain chunks
//!
//! A chunk is a horizontal band of the slope. Obstacles go in a left or
//! right zone around a safe corridor and never inside it, so every chunk
//! has an obstacle-free lane at least `safe_width` wide. Collectibles are
//! free to land anywhere, including the corridor.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entities::ObstacleKind;
use crate::tuning::SlopeTuning;

/// Obstacle placement, relative to the chunk's top edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    /// Centre x in screen space
    pub x: f32,
    pub y_offset: f32,
    pub kind: ObstacleKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectiblePlacement {
    pub x: f32,
    pub y_offset: f32,
    /// Initial sway phase
    pub phase: f32,
}

/// Output of one `generate` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkLayout {
    pub obstacles: Vec<ObstaclePlacement>,
    pub collectibles: Vec<CollectiblePlacement>,
}

/// A generated band of the slope as it scrolls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainChunk {
    /// Top edge in screen space
    pub y: f32,
    pub height: f32,
    pub safe_x: f32,
    pub safe_width: f32,
    pub obstacles: Vec<ObstaclePlacement>,
    pub collectibles: Vec<CollectiblePlacement>,
}

impl TerrainChunk {
    pub fn new(y: f32, height: f32, safe_x: f32, safe_width: f32, layout: ChunkLayout) -> Self {
        Self {
            y,
            height,
            safe_x,
            safe_width,
            obstacles: layout.obstacles,
            collectibles: layout.collectibles,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether screen-space `y` falls inside this band
    pub fn spans(&self, y: f32) -> bool {
        y >= self.y && y < self.bottom()
    }

    /// Left and right edges of the corridor
    pub fn corridor(&self) -> (f32, f32) {
        let half = self.safe_width / 2.0;
        (self.safe_x - half, self.safe_x + half)
    }
}

/// Seeded chunk generator
#[derive(Debug, Clone)]
pub struct ChunkGenerator {
    tuning: SlopeTuning,
    rng: Pcg32,
    /// Gap between an obstacle centre and the corridor edge
    clearance: f32,
}

/// x in an obstacle zone at distance `r` from its outer edge. The result
/// stays strictly off the zone's corridor-side edge even when `lo + r`
/// rounds up to it.
pub fn zone_x(lo: f32, hi: f32, r: f32, left: bool) -> f32 {
    if left {
        let x = lo + r;
        if x >= hi { hi.next_down().max(lo) } else { x }
    } else {
        let x = hi - r;
        if x <= lo { lo.next_up().min(hi) } else { x }
    }
}

impl ChunkGenerator {
    pub fn new(tuning: &SlopeTuning, seed: u64) -> Self {
        Self {
            tuning: tuning.clone(),
            rng: Pcg32::seed_from_u64(seed),
            clearance: 0.0,
        }
    }

    /// Keep obstacle centres `clearance` further from the corridor, so
    /// hitboxes of that half width stay out of it too
    pub fn with_clearance(mut self, clearance: f32) -> Self {
        self.clearance = clearance.max(0.0);
        self
    }

    /// Obstacles per chunk at `difficulty`, interpolated between the
    /// configured bounds
    pub fn obstacle_count(&self, difficulty: f32) -> u32 {
        let min = self.tuning.min_obstacles;
        let max = self.tuning.max_obstacles.max(min);
        let t = if difficulty.is_nan() {
            0.0
        } else {
            difficulty.clamp(0.0, 1.0)
        };
        min + ((max - min) as f32 * t).round() as u32
    }

    /// Lay out one chunk of `chunk_height` around the corridor centred on
    /// `safe_x`
    pub fn generate(
        &mut self,
        difficulty: f32,
        chunk_height: f32,
        safe_x: f32,
        safe_width: f32,
    ) -> ChunkLayout {
        let t = &self.tuning;
        let half = safe_width.max(0.0) / 2.0;
        let keep_out = half + self.clearance;
        let left = (t.edge_margin, safe_x - keep_out);
        let right = (safe_x + keep_out, t.screen_width - t.edge_margin);
        let left_bias = t.left_zone_bias.clamp(0.0, 1.0);
        let tree_chance = t.tree_chance.clamp(0.0, 1.0);

        let count = self.obstacle_count(difficulty);
        let mut layout = ChunkLayout::default();
        for _ in 0..count {
            let use_left = self.rng.random_bool(left_bias);
            let (lo, hi) = if use_left { left } else { right };
            let width = hi - lo;
            if width <= 0.0 {
                continue;
            }
            let r = self.rng.random_range(0.0..width);
            let x = zone_x(lo, hi, r, use_left);
            let y_offset = self.vertical_offset(chunk_height);
            let kind = if self.rng.random_bool(tree_chance) {
                ObstacleKind::Tree
            } else {
                ObstacleKind::Rock
            };
            layout.obstacles.push(ObstaclePlacement { x, y_offset, kind });
        }

        let min = self.tuning.min_collectibles;
        let max = self.tuning.max_collectibles.max(min);
        let collectibles = self.rng.random_range(min..=max);
        let (lo, hi) = (
            self.tuning.edge_margin,
            self.tuning.screen_width - self.tuning.edge_margin,
        );
        for _ in 0..collectibles {
            let x = if hi > lo {
                self.rng.random_range(lo..hi)
            } else {
                self.tuning.screen_width / 2.0
            };
            let y_offset = self.vertical_offset(chunk_height);
            let phase = self.rng.random_range(0.0..std::f32::consts::TAU);
            layout.collectibles.push(CollectiblePlacement { x, y_offset, phase });
        }

        log::debug!(
            "Chunk at difficulty {:.2}: {} obstacles, {} collectibles, corridor {:.0}±{:.0}",
            difficulty,
            layout.obstacles.len(),
            layout.collectibles.len(),
            safe_x,
            half
        );
        layout
    }

    fn vertical_offset(&mut self, chunk_height: f32) -> f32 {
        let margin = self.tuning.vertical_margin;
        if chunk_height - margin > margin {
            self.rng.random_range(margin..=chunk_height - margin)
        } else {
            chunk_height / 2.0
        }
    }

    /// Drift the corridor by up to the configured variance, keeping it on
    /// screen
    pub fn jitter_safe_x(&mut self, current: f32) -> f32 {
        let t = &self.tuning;
        let variance = t.safe_zone_variance;
        let jittered = if variance > 0.0 {
            current + self.rng.random_range(-variance..=variance)
        } else {
            current
        };
        let half = t.safe_zone_width / 2.0;
        let lo = t.edge_margin + half;
        let hi = t.screen_width - t.edge_margin - half;
        if lo > hi {
            t.screen_width / 2.0
        } else {
            jittered.clamp(lo, hi)
        }
    }
}
