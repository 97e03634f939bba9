//! Ski slope simulation
//!
//! Screen space, y down. The world scrolls toward larger y: chunks are
//! generated above the top edge and forgotten below the bottom edge, and
//! their entities live in two fixed pools that reclaim anything scrolled
//! out of view.

use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec2;

use super::chunk::{ChunkGenerator, TerrainChunk};
use super::entities::{Obstacle, ObstacleAssets, ObstacleSpawn, Snowflake, SnowflakeAssets, SnowflakeSpawn};
use super::pool::ObjectPool;
use super::rect::Rect;
use crate::tuning::SlopeTuning;

/// Shared sprite resources for both pools
#[derive(Debug, Clone, Default)]
pub struct SlopeAssets {
    pub obstacles: Rc<ObstacleAssets>,
    pub snowflakes: Rc<SnowflakeAssets>,
}

/// Difficulty after `elapsed` seconds. Derived from time alone so it does
/// not depend on frame rate.
pub fn difficulty_at(tuning: &SlopeTuning, elapsed: f32) -> f32 {
    let elapsed = elapsed.max(0.0);
    let rate = tuning.difficulty_rate.max(0.0);
    (tuning.base_difficulty + elapsed * rate).min(tuning.max_difficulty)
}

/// Chunk lifecycle, difficulty progression and pooled entities
pub struct SlopeSimulation {
    tuning: SlopeTuning,
    generator: ChunkGenerator,
    obstacles: ObjectPool<Obstacle>,
    collectibles: ObjectPool<Snowflake>,
    /// Ordered by increasing y (topmost first)
    chunks: VecDeque<TerrainChunk>,
    /// Bottom edge of the next chunk to generate
    next_spawn_y: f32,
    difficulty: f32,
    safe_x: f32,
}

impl SlopeSimulation {
    /// Build the pools and fill the viewport
    pub fn new(tuning: &SlopeTuning, assets: SlopeAssets, seed: u64) -> Self {
        let mut sim = Self {
            tuning: tuning.clone(),
            generator: ChunkGenerator::new(tuning, seed)
                .with_clearance(assets.obstacles.max_hitbox_reach()),
            obstacles: ObjectPool::new(tuning.obstacle_pool_size, assets.obstacles),
            collectibles: ObjectPool::new(tuning.collectible_pool_size, assets.snowflakes),
            chunks: VecDeque::new(),
            next_spawn_y: tuning.initial_spawn_offset,
            difficulty: difficulty_at(tuning, 0.0),
            safe_x: tuning.screen_width / 2.0,
        };
        sim.fill_viewport();
        sim
    }

    fn chunk_height(&self) -> f32 {
        self.tuning.chunk_height.max(1.0)
    }

    /// Advance one step
    pub fn update(&mut self, scroll_speed: f32, dt: f32, elapsed: f32) {
        self.difficulty = self.difficulty.max(difficulty_at(&self.tuning, elapsed));

        let viewport_height = self.tuning.screen_height;
        self.obstacles.update(scroll_speed, dt, viewport_height);
        self.collectibles.update(scroll_speed, dt, viewport_height);

        let delta = scroll_speed * dt;
        let limit = viewport_height + self.chunk_height();
        for chunk in &mut self.chunks {
            chunk.y += delta;
        }
        // Entities were already reclaimed by the pools
        while self.chunks.back().is_some_and(|c| c.y > limit) {
            self.chunks.pop_back();
        }

        self.next_spawn_y += delta;
        self.fill_viewport();
    }

    /// Generate chunks upward until one full chunk sits above the screen
    fn fill_viewport(&mut self) {
        let height = self.chunk_height();
        while self.next_spawn_y > -height {
            self.spawn_chunk(self.next_spawn_y - height);
            self.next_spawn_y -= height;
        }
    }

    fn spawn_chunk(&mut self, top: f32) {
        let height = self.chunk_height();
        self.safe_x = self.generator.jitter_safe_x(self.safe_x);
        let safe_width = self.tuning.safe_zone_width;
        let layout = self
            .generator
            .generate(self.difficulty, height, self.safe_x, safe_width);

        for p in &layout.obstacles {
            let spawn = ObstacleSpawn {
                pos: Vec2::new(p.x, top + p.y_offset),
                kind: p.kind,
            };
            if self.obstacles.spawn(spawn).is_none() {
                log::debug!("Obstacle pool exhausted, skipping {:?} at {:.0}", p.kind, p.x);
            }
        }
        for p in &layout.collectibles {
            let spawn = SnowflakeSpawn {
                pos: Vec2::new(p.x, top + p.y_offset),
                phase: p.phase,
            };
            if self.collectibles.spawn(spawn).is_none() {
                log::debug!("Snowflake pool exhausted, skipping one at {:.0}", p.x);
            }
        }

        self.chunks
            .push_front(TerrainChunk::new(top, height, self.safe_x, safe_width, layout));
    }

    /// Back to the starting state, viewport refilled
    pub fn reset(&mut self) {
        self.obstacles.despawn_all();
        self.collectibles.despawn_all();
        self.chunks.clear();
        self.difficulty = difficulty_at(&self.tuning, 0.0);
        self.next_spawn_y = self.tuning.initial_spawn_offset;
        self.safe_x = self.tuning.screen_width / 2.0;
        self.fill_viewport();
        log::debug!("Slope reset with {} chunks", self.chunks.len());
    }

    pub fn active_obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter_active().map(|(_, o)| o)
    }

    /// Snowflakes still in play, collected ones included until they scroll
    /// away
    pub fn active_collectibles(&self) -> impl Iterator<Item = &Snowflake> {
        self.collectibles.iter_active().map(|(_, s)| s)
    }

    /// Collect every uncollected snowflake touching `player`. A snowflake
    /// is only ever returned once.
    pub fn check_collection(&mut self, player: Rect) -> Vec<Snowflake> {
        self.collectibles
            .iter_active_mut()
            .filter_map(|(_, flake)| {
                (flake.hitbox().intersects(&player) && flake.collect()).then(|| flake.clone())
            })
            .collect()
    }

    /// First obstacle whose hitbox overlaps `player`
    pub fn first_collision(&self, player: Rect) -> Option<&Obstacle> {
        self.active_obstacles().find(|o| o.hitbox().intersects(&player))
    }

    pub fn difficulty(&self) -> f32 {
        self.difficulty
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.iter()
    }

    /// Chunk under screen-space `y`
    pub fn chunk_at(&self, y: f32) -> Option<&TerrainChunk> {
        self.chunks.iter().find(|c| c.spans(y))
    }

    /// Corridor centre of the most recently generated chunk
    pub fn safe_x(&self) -> f32 {
        self.safe_x
    }

    pub fn obstacle_pool(&self) -> &ObjectPool<Obstacle> {
        &self.obstacles
    }

    pub fn collectible_pool(&self) -> &ObjectPool<Snowflake> {
        &self.collectibles
    }

    pub fn tuning(&self) -> &SlopeTuning {
        &self.tuning
    }
}
