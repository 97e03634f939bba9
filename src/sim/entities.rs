//! Pooled slope entities: obstacles and snowflakes
//!
//! Positions are sprite centres in screen space. Footprints and hitboxes
//! come from the shared asset records handed to each pool.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::pool::Poolable;
use super::rect::Rect;

/// Obstacle variety; affects footprint and hitbox only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Tree,
    Rock,
}

/// Sprite footprint and collision box for one obstacle kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSprite {
    pub size: Vec2,
    pub hitbox_size: Vec2,
    /// Hitbox centre relative to the sprite centre
    pub hitbox_offset: Vec2,
}

/// Shared obstacle resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleAssets {
    pub tree: ObstacleSprite,
    pub rock: ObstacleSprite,
}

impl ObstacleAssets {
    pub fn sprite(&self, kind: ObstacleKind) -> &ObstacleSprite {
        match kind {
            ObstacleKind::Tree => &self.tree,
            ObstacleKind::Rock => &self.rock,
        }
    }

    /// Furthest any hitbox reaches sideways from its obstacle centre
    pub fn max_hitbox_reach(&self) -> f32 {
        [self.tree, self.rock]
            .iter()
            .map(|s| s.hitbox_offset.x.abs() + s.hitbox_size.x / 2.0)
            .fold(0.0, f32::max)
    }
}

impl Default for ObstacleAssets {
    fn default() -> Self {
        Self {
            // Only the trunk collides
            tree: ObstacleSprite {
                size: Vec2::new(64.0, 96.0),
                hitbox_size: Vec2::new(24.0, 24.0),
                hitbox_offset: Vec2::new(0.0, 36.0),
            },
            rock: ObstacleSprite {
                size: Vec2::new(48.0, 32.0),
                hitbox_size: Vec2::new(40.0, 22.0),
                hitbox_offset: Vec2::new(0.0, 4.0),
            },
        }
    }
}

/// Where and what to spawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleSpawn {
    pub pos: Vec2,
    pub kind: ObstacleKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub pos: Vec2,
    pub kind: ObstacleKind,
    pub sprite: ObstacleSprite,
}

impl Obstacle {
    /// Visual extent
    pub fn footprint(&self) -> Rect {
        Rect::from_center(self.pos, self.sprite.size)
    }

    pub fn hitbox(&self) -> Rect {
        Rect::from_center(self.pos + self.sprite.hitbox_offset, self.sprite.hitbox_size)
    }
}

impl Poolable for Obstacle {
    type Params = ObstacleSpawn;
    type Assets = ObstacleAssets;

    fn placeholder(assets: &ObstacleAssets) -> Self {
        Obstacle {
            pos: Vec2::ZERO,
            kind: ObstacleKind::Tree,
            sprite: assets.tree,
        }
    }

    fn respawn(&mut self, params: ObstacleSpawn, assets: &ObstacleAssets) {
        self.pos = params.pos;
        self.kind = params.kind;
        self.sprite = *assets.sprite(params.kind);
    }

    fn advance(&mut self, scroll_delta: f32, _dt: f32) {
        self.pos.y += scroll_delta;
    }

    fn position(&self) -> Vec2 {
        self.pos
    }
}

/// Shared snowflake resources and motion constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnowflakeAssets {
    pub size: Vec2,
    /// Lateral drift amplitude in pixels
    pub float_amplitude: f32,
    /// Drift phase speed (rad/s)
    pub float_speed: f32,
    /// Spin (rad/s)
    pub spin_speed: f32,
}

impl Default for SnowflakeAssets {
    fn default() -> Self {
        Self {
            size: Vec2::new(24.0, 24.0),
            float_amplitude: 10.0,
            float_speed: 2.0,
            spin_speed: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowflakeSpawn {
    pub pos: Vec2,
    /// Starting drift phase, so neighbours don't sway in lockstep
    pub phase: f32,
}

/// Collectible that sways sideways and spins as it scrolls
#[derive(Debug, Clone, PartialEq)]
pub struct Snowflake {
    pub pos: Vec2,
    /// Centre of the lateral sway
    pub anchor_x: f32,
    pub phase: f32,
    pub rotation: f32,
    pub collected: bool,
    pub size: Vec2,
    float_amplitude: f32,
    float_speed: f32,
    spin_speed: f32,
}

impl Snowflake {
    pub fn hitbox(&self) -> Rect {
        Rect::from_center(self.pos, self.size)
    }

    /// Mark collected. `false` if it already was.
    pub fn collect(&mut self) -> bool {
        !std::mem::replace(&mut self.collected, true)
    }
}

impl Poolable for Snowflake {
    type Params = SnowflakeSpawn;
    type Assets = SnowflakeAssets;

    fn placeholder(assets: &SnowflakeAssets) -> Self {
        Snowflake {
            pos: Vec2::ZERO,
            anchor_x: 0.0,
            phase: 0.0,
            rotation: 0.0,
            collected: false,
            size: assets.size,
            float_amplitude: assets.float_amplitude,
            float_speed: assets.float_speed,
            spin_speed: assets.spin_speed,
        }
    }

    fn respawn(&mut self, params: SnowflakeSpawn, assets: &SnowflakeAssets) {
        *self = Snowflake::placeholder(assets);
        self.anchor_x = params.pos.x;
        self.phase = params.phase;
        self.pos = Vec2::new(params.pos.x + params.phase.sin() * self.float_amplitude, params.pos.y);
    }

    fn advance(&mut self, scroll_delta: f32, dt: f32) {
        self.pos.y += scroll_delta;
        self.phase = (self.phase + self.float_speed * dt) % TAU;
        self.pos.x = self.anchor_x + self.phase.sin() * self.float_amplitude;
        self.rotation = (self.rotation + self.spin_speed * dt) % TAU;
    }

    fn position(&self) -> Vec2 {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obstacle_respawn_takes_kind_sprite() {
        let assets = ObstacleAssets::default();
        let mut obstacle = Obstacle::placeholder(&assets);
        obstacle.respawn(
            ObstacleSpawn {
                pos: Vec2::new(100.0, 50.0),
                kind: ObstacleKind::Rock,
            },
            &assets,
        );
        assert_eq!(obstacle.sprite, assets.rock);
        assert_eq!(obstacle.footprint().size, Vec2::new(48.0, 32.0));
        assert_eq!(obstacle.hitbox().center(), Vec2::new(100.0, 54.0));
    }

    #[test]
    fn test_tree_hitbox_is_trunk() {
        let assets = ObstacleAssets::default();
        let mut tree = Obstacle::placeholder(&assets);
        tree.respawn(
            ObstacleSpawn {
                pos: Vec2::new(0.0, 0.0),
                kind: ObstacleKind::Tree,
            },
            &assets,
        );
        let hitbox = tree.hitbox();
        assert!(hitbox.size.x < tree.footprint().size.x);
        assert_eq!(hitbox.bottom(), tree.footprint().bottom());
    }

    #[test]
    fn test_max_hitbox_reach_is_rock_half_width() {
        assert_eq!(ObstacleAssets::default().max_hitbox_reach(), 20.0);
    }

    #[test]
    fn test_snowflake_sways_within_amplitude() {
        let assets = SnowflakeAssets::default();
        let mut flake = Snowflake::placeholder(&assets);
        flake.respawn(
            SnowflakeSpawn {
                pos: Vec2::new(300.0, 0.0),
                phase: 0.0,
            },
            &assets,
        );
        for _ in 0..240 {
            flake.advance(1.0, 1.0 / 120.0);
            assert!((flake.pos.x - 300.0).abs() <= assets.float_amplitude + 1e-3);
            assert!(flake.rotation >= 0.0 && flake.rotation < TAU);
        }
        assert!((flake.pos.y - 240.0).abs() < 1e-3);
    }

    #[test]
    fn test_collect_once() {
        let assets = SnowflakeAssets::default();
        let mut flake = Snowflake::placeholder(&assets);
        assert!(flake.collect());
        assert!(!flake.collect());
        flake.respawn(
            SnowflakeSpawn {
                pos: Vec2::ZERO,
                phase: 1.0,
            },
            &assets,
        );
        assert!(!flake.collected);
        assert_eq!(flake.rotation, 0.0);
    }
}
