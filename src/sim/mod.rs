//! Slope simulation module
//!
//! Everything the skiing minigame needs between input and rendering:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by pool slot)
//! - No rendering or platform dependencies

pub mod chunk;
pub mod entities;
pub mod pool;
pub mod rect;
pub mod slope;

pub use chunk::{ChunkGenerator, ChunkLayout, CollectiblePlacement, ObstaclePlacement, TerrainChunk};
pub use entities::{
    Obstacle, ObstacleAssets, ObstacleKind, ObstacleSpawn, ObstacleSprite, Snowflake,
    SnowflakeAssets, SnowflakeSpawn,
};
pub use pool::{DESPAWN_MARGIN, ObjectPool, PoolHandle, Poolable};
pub use rect::Rect;
pub use slope::{SlopeAssets, SlopeSimulation, difficulty_at};
