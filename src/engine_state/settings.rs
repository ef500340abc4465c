//! # World Settings
//!
//! Runtime configuration for the voxel world, plus the coordinate algebra
//! that everything else is built on. Settings are plain data loaded from a
//! JSON file (or built from defaults), mirroring how the rest of the engine
//! is data-driven: the block catalog and biome table are JSON as well.
//!
//! ## Coordinate spaces
//!
//! Three coordinate spaces are in play and the helpers here convert between
//! them:
//! - **world position**: continuous `f32` space, in engine units
//! - **world block position**: integer block grid (`world / scaled_block_size`,
//!   floored)
//! - **chunk position + local block position**: a 2D chunk grid over X/Y with
//!   the full column height per chunk; local coordinates wrap with euclidean
//!   semantics so negative world blocks map correctly

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use cgmath::{Point2, Point3};
use serde::Deserialize;

/// Errors produced while loading configuration from disk or JSON text.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The JSON did not match the expected shape.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
        }
    }
}

impl Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

fn default_chunk_size() -> i32 {
    16
}
fn default_chunk_height() -> i32 {
    128
}
fn default_block_size() -> f32 {
    100.0
}
fn default_block_scale() -> f32 {
    0.25
}
fn default_draw_distance() -> i32 {
    5
}
fn default_seed() -> i32 {
    1000
}
fn default_water_level() -> i32 {
    55
}
fn default_saved_chunk_capacity() -> usize {
    4096
}
fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// World-level settings shared by generation, meshing and streaming.
///
/// The defaults match the constants the generation code was tuned against:
/// 16x16 chunk columns, 128 blocks of height, 100.0 engine units per block at
/// a 0.25 render scale, and water filling every column up to level 55.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldSettings {
    /// Chunk side length in blocks (chunks are `chunk_size`² columns).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: i32,
    /// Column height in blocks.
    #[serde(default = "default_chunk_height")]
    pub chunk_height: i32,
    /// Size of one block in engine units, before scaling.
    #[serde(default = "default_block_size")]
    pub block_size: f32,
    /// Scale applied to `block_size` when producing mesh geometry.
    #[serde(default = "default_block_scale")]
    pub block_scale: f32,
    /// Radius (in chunks) of the square of chunks kept meshed around the
    /// observer.
    #[serde(default = "default_draw_distance")]
    pub draw_distance: i32,
    /// World seed. All noise samplers and foliage streams derive from it.
    #[serde(default = "default_seed")]
    pub seed: i32,
    /// Columns whose surface falls below this z are flooded up to it.
    #[serde(default = "default_water_level")]
    pub water_level: i32,
    /// Upper bound on concurrently running mesh build tasks.
    #[serde(default = "default_worker_threads")]
    pub max_concurrent_mesh_tasks: usize,
    /// Number of background worker threads. Zero is allowed and leaves every
    /// task queued until it is drained synchronously (used by tests).
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Capacity of the cache holding column data of unloaded chunks, so
    /// player edits survive a chunk leaving the load radius.
    #[serde(default = "default_saved_chunk_capacity")]
    pub saved_chunk_capacity: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        WorldSettings {
            chunk_size: default_chunk_size(),
            chunk_height: default_chunk_height(),
            block_size: default_block_size(),
            block_scale: default_block_scale(),
            draw_distance: default_draw_distance(),
            seed: default_seed(),
            water_level: default_water_level(),
            max_concurrent_mesh_tasks: default_worker_threads(),
            worker_threads: default_worker_threads(),
            saved_chunk_capacity: default_saved_chunk_capacity(),
        }
    }
}

impl WorldSettings {
    /// Loads settings from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    /// Parses settings from JSON text. Missing fields fall back to defaults.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Chunks are loaded one ring beyond the draw distance so border meshes
    /// have neighbor data available.
    pub fn load_distance(&self) -> i32 {
        self.draw_distance + 1
    }

    /// Size of one block in engine units after scaling.
    pub fn scaled_block_size(&self) -> f32 {
        self.block_size * self.block_scale
    }

    /// Number of columns in one chunk.
    pub fn columns_per_chunk(&self) -> usize {
        (self.chunk_size * self.chunk_size) as usize
    }

    /// Index of the column holding local block (x, y), or `None` when out of
    /// bounds.
    pub fn column_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= self.chunk_size || y < 0 || y >= self.chunk_size {
            return None;
        }
        Some((x + y * self.chunk_size) as usize)
    }

    /// Whether a local block position lies inside a chunk.
    pub fn is_within_chunk_bounds(&self, position: Point3<i32>) -> bool {
        position.x >= 0
            && position.x < self.chunk_size
            && position.y >= 0
            && position.y < self.chunk_size
            && self.is_within_vertical_bounds(position)
    }

    /// Whether a local block position lies inside the column height.
    pub fn is_within_vertical_bounds(&self, position: Point3<i32>) -> bool {
        position.z >= 0 && position.z < self.chunk_height
    }

    /// Maps a world block position to the local position inside its chunk.
    ///
    /// Uses euclidean remainders so negative world coordinates wrap into
    /// `[0, chunk_size)` instead of mirroring around zero.
    pub fn local_block_position(&self, world_block: Point3<i32>) -> Point3<i32> {
        let s = self.chunk_size;
        let h = self.chunk_height;
        Point3::new(
            (world_block.x % s + s) % s,
            (world_block.y % s + s) % s,
            (world_block.z % h + h) % h,
        )
    }

    /// Maps a continuous world position to the integer block containing it.
    pub fn world_block_position(&self, world: Point3<f32>) -> Point3<i32> {
        let scaled = self.scaled_block_size();
        if scaled.abs() < f32::EPSILON {
            return Point3::new(0, 0, 0);
        }
        Point3::new(
            (world.x / scaled).floor() as i32,
            (world.y / scaled).floor() as i32,
            (world.z / scaled).floor() as i32,
        )
    }

    /// Maps a world block position to the chunk containing it, with floor
    /// semantics for negative coordinates.
    pub fn chunk_containing_block(&self, world_block: Point3<i32>) -> Point2<i32> {
        Point2::new(
            (world_block.x as f32 / self.chunk_size as f32).floor() as i32,
            (world_block.y as f32 / self.chunk_size as f32).floor() as i32,
        )
    }

    /// Maps a continuous world position directly to its chunk.
    pub fn chunk_position_at(&self, world: Point3<f32>) -> Point2<i32> {
        self.chunk_containing_block(self.world_block_position(world))
    }

    /// The world-space origin of a chunk (its minimum corner at z = 0).
    pub fn chunk_origin(&self, chunk: Point2<i32>) -> Point3<f32> {
        let span = self.chunk_size as f32 * self.scaled_block_size();
        Point3::new(chunk.x as f32 * span, chunk.y as f32 * span, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_generation_constants() {
        let settings = WorldSettings::default();
        assert_eq!(settings.chunk_size, 16);
        assert_eq!(settings.chunk_height, 128);
        assert_eq!(settings.water_level, 55);
        assert_eq!(settings.load_distance(), settings.draw_distance + 1);
        assert_eq!(settings.scaled_block_size(), 25.0);
    }

    #[test]
    fn json_overrides_defaults() {
        let settings =
            WorldSettings::from_json_str(r#"{ "chunk_size": 32, "seed": 7 }"#).unwrap();
        assert_eq!(settings.chunk_size, 32);
        assert_eq!(settings.seed, 7);
        // Untouched fields keep their defaults.
        assert_eq!(settings.chunk_height, 128);
    }

    #[test]
    fn negative_world_blocks_wrap_into_chunk() {
        let settings = WorldSettings::default();
        let local = settings.local_block_position(Point3::new(-1, -17, 5));
        assert_eq!(local, Point3::new(15, 15, 5));
    }

    #[test]
    fn chunk_mapping_floors_negative_coordinates() {
        let settings = WorldSettings::default();
        assert_eq!(
            settings.chunk_containing_block(Point3::new(-1, 0, 0)),
            Point2::new(-1, 0)
        );
        assert_eq!(
            settings.chunk_containing_block(Point3::new(15, 16, 0)),
            Point2::new(0, 1)
        );
    }

    #[test]
    fn world_position_round_trip() {
        let settings = WorldSettings::default();
        let scaled = settings.scaled_block_size();
        let world = Point3::new(-0.5 * scaled, 17.25 * scaled, 3.0 * scaled);
        let block = settings.world_block_position(world);
        assert_eq!(block, Point3::new(-1, 17, 3));
        assert_eq!(settings.chunk_position_at(world), Point2::new(-1, 1));
    }
}
