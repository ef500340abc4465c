//! # World Module
//!
//! The sparse chunk map and the block edit entry points.
//!
//! ## Storage
//!
//! Loaded chunks live in a hash map keyed by chunk position, each behind an
//! [`MtResource`] so mesh tasks can read them from worker threads while the
//! main thread streams and edits. Columns of unloaded chunks are parked in
//! an LRU cache so player edits survive a chunk leaving the load radius and
//! reappear when it is reloaded.
//!
//! ## Edits
//!
//! `spawn_block` and `destroy_block` implement the interaction rules:
//! spawning only fills air or water, destroying floods the hole with water
//! when a lateral or upper neighbor is water, and destructive edits on a
//! chunk edge also dirty the touched neighbor chunks so their border faces
//! rebuild. Both return the set of chunk positions whose meshes went stale.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use cgmath::{Point2, Point3, Vector3};
use log::warn;
use lru::LruCache;

use crate::core::MtResource;
use crate::engine_state::settings::WorldSettings;
use crate::engine_state::voxels::block::{BlockRegistry, BlockType};
use crate::engine_state::voxels::chunk::{Chunk, ChunkColumn, ChunkDims};

/// The loaded world: chunks, plus saved columns of unloaded chunks.
pub struct World {
    settings: Arc<WorldSettings>,
    registry: Arc<BlockRegistry>,
    chunks: HashMap<Point2<i32>, MtResource<Chunk>>,
    saved_columns: LruCache<Point2<i32>, Vec<ChunkColumn>>,
}

impl World {
    /// Creates an empty world.
    pub fn new(settings: Arc<WorldSettings>, registry: Arc<BlockRegistry>) -> Self {
        let capacity = NonZeroUsize::new(settings.saved_chunk_capacity.max(1))
            .expect("capacity is at least 1");
        World {
            settings,
            registry,
            chunks: HashMap::new(),
            saved_columns: LruCache::new(capacity),
        }
    }

    /// The chunk at a grid position, if loaded.
    pub fn chunk_at(&self, position: Point2<i32>) -> Option<MtResource<Chunk>> {
        self.chunks.get(&position).cloned()
    }

    /// Whether a chunk is loaded.
    pub fn contains(&self, position: Point2<i32>) -> bool {
        self.chunks.contains_key(&position)
    }

    /// Number of loaded chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Positions of all loaded chunks.
    pub fn chunk_positions(&self) -> Vec<Point2<i32>> {
        self.chunks.keys().copied().collect()
    }

    /// Builds and inserts a chunk from generated columns. Existing chunks at
    /// the position are left untouched.
    pub fn insert_chunk_from_columns(&mut self, position: Point2<i32>, columns: Vec<ChunkColumn>) {
        if self.chunks.contains_key(&position) {
            return;
        }
        let dims = ChunkDims::of(&self.settings);
        let chunk = Chunk::from_columns(position, columns, dims, &self.registry);
        self.chunks.insert(position, MtResource::new(chunk));
    }

    /// Restores a chunk from its saved columns, if any. Returns whether a
    /// chunk was restored.
    pub fn try_restore_saved(&mut self, position: Point2<i32>) -> bool {
        if self.chunks.contains_key(&position) {
            return false;
        }
        match self.saved_columns.pop(&position) {
            Some(columns) => {
                self.insert_chunk_from_columns(position, columns);
                true
            }
            None => false,
        }
    }

    /// Unloads a chunk, saving its columns for a later reload.
    pub fn unload_chunk(&mut self, position: Point2<i32>) {
        if let Some(chunk) = self.chunks.remove(&position) {
            self.saved_columns.put(position, chunk.get().clone_columns());
        }
    }

    /// Drops every chunk and all saved columns. Used by world regeneration.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.saved_columns.clear();
    }

    /// Handles to the four lateral neighbors of a chunk, in `[-x, +x, -y,
    /// +y]` order, for building a mesher view.
    pub fn neighbor_handles(&self, position: Point2<i32>) -> [Option<MtResource<Chunk>>; 4] {
        [
            self.chunk_at(Point2::new(position.x - 1, position.y)),
            self.chunk_at(Point2::new(position.x + 1, position.y)),
            self.chunk_at(Point2::new(position.x, position.y - 1)),
            self.chunk_at(Point2::new(position.x, position.y + 1)),
        ]
    }

    /// Block at a world block position. Unloaded chunks read as air.
    pub fn block_at_world(&self, world_block: Point3<i32>) -> BlockType {
        if !self.settings.is_within_vertical_bounds(world_block) {
            return BlockType::Air;
        }
        let chunk_position = self.settings.chunk_containing_block(world_block);
        let local = self.settings.local_block_position(world_block);
        match self.chunks.get(&chunk_position) {
            Some(chunk) => chunk.get().block_at(local),
            None => BlockType::Air,
        }
    }

    /// Occupancy check at a world block position, answered from the chunk
    /// solid masks. Unloaded chunks and out-of-range heights are not solid.
    pub fn is_solid_at(&self, world_block: Point3<i32>) -> bool {
        if !self.settings.is_within_vertical_bounds(world_block) {
            return false;
        }
        let chunk_position = self.settings.chunk_containing_block(world_block);
        let local = self.settings.local_block_position(world_block);
        match self.chunks.get(&chunk_position) {
            Some(chunk) => chunk.get().is_block_solid(local),
            None => false,
        }
    }

    /// Block at a chunk-local position that may overflow laterally into a
    /// neighbor chunk.
    fn block_at_relative(&self, chunk_position: Point2<i32>, local: Point3<i32>) -> BlockType {
        if !self.settings.is_within_vertical_bounds(local) {
            return BlockType::Air;
        }
        match self.adjust_for_adjacent_chunk(chunk_position, local) {
            Some((adjacent_position, adjacent_local)) => {
                match self.chunks.get(&adjacent_position) {
                    Some(chunk) => chunk.get().block_at(adjacent_local),
                    None => BlockType::Air,
                }
            }
            None => BlockType::Air,
        }
    }

    /// Normalizes a possibly-overflowing local position to (chunk, local).
    /// Returns `None` only for vertical overflow.
    fn adjust_for_adjacent_chunk(
        &self,
        chunk_position: Point2<i32>,
        local: Point3<i32>,
    ) -> Option<(Point2<i32>, Point3<i32>)> {
        if !self.settings.is_within_vertical_bounds(local) {
            return None;
        }
        let size = self.settings.chunk_size;
        let mut adjacent_position = chunk_position;
        let mut adjacent_local = local;

        if local.x < 0 {
            adjacent_position.x -= 1;
            adjacent_local.x += size;
        } else if local.x >= size {
            adjacent_position.x += 1;
            adjacent_local.x -= size;
        }
        if local.y < 0 {
            adjacent_position.y -= 1;
            adjacent_local.y += size;
        } else if local.y >= size {
            adjacent_position.y += 1;
            adjacent_local.y -= size;
        }

        Some((adjacent_position, adjacent_local))
    }

    /// Lateral offsets toward neighbor chunks touched by an edit at a chunk
    /// edge.
    fn edge_offsets(&self, local: Point3<i32>) -> Vec<Vector3<i32>> {
        let size = self.settings.chunk_size;
        let mut offsets = Vec::new();
        if local.x == 0 {
            offsets.push(Vector3::new(-1, 0, 0));
        } else if local.x == size - 1 {
            offsets.push(Vector3::new(1, 0, 0));
        }
        if local.y == 0 {
            offsets.push(Vector3::new(0, -1, 0));
        } else if local.y == size - 1 {
            offsets.push(Vector3::new(0, 1, 0));
        }
        offsets
    }

    /// Places a block at a chunk-local position (which may overflow into a
    /// neighbor). Only air and water can be replaced. Returns the chunk
    /// positions whose meshes must rebuild.
    pub fn spawn_block(
        &self,
        chunk_position: Point2<i32>,
        local: Point3<i32>,
        block: BlockType,
    ) -> Vec<Point2<i32>> {
        let mut affected = Vec::new();

        let Some(chunk) = self.chunks.get(&chunk_position) else {
            return affected;
        };
        if chunk.get().is_mesh_queued {
            // A mesh build is reading this chunk right now; drop the edit
            // rather than tear the mesh out from under it.
            warn!("dropping block edit at {:?}: mesh build in flight", chunk_position);
            return affected;
        }

        let current = self.block_at_relative(chunk_position, local);
        if current != BlockType::Air && current != BlockType::Water {
            return affected;
        }

        self.set_block_routed(chunk_position, local, block, &mut affected);
        affected
    }

    /// Destroys the block at a chunk-local position. The hole floods with
    /// water when any lateral or upper neighbor is water. Returns the chunk
    /// positions whose meshes must rebuild.
    pub fn destroy_block(&self, chunk_position: Point2<i32>, local: Point3<i32>) -> Vec<Point2<i32>> {
        let mut affected = Vec::new();

        let Some(chunk) = self.chunks.get(&chunk_position) else {
            return affected;
        };
        if chunk.get().is_mesh_queued {
            warn!("dropping block edit at {:?}: mesh build in flight", chunk_position);
            return affected;
        }
        if !self.settings.is_within_chunk_bounds(local) {
            return affected;
        }

        let flood_offsets = [
            Vector3::new(0, 0, 1),
            Vector3::new(1, 0, 0),
            Vector3::new(-1, 0, 0),
            Vector3::new(0, 1, 0),
            Vector3::new(0, -1, 0),
        ];
        let replacement = if flood_offsets
            .iter()
            .any(|offset| self.block_at_relative(chunk_position, local + *offset) == BlockType::Water)
        {
            BlockType::Water
        } else {
            BlockType::Air
        };

        self.set_block_routed(chunk_position, local, replacement, &mut affected);
        affected
    }

    /// Writes a block, routing positions that overflow the chunk into the
    /// adjacent chunk's spawn path, and collecting every chunk whose mesh
    /// the edit invalidated.
    fn set_block_routed(
        &self,
        chunk_position: Point2<i32>,
        local: Point3<i32>,
        block: BlockType,
        affected: &mut Vec<Point2<i32>>,
    ) {
        if self.settings.is_within_chunk_bounds(local) {
            let Some(chunk) = self.chunks.get(&chunk_position) else {
                return;
            };
            chunk.get_mut().set_block(local, block, &self.registry);
            affected.push(chunk_position);

            // Destructive edits on a chunk edge expose faces of the
            // neighboring chunk, so its mesh has to rebuild too. Additive
            // edits only ever cover neighbor faces, which is visually
            // harmless until the neighbor rebuilds anyway.
            if block == BlockType::Air || block == BlockType::Water {
                for offset in self.edge_offsets(local) {
                    let neighbor_position =
                        Point2::new(chunk_position.x + offset.x, chunk_position.y + offset.y);
                    if let Some(neighbor) = self.chunks.get(&neighbor_position) {
                        neighbor.get_mut().is_mesh_built = false;
                        affected.push(neighbor_position);
                    }
                }
            }
        } else if let Some((adjacent_position, adjacent_local)) =
            self.adjust_for_adjacent_chunk(chunk_position, local)
        {
            affected.extend(self.spawn_block(adjacent_position, adjacent_local, block));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> Arc<WorldSettings> {
        let mut settings = WorldSettings::default();
        settings.chunk_size = 4;
        settings.chunk_height = 16;
        settings.water_level = 5;
        Arc::new(settings)
    }

    fn flat_columns(settings: &WorldSettings, surface: i32) -> Vec<ChunkColumn> {
        let mut columns = Vec::new();
        for y in 0..settings.chunk_size {
            for x in 0..settings.chunk_size {
                let mut column = ChunkColumn::new(settings.chunk_height, x, y);
                for z in 0..=surface {
                    column.blocks[z as usize] = BlockType::Stone;
                }
                column.height = surface;
                columns.push(column);
            }
        }
        columns
    }

    fn world_with_chunks(positions: &[Point2<i32>]) -> (World, Arc<WorldSettings>) {
        let settings = small_settings();
        let registry = Arc::new(BlockRegistry::with_defaults());
        let mut world = World::new(settings.clone(), registry);
        for position in positions {
            let columns = flat_columns(&settings, 7);
            world.insert_chunk_from_columns(*position, columns);
        }
        (world, settings)
    }

    #[test]
    fn world_lookup_spans_chunks_and_negative_coords() {
        let (world, _) = world_with_chunks(&[Point2::new(0, 0), Point2::new(-1, 0)]);
        assert_eq!(
            world.block_at_world(Point3::new(0, 0, 7)),
            BlockType::Stone
        );
        assert_eq!(world.block_at_world(Point3::new(-1, 0, 7)), BlockType::Stone);
        assert_eq!(world.block_at_world(Point3::new(0, 0, 8)), BlockType::Air);
        // Unloaded chunk reads as air.
        assert_eq!(world.block_at_world(Point3::new(40, 0, 7)), BlockType::Air);
    }

    #[test]
    fn spawn_only_fills_air_or_water() {
        let (world, _) = world_with_chunks(&[Point2::new(0, 0)]);
        let origin = Point2::new(0, 0);

        // Into stone: refused.
        assert!(world.spawn_block(origin, Point3::new(1, 1, 3), BlockType::Dirt).is_empty());
        // Into air above the surface: accepted.
        let affected = world.spawn_block(origin, Point3::new(1, 1, 8), BlockType::Dirt);
        assert_eq!(affected, vec![origin]);
        assert_eq!(world.block_at_world(Point3::new(1, 1, 8)), BlockType::Dirt);
    }

    #[test]
    fn spawn_routes_across_chunk_borders() {
        let (world, _) = world_with_chunks(&[Point2::new(0, 0), Point2::new(1, 0)]);
        // Local x == 4 overflows into chunk (1, 0) at x == 0.
        let affected = world.spawn_block(Point2::new(0, 0), Point3::new(4, 2, 9), BlockType::Sand);
        assert_eq!(affected, vec![Point2::new(1, 0)]);
        assert_eq!(world.block_at_world(Point3::new(4, 2, 9)), BlockType::Sand);
    }

    #[test]
    fn destroy_floods_from_adjacent_water() {
        let (world, _) = world_with_chunks(&[Point2::new(0, 0)]);
        let origin = Point2::new(0, 0);
        // Put water next to the block we are about to break.
        world.spawn_block(origin, Point3::new(2, 1, 8), BlockType::Water);

        let affected = world.destroy_block(origin, Point3::new(1, 1, 8));
        assert_eq!(affected, vec![origin]);
        // Nothing to destroy there (it was air), so it became water via the
        // flood rule.
        assert_eq!(world.block_at_world(Point3::new(1, 1, 8)), BlockType::Water);

        // Breaking deep stone with no water nearby leaves air.
        world.destroy_block(origin, Point3::new(1, 1, 2));
        assert_eq!(world.block_at_world(Point3::new(1, 1, 2)), BlockType::Air);
    }

    #[test]
    fn edge_destroy_dirties_the_neighbor_chunk() {
        let (world, _) = world_with_chunks(&[Point2::new(0, 0), Point2::new(1, 0)]);
        let neighbor = world.chunk_at(Point2::new(1, 0)).unwrap();
        neighbor.get_mut().is_mesh_built = true;

        let affected = world.destroy_block(Point2::new(0, 0), Point3::new(3, 1, 4));
        assert!(affected.contains(&Point2::new(0, 0)));
        assert!(affected.contains(&Point2::new(1, 0)));
        assert!(!neighbor.get().is_mesh_built);
    }

    #[test]
    fn unload_and_restore_round_trips_edits() {
        let (mut world, _) = world_with_chunks(&[Point2::new(0, 0)]);
        let origin = Point2::new(0, 0);
        world.spawn_block(origin, Point3::new(2, 2, 9), BlockType::OakLog);

        world.unload_chunk(origin);
        assert!(!world.contains(origin));
        assert_eq!(world.block_at_world(Point3::new(2, 2, 9)), BlockType::Air);

        assert!(world.try_restore_saved(origin));
        assert_eq!(world.block_at_world(Point3::new(2, 2, 9)), BlockType::OakLog);
        // The save slot is consumed.
        assert!(!world.try_restore_saved(origin));
    }

    #[test]
    fn edits_are_refused_while_a_mesh_build_is_in_flight() {
        let (world, _) = world_with_chunks(&[Point2::new(0, 0)]);
        let origin = Point2::new(0, 0);
        world.chunk_at(origin).unwrap().get_mut().is_mesh_queued = true;

        assert!(world.spawn_block(origin, Point3::new(1, 1, 9), BlockType::Dirt).is_empty());
        assert_eq!(world.block_at_world(Point3::new(1, 1, 9)), BlockType::Air);
    }
}
