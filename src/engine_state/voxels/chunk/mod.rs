//! # Chunk Module
//!
//! A chunk is a `size × size` grid of columns, `chunk_height` blocks tall.
//! Chunks own their column data and maintain a solid-bit mask alongside it so
//! the meshers get O(1) occupancy checks without consulting the block
//! registry per lookup.
//!
//! ## Storage
//!
//! Column-major storage (`x + y * size`) matches the generator, which
//! produces whole columns at a time. The solid mask is a flat bit vector in
//! `x + size * y + size² * z` order; it is kept in sync by every block
//! mutation.
//!
//! Chunks do not know about their neighbors. Lookups that cross a chunk
//! border are resolved one level up, by the world (for edits) or by the
//! neighborhood view handed to the meshers.

use bitvec::prelude::BitVec;
use cgmath::{Point2, Point3};

use super::block::{BlockRegistry, BlockType};
use crate::engine_state::settings::WorldSettings;

pub mod column;

pub use column::{ChunkColumn, TerrainParameters};

/// The block dimensions of every chunk in a world, copied out of the settings
/// so chunks and meshers do not need the full settings struct.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkDims {
    /// Lateral size in blocks.
    pub size: i32,
    /// Vertical size in blocks.
    pub height: i32,
}

impl ChunkDims {
    /// Extracts the chunk dimensions from world settings.
    pub fn of(settings: &WorldSettings) -> Self {
        ChunkDims {
            size: settings.chunk_size,
            height: settings.chunk_height,
        }
    }

    /// Whether a local position is inside a chunk of these dimensions.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        position.x >= 0
            && position.x < self.size
            && position.y >= 0
            && position.y < self.size
            && position.z >= 0
            && position.z < self.height
    }

    /// Whether z is inside the column height.
    pub fn contains_z(&self, z: i32) -> bool {
        z >= 0 && z < self.height
    }

    /// Column index for local (x, y). Callers guarantee bounds.
    pub fn column_index(&self, x: i32, y: i32) -> usize {
        (x + y * self.size) as usize
    }

    fn mask_index(&self, position: Point3<i32>) -> usize {
        (position.x + self.size * position.y + self.size * self.size * position.z) as usize
    }
}

/// A `size × size` stack of columns at one position of the chunk grid.
pub struct Chunk {
    /// Position on the 2D chunk grid.
    pub position: Point2<i32>,
    /// Set once a mesh for the current block data has been stored.
    pub is_mesh_built: bool,
    /// Set while a mesh build task for this chunk is in flight. Block edits
    /// are refused during that window.
    pub is_mesh_queued: bool,
    columns: Vec<ChunkColumn>,
    solid_mask: BitVec,
    dims: ChunkDims,
}

impl Chunk {
    /// Builds a chunk from generated (or restored) column data.
    ///
    /// # Panics
    /// Panics if the column count does not match `dims.size²`; that would
    /// mean the generator and the settings disagree about chunk size.
    pub fn from_columns(
        position: Point2<i32>,
        columns: Vec<ChunkColumn>,
        dims: ChunkDims,
        registry: &BlockRegistry,
    ) -> Self {
        assert_eq!(columns.len(), (dims.size * dims.size) as usize);

        let mut solid_mask = BitVec::repeat(false, (dims.size * dims.size * dims.height) as usize);
        for y in 0..dims.size {
            for x in 0..dims.size {
                let column = &columns[dims.column_index(x, y)];
                for z in 0..dims.height {
                    if registry.is_solid(column.block_at(z)) {
                        let index = dims.mask_index(Point3::new(x, y, z));
                        solid_mask.set(index, true);
                    }
                }
            }
        }

        Chunk {
            position,
            is_mesh_built: false,
            is_mesh_queued: false,
            columns,
            solid_mask,
            dims,
        }
    }

    /// The dimensions this chunk was built with.
    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Block at a local position. Out-of-bounds positions read as air; the
    /// world resolves lateral overflow into neighboring chunks before calling
    /// this.
    pub fn block_at(&self, position: Point3<i32>) -> BlockType {
        if !self.dims.contains(position) {
            return BlockType::Air;
        }
        self.columns[self.dims.column_index(position.x, position.y)].block_at(position.z)
    }

    /// O(1) occupancy check against the solid mask. Out of bounds is not
    /// solid.
    pub fn is_block_solid(&self, position: Point3<i32>) -> bool {
        if !self.dims.contains(position) {
            return false;
        }
        self.solid_mask[self.dims.mask_index(position)]
    }

    /// Writes a block at a local position, updating the solid mask and
    /// invalidating the mesh. Returns false when out of bounds.
    pub fn set_block(
        &mut self,
        position: Point3<i32>,
        block: BlockType,
        registry: &BlockRegistry,
    ) -> bool {
        if !self.dims.contains(position) {
            return false;
        }
        let column = &mut self.columns[self.dims.column_index(position.x, position.y)];
        column.blocks[position.z as usize] = block;
        let index = self.dims.mask_index(position);
        self.solid_mask.set(index, registry.is_solid(block));
        self.is_mesh_built = false;
        true
    }

    /// Read access to the column data.
    pub fn columns(&self) -> &[ChunkColumn] {
        &self.columns
    }

    /// Copies the column data out, for saving when the chunk is unloaded.
    pub fn clone_columns(&self) -> Vec<ChunkColumn> {
        self.columns.clone()
    }
}
