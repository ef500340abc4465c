//! # Meshing Module
//!
//! Turns chunk block data into renderer-ready geometry. Two meshers are
//! provided with the same output shape:
//!
//! - [`culled`] walks every block and emits the faces adjacent to
//!   see-through blocks, including cross-plane geometry for plants
//! - [`greedy`] sweeps the three axes and merges coplanar same-block faces
//!   into maximal quads, trading per-face texture variety for far fewer
//!   vertices
//!
//! Both write into a [`ChunkMeshBundle`] with one section per material
//! class, so the host renderer can draw opaque, water and masked geometry
//! in separate passes. The texture index of every face rides in the alpha
//! channel of the vertex color.
//!
//! Meshers read blocks through a [`ChunkView`], which resolves lookups one
//! block beyond the chunk border into the lateral neighbor chunks. Faces on
//! a border against a missing neighbor are emitted as if against air and
//! rebuilt once the neighbor loads and forces a remesh.

use cgmath::Point3;

use crate::engine_state::voxels::block::{BlockType, MaterialClass};
use crate::engine_state::voxels::chunk::{Chunk, ChunkDims};

pub mod culled;
pub mod greedy;

/// Which mesher the engine builds chunk geometry with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MesherKind {
    /// Per-face culled meshing with full render-mode support.
    Culled,
    /// Greedy quad merging.
    #[default]
    Greedy,
}

/// One GPU-ready vertex. Matches the layout the host renderer uploads
/// verbatim, hence `Pod`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Position in engine units.
    pub position: [f32; 3],
    /// Face normal.
    pub normal: [f32; 3],
    /// Texture coordinates. Greedy quads use tiling UVs spanning the quad.
    pub uv: [f32; 2],
    /// RGBA color; alpha carries the texture (or variant) index.
    pub color: [u8; 4],
}

/// Geometry of one material section of a chunk.
#[derive(Debug, Default)]
pub struct ChunkMeshData {
    /// Vertex buffer.
    pub vertices: Vec<MeshVertex>,
    /// Index buffer into `vertices`.
    pub indices: Vec<u32>,
    /// Running vertex counter, used while building to base new primitives.
    pub vertex_count: u32,
}

impl ChunkMeshData {
    /// Whether this section has any geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// The complete mesh of one chunk, split by material class.
#[derive(Debug, Default)]
pub struct ChunkMeshBundle {
    /// Opaque geometry.
    pub opaque: ChunkMeshData,
    /// Translucent fluid geometry.
    pub water: ChunkMeshData,
    /// Alpha-masked geometry (leaves, plants).
    pub masked: ChunkMeshData,
}

impl ChunkMeshBundle {
    /// The section a material class writes into.
    pub fn section_mut(&mut self, material: MaterialClass) -> &mut ChunkMeshData {
        match material {
            MaterialClass::Opaque => &mut self.opaque,
            MaterialClass::Water => &mut self.water,
            MaterialClass::Masked => &mut self.masked,
        }
    }

    /// Total vertex count across sections.
    pub fn vertex_count(&self) -> usize {
        self.opaque.vertices.len() + self.water.vertices.len() + self.masked.vertices.len()
    }

    /// Total triangle count across sections.
    pub fn triangle_count(&self) -> usize {
        (self.opaque.indices.len() + self.water.indices.len() + self.masked.indices.len()) / 3
    }
}

/// Storage for finished chunk meshes, keyed by chunk position. This is the
/// renderer-facing output of the engine: the host uploads these buffers and
/// draws them.
#[derive(Default)]
pub struct MeshStore {
    meshes: std::collections::HashMap<cgmath::Point2<i32>, ChunkMeshBundle>,
}

impl MeshStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) the mesh of a chunk.
    pub fn insert(&mut self, position: cgmath::Point2<i32>, bundle: ChunkMeshBundle) {
        self.meshes.insert(position, bundle);
    }

    /// Drops the mesh of an unloaded chunk.
    pub fn remove(&mut self, position: cgmath::Point2<i32>) {
        self.meshes.remove(&position);
    }

    /// The mesh of a chunk, if built.
    pub fn get(&self, position: cgmath::Point2<i32>) -> Option<&ChunkMeshBundle> {
        self.meshes.get(&position)
    }

    /// Number of stored chunk meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether no meshes are stored.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Drops everything. Used by world regeneration.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    /// Total vertex count across all stored meshes.
    pub fn total_vertices(&self) -> usize {
        self.meshes.values().map(ChunkMeshBundle::vertex_count).sum()
    }

    /// Total triangle count across all stored meshes.
    pub fn total_triangles(&self) -> usize {
        self.meshes.values().map(ChunkMeshBundle::triangle_count).sum()
    }
}

/// A chunk plus its lateral neighbors, as visible to a mesher.
///
/// Neighbor order is `[-x, +x, -y, +y]`. Vertical overflow always reads as
/// air; lateral overflow of more than one chunk is not used by the meshers
/// and also reads as air.
pub struct ChunkView<'a> {
    /// The chunk being meshed.
    pub center: &'a Chunk,
    /// Lateral neighbors in `[-x, +x, -y, +y]` order.
    pub neighbors: [Option<&'a Chunk>; 4],
    dims: ChunkDims,
}

impl<'a> ChunkView<'a> {
    /// Builds a view over a chunk and its (possibly missing) neighbors.
    pub fn new(center: &'a Chunk, neighbors: [Option<&'a Chunk>; 4]) -> Self {
        let dims = center.dims();
        ChunkView {
            center,
            neighbors,
            dims,
        }
    }

    /// The dimensions of the viewed chunk.
    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Block lookup in center-local coordinates, following lateral overflow
    /// into the neighbor chunks.
    pub fn block_at(&self, position: Point3<i32>) -> BlockType {
        if !self.dims.contains_z(position.z) {
            return BlockType::Air;
        }
        if position.x >= 0
            && position.x < self.dims.size
            && position.y >= 0
            && position.y < self.dims.size
        {
            return self.center.block_at(position);
        }

        let mut local = position;
        let mut neighbor_index = None;
        if position.x < 0 {
            neighbor_index = Some(0);
            local.x += self.dims.size;
        } else if position.x >= self.dims.size {
            neighbor_index = Some(1);
            local.x -= self.dims.size;
        }
        if position.y < 0 {
            if neighbor_index.is_some() {
                return BlockType::Air;
            }
            neighbor_index = Some(2);
            local.y += self.dims.size;
        } else if position.y >= self.dims.size {
            if neighbor_index.is_some() {
                return BlockType::Air;
            }
            neighbor_index = Some(3);
            local.y -= self.dims.size;
        }

        match neighbor_index.and_then(|i| self.neighbors[i]) {
            Some(chunk) => chunk.block_at(local),
            None => BlockType::Air,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::BlockRegistry;
    use crate::engine_state::voxels::chunk::ChunkColumn;
    use cgmath::Point2;

    fn dims() -> ChunkDims {
        ChunkDims { size: 4, height: 8 }
    }

    fn solid_chunk(position: Point2<i32>, block: BlockType) -> Chunk {
        let dims = dims();
        let registry = BlockRegistry::with_defaults();
        let mut columns = Vec::new();
        for y in 0..dims.size {
            for x in 0..dims.size {
                let mut column = ChunkColumn::new(dims.height, x, y);
                for z in 0..dims.height {
                    column.blocks[z as usize] = block;
                }
                columns.push(column);
            }
        }
        Chunk::from_columns(position, columns, dims, &registry)
    }

    #[test]
    fn view_resolves_neighbor_lookups() {
        let center = solid_chunk(Point2::new(0, 0), BlockType::Stone);
        let east = solid_chunk(Point2::new(1, 0), BlockType::Sand);
        let view = ChunkView::new(&center, [None, Some(&east), None, None]);

        // In-bounds hits the center chunk.
        assert_eq!(view.block_at(Point3::new(1, 1, 1)), BlockType::Stone);
        // One step past +x lands in the east neighbor's x=0 column.
        assert_eq!(view.block_at(Point3::new(4, 1, 1)), BlockType::Sand);
        // Missing neighbor reads as air.
        assert_eq!(view.block_at(Point3::new(-1, 1, 1)), BlockType::Air);
        // Vertical overflow reads as air.
        assert_eq!(view.block_at(Point3::new(1, 1, 8)), BlockType::Air);
        assert_eq!(view.block_at(Point3::new(1, 1, -1)), BlockType::Air);
    }
}
