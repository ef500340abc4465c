//! Per-face culled meshing.
//!
//! The straightforward mesher: every block emits the cube faces that touch a
//! see-through neighbor. Internal faces between two identical water blocks
//! are suppressed so the fluid surface reads as one body. Blocks with the
//! cross-planes render mode (plants) become two intersecting quads with a
//! deterministic per-block texture variant and optional random yaw.
//!
//! This mesher produces more geometry than the greedy one but preserves
//! per-face texture indices exactly, which the greedy mesher's merged quads
//! cannot.

use cgmath::Point3;

use crate::engine_state::voxels::block::{
    BlockRegistry, BlockSettings, BlockSide, BlockType, MaterialClass, RenderMode,
};

use super::{ChunkMeshBundle, ChunkView, MeshVertex};

/// Unit-cube corner positions, indexed by `BLOCK_TRIANGLES`.
const BLOCK_VERTICES: [[f32; 3]; 8] = [
    [1.0, 1.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0],
];

/// Corner indices of the four vertices of each face, in `BlockSide` order.
const BLOCK_TRIANGLES: [usize; 24] = [
    0, 1, 2, 3, // Forward
    5, 0, 3, 6, // Right
    4, 5, 6, 7, // Backward
    1, 4, 7, 2, // Left
    5, 4, 1, 0, // Up
    3, 2, 7, 6, // Down
];

const FACE_UVS: [[f32; 2]; 4] = [[1.0, 0.0], [0.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// Builds the culled mesh for the viewed chunk.
pub fn build_mesh(
    view: &ChunkView,
    registry: &BlockRegistry,
    scaled_block_size: f32,
    world_seed: i32,
) -> ChunkMeshBundle {
    let mut bundle = ChunkMeshBundle::default();
    let dims = view.dims();

    for x in 0..dims.size {
        for y in 0..dims.size {
            for z in 0..dims.height {
                let position = Point3::new(x, y, z);
                let block = view.center.block_at(position);
                if block == BlockType::Air {
                    continue;
                }
                let settings = registry.get(block);

                match settings.render_mode {
                    RenderMode::Cube => create_cube_faces(
                        &mut bundle,
                        view,
                        registry,
                        position,
                        block,
                        settings,
                        scaled_block_size,
                    ),
                    RenderMode::CrossPlanes => create_cross_planes(
                        &mut bundle,
                        position,
                        settings,
                        scaled_block_size,
                        world_seed,
                    ),
                }
            }
        }
    }

    bundle
}

fn create_cube_faces(
    bundle: &mut ChunkMeshBundle,
    view: &ChunkView,
    registry: &BlockRegistry,
    position: Point3<i32>,
    block: BlockType,
    settings: &BlockSettings,
    scaled_block_size: f32,
) {
    for side in BlockSide::all() {
        let neighbor_position = position + side.offset();
        let neighbor = view.block_at(neighbor_position);
        if !registry.is_face_visible_against(neighbor) {
            continue;
        }

        // Identical adjacent fluid blocks share no internal surface.
        if settings.material == MaterialClass::Water
            && neighbor == block
            && registry.get(neighbor).material == MaterialClass::Water
        {
            continue;
        }

        create_face(bundle, side, position, settings, scaled_block_size);
    }
}

fn create_face(
    bundle: &mut ChunkMeshBundle,
    side: BlockSide,
    position: Point3<i32>,
    settings: &BlockSettings,
    scaled_block_size: f32,
) {
    let section = bundle.section_mut(settings.material);
    let base = section.vertex_count;

    let normal = side.normal();
    let texture = settings.texture_for_normal(normal.z) as u8;
    let color = [0, 0, 0, texture];

    for i in 0..4 {
        let corner = BLOCK_VERTICES[BLOCK_TRIANGLES[side as usize * 4 + i]];
        section.vertices.push(MeshVertex {
            position: [
                (corner[0] + position.x as f32) * scaled_block_size,
                (corner[1] + position.y as f32) * scaled_block_size,
                (corner[2] + position.z as f32) * scaled_block_size,
            ],
            normal: [normal.x, normal.y, normal.z],
            uv: FACE_UVS[i],
            color,
        });
    }

    section
        .indices
        .extend_from_slice(&[base + 3, base + 2, base, base + 2, base + 1, base]);
    section.vertex_count += 4;
}

fn create_cross_planes(
    bundle: &mut ChunkMeshBundle,
    position: Point3<i32>,
    settings: &BlockSettings,
    scaled_block_size: f32,
    world_seed: i32,
) {
    let seed = world_seed
        ^ position.x.wrapping_mul(73856093)
        ^ position.y.wrapping_mul(19349663)
        ^ position.z.wrapping_mul(83492791);
    let mut rng = fastrand::Rng::with_seed(seed as u32 as u64);

    let variant = if settings.texture_variants > 1 {
        rng.u32(0..settings.texture_variants)
    } else {
        0
    } as u8;

    let origin = [
        (position.x as f32 + 0.5) * scaled_block_size,
        (position.y as f32 + 0.5) * scaled_block_size,
        position.z as f32 * scaled_block_size,
    ];
    let half_width = 0.5 * settings.render_scale * scaled_block_size;
    let height = settings.render_height * scaled_block_size;

    // Two vertical quads crossing at the block center, optionally yawed.
    let mut corners = [
        // Plane along X.
        [-half_width, 0.0, height],
        [half_width, 0.0, height],
        [half_width, 0.0, 0.0],
        [-half_width, 0.0, 0.0],
        // Plane along Y.
        [0.0, -half_width, height],
        [0.0, half_width, height],
        [0.0, half_width, 0.0],
        [0.0, -half_width, 0.0],
    ];

    if settings.random_rotation {
        let yaw = rng.f32() * std::f32::consts::TAU;
        let (sin, cos) = yaw.sin_cos();
        for corner in corners.iter_mut() {
            let (cx, cy) = (corner[0], corner[1]);
            corner[0] = cx * cos - cy * sin;
            corner[1] = cx * sin + cy * cos;
        }
    }

    let section = bundle.section_mut(settings.material);
    let base = section.vertex_count;
    let color = [0, 0, 0, variant];

    for (i, corner) in corners.iter().enumerate() {
        section.vertices.push(MeshVertex {
            position: [
                origin[0] + corner[0],
                origin[1] + corner[1],
                origin[2] + corner[2],
            ],
            normal: [0.0, 0.0, 1.0],
            uv: FACE_UVS[i % 4],
            color,
        });
    }

    for quad in 0..2 {
        let b = base + quad * 4;
        section
            .indices
            .extend_from_slice(&[b, b + 1, b + 2, b + 2, b + 3, b]);
    }
    section.vertex_count += 8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::{Chunk, ChunkColumn, ChunkDims};
    use cgmath::Point2;

    const SCALED: f32 = 25.0;

    fn dims() -> ChunkDims {
        ChunkDims { size: 4, height: 8 }
    }

    fn chunk_with_blocks(blocks: &[(Point3<i32>, BlockType)]) -> Chunk {
        let dims = dims();
        let registry = BlockRegistry::with_defaults();
        let mut columns: Vec<ChunkColumn> = (0..dims.size * dims.size)
            .map(|i| ChunkColumn::new(dims.height, i % dims.size, i / dims.size))
            .collect();
        for (position, block) in blocks {
            let index = dims.column_index(position.x, position.y);
            columns[index].blocks[position.z as usize] = *block;
        }
        Chunk::from_columns(Point2::new(0, 0), columns, dims, &registry)
    }

    #[test]
    fn lone_block_emits_six_faces() {
        let chunk = chunk_with_blocks(&[(Point3::new(2, 2, 3), BlockType::Stone)]);
        let registry = BlockRegistry::with_defaults();
        let view = ChunkView::new(&chunk, [None; 4]);

        let bundle = build_mesh(&view, &registry, SCALED, 0);
        assert_eq!(bundle.opaque.vertices.len(), 24);
        assert_eq!(bundle.opaque.indices.len(), 36);
        assert!(bundle.water.is_empty());
        assert!(bundle.masked.is_empty());
    }

    #[test]
    fn touching_blocks_cull_their_shared_faces() {
        let chunk = chunk_with_blocks(&[
            (Point3::new(1, 2, 3), BlockType::Stone),
            (Point3::new(2, 2, 3), BlockType::Stone),
        ]);
        let registry = BlockRegistry::with_defaults();
        let view = ChunkView::new(&chunk, [None; 4]);

        let bundle = build_mesh(&view, &registry, SCALED, 0);
        // 12 faces minus the 2 shared ones.
        assert_eq!(bundle.opaque.vertices.len(), 10 * 4);
    }

    #[test]
    fn water_blocks_merge_and_render_in_their_own_section() {
        let chunk = chunk_with_blocks(&[
            (Point3::new(1, 1, 1), BlockType::Water),
            (Point3::new(2, 1, 1), BlockType::Water),
        ]);
        let registry = BlockRegistry::with_defaults();
        let view = ChunkView::new(&chunk, [None; 4]);

        let bundle = build_mesh(&view, &registry, SCALED, 0);
        assert!(bundle.opaque.is_empty());
        // Two cubes, ten faces: the shared pair is suppressed.
        assert_eq!(bundle.water.vertices.len(), 10 * 4);
    }

    #[test]
    fn solid_neighbor_chunk_culls_border_faces() {
        let registry = BlockRegistry::with_defaults();
        let center = chunk_with_blocks(&[(Point3::new(3, 1, 1), BlockType::Stone)]);
        let east = {
            let dims = dims();
            let mut columns: Vec<ChunkColumn> = (0..dims.size * dims.size)
                .map(|i| ChunkColumn::new(dims.height, i % dims.size, i / dims.size))
                .collect();
            columns[dims.column_index(0, 1)].blocks[1] = BlockType::Stone;
            Chunk::from_columns(Point2::new(1, 0), columns, dims, &registry)
        };

        let without_neighbor = {
            let view = ChunkView::new(&center, [None; 4]);
            build_mesh(&view, &registry, SCALED, 0).opaque.vertices.len()
        };
        let with_neighbor = {
            let view = ChunkView::new(&center, [None, Some(&east), None, None]);
            build_mesh(&view, &registry, SCALED, 0).opaque.vertices.len()
        };
        assert_eq!(without_neighbor - with_neighbor, 4);
    }

    #[test]
    fn cross_plane_blocks_emit_two_quads_into_masked() {
        let chunk = chunk_with_blocks(&[(Point3::new(1, 1, 1), BlockType::TallGrass)]);
        let registry = BlockRegistry::with_defaults();
        let view = ChunkView::new(&chunk, [None; 4]);

        let bundle = build_mesh(&view, &registry, SCALED, 42);
        assert_eq!(bundle.masked.vertices.len(), 8);
        assert_eq!(bundle.masked.indices.len(), 12);

        // Variant selection is deterministic per seed and position.
        let again = build_mesh(&view, &registry, SCALED, 42);
        assert_eq!(
            bundle.masked.vertices[0].color,
            again.masked.vertices[0].color
        );
    }

    #[test]
    fn face_colors_carry_texture_indices() {
        let chunk = chunk_with_blocks(&[(Point3::new(2, 2, 3), BlockType::Grass)]);
        let registry = BlockRegistry::with_defaults();
        let view = ChunkView::new(&chunk, [None; 4]);

        let bundle = build_mesh(&view, &registry, SCALED, 0);
        let grass = registry.get(BlockType::Grass);
        for vertex in &bundle.opaque.vertices {
            let expected = grass.texture_for_normal(vertex.normal[2]) as u8;
            assert_eq!(vertex.color[3], expected);
        }
    }
}
