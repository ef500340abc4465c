//! Greedy meshing.
//!
//! Sweeps the chunk along each of the three axes. For every slice a mask of
//! `(block, face direction)` cells is built from the visibility rules, then
//! maximal same-cell rectangles are merged into single quads. Quad UVs span
//! the merged width and height so the host material can tile the block
//! texture.
//!
//! ## Visibility rules
//!
//! A face exists where a solid opaque block meets anything see-through, and
//! where see-through blocks of different types meet (water against leaves,
//! leaves against air). Identical adjacent transparent blocks produce no
//! face, which keeps fluid bodies unbroken.
//!
//! ## Chunk borders
//!
//! The sweep starts one slice below the chunk so faces on the low border are
//! never emitted by the chunk itself; the neighbor chunk emits them from its
//! high slice. High-border faces compare against the lateral neighbor chunks
//! through the [`ChunkView`], falling back to air where no neighbor is
//! loaded.

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::{BlockRegistry, BlockType};

use super::{ChunkMeshBundle, ChunkView, MeshVertex};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
struct MaskCell {
    block: BlockType,
    /// +1 for a face toward the sweep direction, -1 against it, 0 for none.
    normal: i8,
}

const EMPTY_CELL: MaskCell = MaskCell {
    block: BlockType::Air,
    normal: 0,
};

/// Builds the greedy mesh for the viewed chunk.
pub fn build_mesh(
    view: &ChunkView,
    registry: &BlockRegistry,
    scaled_block_size: f32,
) -> ChunkMeshBundle {
    let mut bundle = ChunkMeshBundle::default();
    let dims = view.dims();

    for axis in 0..3usize {
        let axis1 = (axis + 1) % 3;
        let axis2 = (axis + 2) % 3;

        // Slice extents along the two non-sweep axes and the sweep axis.
        let (size1, size2) = match axis {
            2 => (dims.size, dims.size),
            0 => (dims.size, dims.height),
            _ => (dims.height, dims.size),
        };
        let main_size = if axis == 2 { dims.height } else { dims.size };

        let mut axis_mask = Vector3::new(0, 0, 0);
        axis_mask[axis] = 1;

        let mut itr: Point3<i32> = Point3::new(0, 0, 0);
        let mut mask = vec![EMPTY_CELL; (size1 * size2) as usize];

        itr[axis] = -1;
        while itr[axis] < main_size {
            // Build the visibility mask for the boundary between this slice
            // and the next one.
            let mut n = 0usize;
            for j in 0..size2 {
                itr[axis2] = j;
                for i in 0..size1 {
                    itr[axis1] = i;
                    mask[n] = if itr[axis] == -1 {
                        EMPTY_CELL
                    } else {
                        compute_cell(view, registry, itr, axis_mask)
                    };
                    n += 1;
                }
            }

            itr[axis] += 1;

            // Merge mask cells into maximal quads.
            let mut n = 0usize;
            for j in 0..size2 {
                let mut i = 0;
                while i < size1 {
                    let cell = mask[n];
                    if cell.normal == 0 {
                        i += 1;
                        n += 1;
                        continue;
                    }

                    let mut width = 1;
                    while i + width < size1 && mask[n + width as usize] == cell {
                        width += 1;
                    }

                    let mut height = 1;
                    'grow: while j + height < size2 {
                        for k in 0..width {
                            if mask[n + k as usize + (height * size1) as usize] != cell {
                                break 'grow;
                            }
                        }
                        height += 1;
                    }

                    let mut quad_start = itr;
                    quad_start[axis1] = i;
                    quad_start[axis2] = j;

                    let mut delta1 = Vector3::new(0, 0, 0);
                    delta1[axis1] = width;
                    let mut delta2 = Vector3::new(0, 0, 0);
                    delta2[axis2] = height;

                    create_quad(
                        &mut bundle,
                        registry,
                        cell,
                        axis_mask,
                        width,
                        height,
                        [
                            quad_start,
                            quad_start + delta1,
                            quad_start + delta2,
                            quad_start + delta1 + delta2,
                        ],
                        scaled_block_size,
                    );

                    for l in 0..height {
                        for k in 0..width {
                            mask[n + k as usize + (l * size1) as usize] = EMPTY_CELL;
                        }
                    }

                    i += width;
                    n += width as usize;
                }
            }
        }
    }

    bundle
}

fn compute_cell(
    view: &ChunkView,
    registry: &BlockRegistry,
    position: Point3<i32>,
    axis_mask: Vector3<i32>,
) -> MaskCell {
    let current = view.block_at(position);
    let compare = view.block_at(position + axis_mask);

    let current_settings = registry.get(current);
    let compare_settings = registry.get(compare);

    let current_solid_opaque =
        current != BlockType::Air && current_settings.solid && !current_settings.transparent;
    let compare_solid_opaque =
        compare != BlockType::Air && compare_settings.solid && !compare_settings.transparent;

    if current_solid_opaque == compare_solid_opaque {
        if current_solid_opaque {
            // Two solid opaque blocks; the boundary is invisible.
            return EMPTY_CELL;
        }

        let current_air = current == BlockType::Air;
        let compare_air = compare == BlockType::Air;

        // Identical see-through blocks (water against water) share no face.
        if !current_air
            && current_settings.transparent
            && compare_settings.transparent
            && current == compare
        {
            return EMPTY_CELL;
        }
        if !current_air && compare_air {
            return MaskCell {
                block: current,
                normal: 1,
            };
        }
        if current_air && !compare_air {
            return MaskCell {
                block: compare,
                normal: -1,
            };
        }
        if !current_air && !compare_air {
            // Differing see-through blocks; prefer the near one.
            return MaskCell {
                block: current,
                normal: 1,
            };
        }
        EMPTY_CELL
    } else if current_solid_opaque {
        MaskCell {
            block: current,
            normal: 1,
        }
    } else {
        MaskCell {
            block: compare,
            normal: -1,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn create_quad(
    bundle: &mut ChunkMeshBundle,
    registry: &BlockRegistry,
    cell: MaskCell,
    axis_mask: Vector3<i32>,
    width: i32,
    height: i32,
    corners: [Point3<i32>; 4],
    scaled_block_size: f32,
) {
    let normal_i = axis_mask * cell.normal as i32;
    let normal = [normal_i.x as f32, normal_i.y as f32, normal_i.z as f32];

    let settings = registry.get(cell.block);
    let texture = settings.texture_for_normal(normal[2]) as u8;
    let color = [0, 0, 0, texture];

    // Tiling UVs spanning the merged quad; orientation flips for X-facing
    // quads so textures stay upright.
    let (w, h) = (width as f32, height as f32);
    let uvs: [[f32; 2]; 4] = if normal_i.x != 0 {
        [[w, h], [0.0, h], [w, 0.0], [0.0, 0.0]]
    } else {
        [[h, w], [h, 0.0], [0.0, w], [0.0, 0.0]]
    };

    let section = bundle.section_mut(settings.material);
    let base = section.vertex_count as i32;

    for (corner, uv) in corners.iter().zip(uvs.iter()) {
        section.vertices.push(MeshVertex {
            position: [
                corner.x as f32 * scaled_block_size,
                corner.y as f32 * scaled_block_size,
                corner.z as f32 * scaled_block_size,
            ],
            normal,
            uv: *uv,
            color,
        });
    }

    // Winding depends on which way the face points.
    let s = cell.normal as i32;
    let quad_indices = [base, base + 2 + s, base + 2 - s, base + 3, base + 1 - s, base + 1 + s];
    section
        .indices
        .extend(quad_indices.iter().map(|index| *index as u32));
    section.vertex_count += 4;
}
