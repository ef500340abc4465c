//! # Raycast Module
//!
//! Grid traversal for block picking. Steps a ray through the world block
//! grid (Amanatides & Woo style) and reports the first solid block hit
//! together with the face the ray entered through. This is how the demo
//! driver aims block edits the way a player camera would.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::engine_state::settings::WorldSettings;
use crate::engine_state::voxels::block::BlockType;
use crate::engine_state::voxels::world::World;

/// A solid block hit by a ray.
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastHit {
    /// The world block position of the hit block.
    pub block_position: Point3<i32>,
    /// The block that was hit.
    pub block: BlockType,
    /// Outward normal of the face the ray entered through, or `None` when
    /// the ray started inside the block.
    pub face_normal: Option<Vector3<i32>>,
}

/// Casts a ray from `origin` along `direction` and returns the first solid
/// block within `max_distance` (both in engine units). Solidity is answered
/// from the chunk solid masks, so the walk never touches column data until
/// it reports the hit.
pub fn raycast(
    world: &World,
    settings: &WorldSettings,
    origin: Point3<f32>,
    direction: Vector3<f32>,
    max_distance: f32,
) -> Option<RaycastHit> {
    if direction.magnitude2() <= f32::EPSILON {
        return None;
    }
    let direction = direction.normalize();
    let scaled = settings.scaled_block_size();
    if scaled <= f32::EPSILON {
        return None;
    }

    // Work in block-grid units from here on.
    let start = Point3::new(origin.x / scaled, origin.y / scaled, origin.z / scaled);
    let max_t = max_distance / scaled;

    let mut block = Point3::new(
        start.x.floor() as i32,
        start.y.floor() as i32,
        start.z.floor() as i32,
    );

    if world.is_solid_at(block) {
        return Some(RaycastHit {
            block_position: block,
            block: world.block_at_world(block),
            face_normal: None,
        });
    }

    let step = Vector3::new(
        direction.x.signum() as i32,
        direction.y.signum() as i32,
        direction.z.signum() as i32,
    );

    let t_for_axis = |start: f32, dir: f32, cell: i32| -> (f32, f32) {
        if dir.abs() <= f32::EPSILON {
            return (f32::INFINITY, f32::INFINITY);
        }
        let boundary = if dir > 0.0 {
            cell as f32 + 1.0
        } else {
            cell as f32
        };
        ((boundary - start) / dir, 1.0 / dir.abs())
    };

    let (mut t_max_x, t_delta_x) = t_for_axis(start.x, direction.x, block.x);
    let (mut t_max_y, t_delta_y) = t_for_axis(start.y, direction.y, block.y);
    let (mut t_max_z, t_delta_z) = t_for_axis(start.z, direction.z, block.z);

    loop {
        let face_normal;
        if t_max_x <= t_max_y && t_max_x <= t_max_z {
            if t_max_x > max_t {
                return None;
            }
            block.x += step.x;
            t_max_x += t_delta_x;
            face_normal = Vector3::new(-step.x, 0, 0);
        } else if t_max_y <= t_max_z {
            if t_max_y > max_t {
                return None;
            }
            block.y += step.y;
            t_max_y += t_delta_y;
            face_normal = Vector3::new(0, -step.y, 0);
        } else {
            if t_max_z > max_t {
                return None;
            }
            block.z += step.z;
            t_max_z += t_delta_z;
            face_normal = Vector3::new(0, 0, -step.z);
        }

        if world.is_solid_at(block) {
            return Some(RaycastHit {
                block_position: block,
                block: world.block_at_world(block),
                face_normal: Some(face_normal),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::BlockRegistry;
    use crate::engine_state::voxels::chunk::ChunkColumn;
    use cgmath::Point2;
    use std::sync::Arc;

    fn setup() -> (World, Arc<WorldSettings>) {
        let mut settings = WorldSettings::default();
        settings.chunk_size = 4;
        settings.chunk_height = 16;
        let settings = Arc::new(settings);
        let registry = Arc::new(BlockRegistry::with_defaults());
        let mut world = World::new(settings.clone(), registry);

        for cx in -1..=1 {
            for cy in -1..=1 {
                let mut columns = Vec::new();
                for y in 0..settings.chunk_size {
                    for x in 0..settings.chunk_size {
                        let mut column = ChunkColumn::new(settings.chunk_height, x, y);
                        for z in 0..=5 {
                            column.blocks[z as usize] = BlockType::Stone;
                        }
                        column.height = 5;
                        columns.push(column);
                    }
                }
                world.insert_chunk_from_columns(Point2::new(cx, cy), columns);
            }
        }

        (world, settings)
    }

    #[test]
    fn straight_down_hits_the_surface() {
        let (world, settings) = setup();
        let scaled = settings.scaled_block_size();
        let origin = Point3::new(1.5 * scaled, 1.5 * scaled, 10.0 * scaled);

        let hit = raycast(
            &world,
            &settings,
            origin,
            Vector3::new(0.0, 0.0, -1.0),
            20.0 * scaled,
        )
        .expect("surface below");

        assert_eq!(hit.block_position, Point3::new(1, 1, 5));
        assert_eq!(hit.block, BlockType::Stone);
        assert_eq!(hit.face_normal, Some(Vector3::new(0, 0, 1)));
    }

    #[test]
    fn range_limits_the_cast() {
        let (world, settings) = setup();
        let scaled = settings.scaled_block_size();
        let origin = Point3::new(1.5 * scaled, 1.5 * scaled, 10.0 * scaled);

        assert!(raycast(
            &world,
            &settings,
            origin,
            Vector3::new(0.0, 0.0, -1.0),
            2.0 * scaled,
        )
        .is_none());
    }

    #[test]
    fn starting_inside_a_block_reports_no_entry_face() {
        let (world, settings) = setup();
        let scaled = settings.scaled_block_size();
        let origin = Point3::new(0.5 * scaled, 0.5 * scaled, 2.5 * scaled);

        let hit = raycast(
            &world,
            &settings,
            origin,
            Vector3::new(1.0, 0.0, 0.0),
            10.0 * scaled,
        )
        .expect("inside stone");
        assert_eq!(hit.face_normal, None);
        assert_eq!(hit.block_position, Point3::new(0, 0, 2));
    }

    #[test]
    fn lateral_casts_cross_chunk_borders() {
        let (world, settings) = setup();
        let scaled = settings.scaled_block_size();
        // Start west of the loaded world (unloaded chunks read as air) at
        // rock level and aim east; the first solid block is the westernmost
        // column of chunk (-1, 0).
        let origin = Point3::new(-6.5 * scaled, 1.5 * scaled, 4.5 * scaled);

        let hit = raycast(
            &world,
            &settings,
            origin,
            Vector3::new(1.0, 0.0, 0.0),
            20.0 * scaled,
        )
        .expect("rock to the east");
        assert_eq!(hit.block_position, Point3::new(-4, 1, 4));
        assert_eq!(hit.face_normal, Some(Vector3::new(-1, 0, 0)));
    }

    #[test]
    fn water_is_not_a_raycast_target() {
        let (world, settings) = setup();
        let scaled = settings.scaled_block_size();
        world.spawn_block(Point2::new(0, 0), Point3::new(1, 1, 6), BlockType::Water);

        let hit = raycast(
            &world,
            &settings,
            Point3::new(1.5 * scaled, 1.5 * scaled, 10.0 * scaled),
            Vector3::new(0.0, 0.0, -1.0),
            20.0 * scaled,
        )
        .expect("stone under the water");
        // The ray passes through the water and hits the stone below it.
        assert_eq!(hit.block_position, Point3::new(1, 1, 5));
    }
}
