//! # Foliage Generator
//!
//! Places trees, cacti and surface grass on freshly generated chunk columns.
//! Placement is fully deterministic: every column derives its own random
//! stream from the world seed and its global coordinates, and each placed
//! plant derives an instance stream from the column stream and the plant
//! kind. Regenerating a chunk therefore reproduces the exact same forest.
//!
//! Foliage only ever fills air. Trees that would poke through the chunk
//! ceiling are truncated or skipped rather than clipped.

use cgmath::Point3;

use crate::engine_state::generation::biome::{BiomeSettings, FoliageKind};
use crate::engine_state::voxels::block::BlockType;
use crate::engine_state::voxels::chunk::{ChunkColumn, ChunkDims};

/// Stateless foliage placement routines.
pub struct FoliageGenerator;

impl FoliageGenerator {
    /// Tries the biome's foliage rules for one column, then surface grass if
    /// no larger plant was placed. Returns whether a major plant spawned.
    ///
    /// `column_seed` is the per-column stream seed derived by the terrain
    /// generator; plant instance streams mix the plant kind into it.
    pub fn attempt_place_foliage_at(
        columns: &mut [ChunkColumn],
        local_x: i32,
        local_y: i32,
        biome: &BiomeSettings,
        column_seed: u64,
        dims: ChunkDims,
    ) -> bool {
        let column_index = dims.column_index(local_x, local_y);
        if column_index >= columns.len() {
            return false;
        }

        let top_solid_z = columns[column_index].height;
        if top_solid_z < 0 || top_solid_z >= dims.height - 1 {
            return false;
        }

        let surface_block = columns[column_index].block_at(top_solid_z);
        let spawn_z = top_solid_z + 1;

        let mut column_rng = fastrand::Rng::with_seed(column_seed);

        for rule in &biome.foliage_rules {
            if !rule.allowed_surface_blocks.contains(&surface_block) {
                continue;
            }
            if column_rng.f32() >= rule.spawn_chance {
                continue;
            }
            if columns[column_index].block_at(spawn_z) != BlockType::Air {
                continue;
            }

            let mut instance_rng =
                fastrand::Rng::with_seed(column_seed ^ (rule.kind as u64).wrapping_mul(0x9e3779b9));

            let mut height = instance_rng.i32(rule.min_height..=rule.max_height.max(rule.min_height));
            let is_variant = instance_rng.f32() < rule.variant_chance;
            let base = Point3::new(local_x, local_y, spawn_z);

            // Truncate plants that would not fit below the chunk ceiling.
            if spawn_z + height + 3 >= dims.height {
                height = dims.height - spawn_z - 4;
                if height < rule.min_height && rule.kind != FoliageKind::GrassPlant {
                    continue;
                }
            }
            if height < 1 && rule.kind == FoliageKind::GrassPlant {
                continue;
            }

            match rule.kind {
                FoliageKind::OakTree => {
                    Self::generate_oak_tree(columns, base, height, is_variant, &mut instance_rng, dims);
                    return true;
                }
                FoliageKind::BirchTree => {
                    Self::generate_birch_tree(
                        columns,
                        base,
                        height,
                        is_variant,
                        &mut instance_rng,
                        dims,
                    );
                    return true;
                }
                FoliageKind::Cactus => {
                    Self::generate_cactus(columns, base, height, &mut instance_rng, dims);
                    return true;
                }
                FoliageKind::GrassPlant => {}
            }
        }

        // No major plant; roll for a surface grass tuft.
        if biome.surface_grass_chance > 0.0
            && biome.grass_spawnable_on.contains(&surface_block)
            && column_rng.f32() < biome.surface_grass_chance
            && columns[column_index].block_at(spawn_z) == BlockType::Air
        {
            Self::set_block_if_air(
                columns,
                local_x,
                local_y,
                spawn_z,
                BlockType::TallGrass,
                dims,
            );
        }

        false
    }

    fn generate_oak_tree(
        columns: &mut [ChunkColumn],
        base: Point3<i32>,
        height: i32,
        large_variant: bool,
        rng: &mut fastrand::Rng,
        dims: ChunkDims,
    ) {
        if base.z + height + 2 >= dims.height || height < 3 {
            return;
        }

        for i in 0..height {
            Self::set_block_if_air(columns, base.x, base.y, base.z + i, BlockType::OakLog, dims);
        }

        let canopy_radius = if large_variant { 3 } else { 2 };
        let canopy_v_extent = 2;
        let canopy_center_z = base.z + height - canopy_v_extent + rng.i32(-1..=0);

        for rel_z in -canopy_v_extent..=canopy_v_extent + 1 {
            let leaf_z = canopy_center_z + rel_z;
            if leaf_z < base.z + 1 {
                continue;
            }

            // Wider in the middle of the canopy, tapered at the ends.
            let layer_progress = (rel_z as f32 / (canopy_v_extent as f32 + 0.5)).abs();
            let mut layer_radius = (canopy_radius as f32
                * (1.0 - layer_progress * layer_progress).max(0.0).sqrt())
            .round() as i32;
            if rel_z.abs() == canopy_v_extent {
                layer_radius = (layer_radius - 1).max(0);
            }
            if rel_z == canopy_v_extent + 1 {
                layer_radius = (layer_radius - 1).max(0);
            }

            for rel_x in -layer_radius..=layer_radius {
                for rel_y in -layer_radius..=layer_radius {
                    let dist_sq = (rel_x * rel_x + rel_y * rel_y) as f32;
                    let outer = layer_radius as f32 + 0.5;
                    if dist_sq > outer * outer {
                        continue;
                    }

                    // Above the trunk top the center column must be leaves.
                    if leaf_z >= base.z + height - 1
                        && rel_x == 0
                        && rel_y == 0
                        && layer_radius > 0
                    {
                        Self::set_block_if_air(
                            columns,
                            base.x + rel_x,
                            base.y + rel_y,
                            leaf_z,
                            BlockType::OakLeaves,
                            dims,
                        );
                        continue;
                    }

                    // Hollow out some interior blocks for a less solid look.
                    let inner = layer_radius as f32 - 0.5;
                    if dist_sq < inner * inner && rng.f32() < 0.2 && layer_radius > 1 {
                        continue;
                    }

                    Self::set_block_if_air(
                        columns,
                        base.x + rel_x,
                        base.y + rel_y,
                        leaf_z,
                        BlockType::OakLeaves,
                        dims,
                    );
                }
            }
        }
    }

    fn generate_birch_tree(
        columns: &mut [ChunkColumn],
        base: Point3<i32>,
        height: i32,
        large_variant: bool,
        rng: &mut fastrand::Rng,
        dims: ChunkDims,
    ) {
        let actual_height = height + rng.i32(0..=if large_variant { 2 } else { 1 });
        if base.z + actual_height + 2 >= dims.height || actual_height < 4 {
            return;
        }

        for i in 0..actual_height {
            Self::set_block_if_air(columns, base.x, base.y, base.z + i, BlockType::BirchLog, dims);
        }

        let canopy_v_radius = if large_variant { 4 } else { 3 };
        let canopy_h_radius_max = 2;
        let canopy_base_z = base.z + actual_height - rng.i32(1..=2);

        for rel_z in 0..=canopy_v_radius {
            let leaf_z = canopy_base_z + rel_z;
            if leaf_z < base.z + actual_height / 2 {
                continue;
            }

            let layer_progress = rel_z as f32 / canopy_v_radius as f32;
            let mut layer_radius = (canopy_h_radius_max as f32
                * (1.0 - layer_progress * layer_progress * 0.7))
                .ceil() as i32;
            if rel_z == 0 && layer_radius < 1 {
                layer_radius = 1;
            }
            if rel_z == canopy_v_radius {
                layer_radius = (layer_radius - 1).max(0);
            }

            for rel_x in -layer_radius..=layer_radius {
                for rel_y in -layer_radius..=layer_radius {
                    // Diamond-ish layer outline with a ragged random edge.
                    if (rel_x.abs() + rel_y.abs()) as f32 > layer_radius as f32 + rng.f32() {
                        continue;
                    }
                    // Keep the core above the trunk open except near the top.
                    if rel_z < canopy_v_radius - 1 && rel_x == 0 && rel_y == 0 && layer_radius > 0 {
                        continue;
                    }
                    if rng.f32() < 0.85 {
                        Self::set_block_if_air(
                            columns,
                            base.x + rel_x,
                            base.y + rel_y,
                            leaf_z,
                            BlockType::BirchLeaves,
                            dims,
                        );
                    }
                }
            }
        }
    }

    fn generate_cactus(
        columns: &mut [ChunkColumn],
        base: Point3<i32>,
        height: i32,
        rng: &mut fastrand::Rng,
        dims: ChunkDims,
    ) {
        if base.z + height >= dims.height || height < 1 {
            return;
        }

        for i in 0..height {
            Self::set_block_if_air(columns, base.x, base.y, base.z + i, BlockType::Cactus, dims);
        }

        if height <= 2 {
            return;
        }

        let num_arms = rng.i32(0..=3);
        for _ in 0..num_arms {
            let arm_base_z = base.z + rng.i32(1..=height - 2);
            let max_arm = 3.min(height - (arm_base_z - base.z));
            let arm_height = rng.i32(1..=max_arm.max(1));

            let (mut arm_x, mut arm_y) = (base.x, base.y);
            match rng.i32(0..=3) {
                0 => arm_x += 1,
                1 => arm_x -= 1,
                2 => arm_y += 1,
                _ => arm_y -= 1,
            }

            if arm_x < 0 || arm_x >= dims.size || arm_y < 0 || arm_y >= dims.size {
                continue;
            }
            let check_index = dims.column_index(arm_x, arm_y);
            if check_index >= columns.len()
                || columns[check_index].block_at(arm_base_z) != BlockType::Air
            {
                continue;
            }

            for h in 0..arm_height {
                Self::set_block_if_air(columns, arm_x, arm_y, arm_base_z + h, BlockType::Cactus, dims);
            }
        }
    }

    fn set_block_if_air(
        columns: &mut [ChunkColumn],
        local_x: i32,
        local_y: i32,
        local_z: i32,
        block: BlockType,
        dims: ChunkDims,
    ) {
        if local_x < 0
            || local_x >= dims.size
            || local_y < 0
            || local_y >= dims.size
            || !dims.contains_z(local_z)
        {
            return;
        }
        let column_index = dims.column_index(local_x, local_y);
        if column_index >= columns.len() {
            return;
        }
        let column = &mut columns[column_index];
        if column.blocks[local_z as usize] == BlockType::Air {
            column.blocks[local_z as usize] = block;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::generation::biome::{BiomeType, FoliageRule};

    fn dims() -> ChunkDims {
        ChunkDims {
            size: 16,
            height: 64,
        }
    }

    fn flat_columns(dims: ChunkDims, surface_block: BlockType, surface: i32) -> Vec<ChunkColumn> {
        let mut columns = Vec::new();
        for y in 0..dims.size {
            for x in 0..dims.size {
                let mut column = ChunkColumn::new(dims.height, x, y);
                for z in 0..surface {
                    column.blocks[z as usize] = BlockType::Dirt;
                }
                column.blocks[surface as usize] = surface_block;
                column.height = surface;
                columns.push(column);
            }
        }
        columns
    }

    fn biome_with_rule(rule: FoliageRule) -> BiomeSettings {
        BiomeSettings {
            biome: BiomeType::Grassland,
            layers: Vec::new(),
            foliage_rules: vec![rule],
            surface_grass_chance: 0.0,
            grass_spawnable_on: Vec::new(),
        }
    }

    fn always(kind: FoliageKind, surfaces: &[BlockType]) -> FoliageRule {
        FoliageRule {
            kind,
            spawn_chance: 1.0,
            min_height: 4,
            max_height: 6,
            variant_chance: 0.0,
            allowed_surface_blocks: surfaces.to_vec(),
        }
    }

    #[test]
    fn oak_tree_places_trunk_and_canopy() {
        let dims = dims();
        let mut columns = flat_columns(dims, BlockType::Grass, 10);
        let biome = biome_with_rule(always(FoliageKind::OakTree, &[BlockType::Grass]));

        let placed =
            FoliageGenerator::attempt_place_foliage_at(&mut columns, 8, 8, &biome, 12345, dims);
        assert!(placed);

        let trunk = &columns[dims.column_index(8, 8)];
        assert_eq!(trunk.block_at(11), BlockType::OakLog);
        let leaves = columns
            .iter()
            .flat_map(|c| c.blocks.iter())
            .filter(|b| **b == BlockType::OakLeaves)
            .count();
        assert!(leaves > 8, "expected a canopy, found {} leaves", leaves);
    }

    #[test]
    fn placement_is_deterministic() {
        let dims = dims();
        let biome = biome_with_rule(always(FoliageKind::BirchTree, &[BlockType::Grass]));

        let mut a = flat_columns(dims, BlockType::Grass, 10);
        let mut b = flat_columns(dims, BlockType::Grass, 10);
        FoliageGenerator::attempt_place_foliage_at(&mut a, 5, 5, &biome, 777, dims);
        FoliageGenerator::attempt_place_foliage_at(&mut b, 5, 5, &biome, 777, dims);

        for (ca, cb) in a.iter().zip(b.iter()) {
            assert_eq!(ca.blocks, cb.blocks);
        }
    }

    #[test]
    fn wrong_surface_blocks_placement() {
        let dims = dims();
        let mut columns = flat_columns(dims, BlockType::Sand, 10);
        let biome = biome_with_rule(always(FoliageKind::OakTree, &[BlockType::Grass]));

        let placed =
            FoliageGenerator::attempt_place_foliage_at(&mut columns, 4, 4, &biome, 1, dims);
        assert!(!placed);
    }

    #[test]
    fn cactus_spawns_on_sand() {
        let dims = dims();
        let mut columns = flat_columns(dims, BlockType::Sand, 10);
        let mut rule = always(FoliageKind::Cactus, &[BlockType::Sand]);
        rule.min_height = 3;
        rule.max_height = 3;
        let biome = biome_with_rule(rule);

        assert!(FoliageGenerator::attempt_place_foliage_at(
            &mut columns,
            7,
            7,
            &biome,
            9,
            dims
        ));
        assert_eq!(
            columns[dims.column_index(7, 7)].block_at(11),
            BlockType::Cactus
        );
    }

    #[test]
    fn near_ceiling_trees_are_skipped_not_clipped() {
        let dims = ChunkDims {
            size: 16,
            height: 16,
        };
        let mut columns = flat_columns(dims, BlockType::Grass, 13);
        let biome = biome_with_rule(always(FoliageKind::OakTree, &[BlockType::Grass]));

        FoliageGenerator::attempt_place_foliage_at(&mut columns, 3, 3, &biome, 2, dims);
        // Whatever happened, nothing may sit outside the column and the
        // surface must be untouched.
        let column = &columns[dims.column_index(3, 3)];
        assert_eq!(column.blocks.len(), dims.height as usize);
        assert_eq!(column.block_at(13), BlockType::Grass);
    }

    #[test]
    fn surface_grass_spawns_when_no_tree_fires() {
        let dims = dims();
        let mut columns = flat_columns(dims, BlockType::Grass, 10);
        let biome = BiomeSettings {
            biome: BiomeType::Grassland,
            layers: Vec::new(),
            foliage_rules: Vec::new(),
            surface_grass_chance: 1.0,
            grass_spawnable_on: vec![BlockType::Grass],
        };

        let placed =
            FoliageGenerator::attempt_place_foliage_at(&mut columns, 2, 9, &biome, 4, dims);
        assert!(!placed);
        assert_eq!(
            columns[dims.column_index(2, 9)].block_at(11),
            BlockType::TallGrass
        );
    }
}
