//! # Terrain Generator
//!
//! Produces fully-populated chunk columns on demand. For every column the
//! generator:
//!
//! 1. samples the noise stack and reshapes each parameter through its spline
//! 2. computes the surface height from weighted continentalness and
//!    peaks-and-valleys, flattened by erosion
//! 3. simulates climate (altitude-cooled temperature, humidity)
//! 4. classifies the biome from the banded parameters
//! 5. stacks the biome's block layers down from the surface, stone below,
//!    and floods submerged columns up to the water level
//!
//! Chunk-level generation additionally runs the foliage decorator over the
//! finished columns. Everything is a pure function of (settings, seed,
//! position), which is what lets generation run on any worker thread.

use std::sync::Arc;

use cgmath::Point2;
use log::debug;
use serde::Deserialize;

use crate::engine_state::generation::biome::{
    determine_biome, BiomeTable, BiomeThresholds, CategorizedBiomeInputs,
};
use crate::engine_state::generation::foliage::FoliageGenerator;
use crate::engine_state::generation::noise_stack::{
    peaks_valleys_from_weirdness, NoiseStack, NoiseStackSettings,
};
use crate::engine_state::generation::spline::Spline;
use crate::engine_state::settings::WorldSettings;
use crate::engine_state::voxels::block::BlockType;
use crate::engine_state::voxels::chunk::{ChunkColumn, ChunkDims, TerrainParameters};

fn default_continentalness_weight() -> f32 {
    0.5
}
fn default_erosion_weight() -> f32 {
    0.2
}
fn default_peaks_valleys_weight() -> f32 {
    0.3
}
fn default_base_height() -> f32 {
    60.0
}
fn default_amplitude() -> f32 {
    50.0
}
fn default_altitude_temperature_factor() -> f32 {
    0.01
}

fn default_continentalness_spline() -> Spline {
    // S-shaped: hold oceans low, pull inland terrain up quickly.
    Spline::new(vec![
        (0.0, 0.0),
        (0.3, 0.2),
        (0.5, 0.45),
        (0.7, 0.75),
        (1.0, 1.0),
    ])
}

fn default_peaks_valleys_spline() -> Spline {
    // Bowed outward to exaggerate ridge lines and valley floors.
    Spline::new(vec![(0.0, 0.0), (0.4, 0.3), (0.6, 0.7), (1.0, 1.0)])
}

/// Tunable terrain shape parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Noise sampler settings.
    pub noise: NoiseStackSettings,
    /// Curve reshaping continentalness.
    pub continentalness_spline: Spline,
    /// Curve reshaping erosion.
    pub erosion_spline: Spline,
    /// Curve reshaping weirdness.
    pub weirdness_spline: Spline,
    /// Curve reshaping peaks-and-valleys.
    pub peaks_valleys_spline: Spline,
    /// Contribution of continentalness to the height noise.
    pub continentalness_weight: f32,
    /// Strength of erosion flattening.
    pub erosion_weight: f32,
    /// Contribution of peaks-and-valleys to the height noise.
    pub peaks_valleys_weight: f32,
    /// Mean terrain height in blocks.
    pub base_height: f32,
    /// Height swing around the base, in blocks.
    pub amplitude: f32,
    /// Temperature drop per block of altitude above the base height.
    pub altitude_temperature_factor: f32,
    /// Band cutoffs for biome classification.
    pub thresholds: BiomeThresholds,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        TerrainSettings {
            noise: NoiseStackSettings::default(),
            continentalness_spline: default_continentalness_spline(),
            erosion_spline: Spline::identity(),
            weirdness_spline: Spline::identity(),
            peaks_valleys_spline: default_peaks_valleys_spline(),
            continentalness_weight: default_continentalness_weight(),
            erosion_weight: default_erosion_weight(),
            peaks_valleys_weight: default_peaks_valleys_weight(),
            base_height: default_base_height(),
            amplitude: default_amplitude(),
            altitude_temperature_factor: default_altitude_temperature_factor(),
            thresholds: BiomeThresholds::default(),
        }
    }
}

fn remap01_to_neg11(value: f32) -> f32 {
    value * 2.0 - 1.0
}

fn remap_neg11_to_01(value: f32) -> f32 {
    (value + 1.0) / 2.0
}

/// The column generator. Immutable once built; shared across worker threads
/// behind an `Arc`.
pub struct TerrainGenerator {
    world: Arc<WorldSettings>,
    settings: TerrainSettings,
    biomes: BiomeTable,
    noise: NoiseStack,
    seed: i32,
}

impl TerrainGenerator {
    /// Builds a generator seeded from the world settings.
    pub fn new(world: Arc<WorldSettings>, settings: TerrainSettings, biomes: BiomeTable) -> Self {
        let seed = world.seed;
        Self::with_seed(world, settings, biomes, seed)
    }

    /// Builds a generator with an explicit seed (used when regenerating the
    /// world without reloading settings).
    pub fn with_seed(
        world: Arc<WorldSettings>,
        settings: TerrainSettings,
        biomes: BiomeTable,
        seed: i32,
    ) -> Self {
        debug!("initializing noise stack for seed {}", seed);
        let noise = NoiseStack::new(seed, &settings.noise);
        TerrainGenerator {
            world,
            settings,
            biomes,
            noise,
            seed,
        }
    }

    /// The seed this generator's noise stack was built from.
    pub fn seed(&self) -> i32 {
        self.seed
    }

    /// Generates the column at global block coordinates (gx, gy): terrain
    /// parameters, height, climate and biome. Blocks are left for
    /// [`TerrainGenerator::populate_column_blocks`].
    pub fn generate_column(&self, gx: i32, gy: i32) -> ChunkColumn {
        let chunk_height = self.world.chunk_height;
        let mut column = ChunkColumn::new(chunk_height, gx, gy);

        let raw_continentalness = self.noise.continentalness.sample(gx, gy);
        let raw_erosion = self.noise.erosion.sample(gx, gy);
        let raw_weirdness = self.noise.weirdness.sample(gx, gy);

        let pv = peaks_valleys_from_weirdness(raw_weirdness);

        let splined = TerrainParameters {
            continentalness: self
                .settings
                .continentalness_spline
                .evaluate(remap_neg11_to_01(raw_continentalness)),
            erosion: self
                .settings
                .erosion_spline
                .evaluate(remap_neg11_to_01(raw_erosion)),
            weirdness: self
                .settings
                .weirdness_spline
                .evaluate(remap_neg11_to_01(raw_weirdness)),
            peaks_valleys: self
                .settings
                .peaks_valleys_spline
                .evaluate(remap_neg11_to_01(pv)),
        };
        column.set_terrain_parameters(splined);

        // Height: weighted sum of the shaping parameters, flattened by
        // erosion, swung around the base height.
        let base_noise = remap01_to_neg11(splined.continentalness)
            * self.settings.continentalness_weight
            + remap01_to_neg11(splined.peaks_valleys) * self.settings.peaks_valleys_weight;
        let flatten_factor =
            (1.0 - splined.erosion * self.settings.erosion_weight).clamp(0.0, 1.0);
        let absolute_height =
            self.settings.base_height + base_noise * flatten_factor * self.settings.amplitude;
        let surface = (absolute_height.round() as i32).clamp(0, chunk_height - 1);
        column.height = surface;

        // Climate. Temperature cools with altitude above the base height.
        let temperature01 = remap_neg11_to_01(self.noise.temperature.sample(gx, gy));
        let altitude_modifier =
            (surface as f32 - self.settings.base_height) * self.settings.altitude_temperature_factor;
        column.temperature = (temperature01 - altitude_modifier).clamp(0.0, 1.0);
        column.humidity = remap_neg11_to_01(self.noise.humidity.sample(gx, gy)).clamp(0.0, 1.0);

        // Biome classification over the banded parameters.
        let thresholds = &self.settings.thresholds;
        let inputs = CategorizedBiomeInputs {
            temperature: thresholds.categorize_temperature(remap01_to_neg11(column.temperature)),
            humidity: thresholds.categorize_humidity(remap01_to_neg11(column.humidity)),
            continentalness: thresholds
                .categorize_continentalness(remap01_to_neg11(splined.continentalness)),
            erosion: thresholds.categorize_erosion(remap01_to_neg11(splined.erosion)),
            peaks_valleys: thresholds
                .categorize_peaks_valleys(remap01_to_neg11(splined.peaks_valleys)),
            weirdness: remap01_to_neg11(splined.weirdness),
        };
        column.set_biome(determine_biome(&inputs));

        column
    }

    /// Fills a column's block stack from its height and biome: the biome's
    /// layers top-down, stone below, and water up to the water level for
    /// submerged columns.
    pub fn populate_column_blocks(&self, column: &mut ChunkColumn) {
        let chunk_height = self.world.chunk_height;

        let Some(biome) = self.biomes.get(column.biome()) else {
            for z in 0..=column.height.min(chunk_height - 1) {
                column.blocks[z as usize] = BlockType::Stone;
            }
            return;
        };

        let mut current_height = column.height;
        for layer in &biome.layers {
            if layer.thickness <= 0 {
                continue;
            }
            let layer_bottom = current_height - (layer.thickness - 1);
            let mut z = current_height;
            while z >= layer_bottom {
                if z >= 0 && z < chunk_height {
                    column.blocks[z as usize] = layer.block;
                } else if z < 0 {
                    break;
                }
                z -= 1;
            }
            current_height = layer_bottom - 1;
            if current_height < 0 {
                break;
            }
        }

        // Everything below the layered surface is stone.
        for z in (0..=current_height.max(-1)).rev() {
            if z < chunk_height {
                column.blocks[z as usize] = BlockType::Stone;
            }
        }

        // Flood submerged columns.
        if column.height < self.world.water_level {
            for z in column.height + 1..=self.world.water_level {
                if z >= 0 && z < chunk_height {
                    column.blocks[z as usize] = BlockType::Water;
                }
            }
        }
    }

    /// Runs the foliage decorator over a chunk's columns. Streams derive from
    /// the world seed and the chunk position, so decoration is reproducible.
    pub fn decorate_chunk_with_foliage(
        &self,
        columns: &mut [ChunkColumn],
        chunk_position: Point2<i32>,
    ) {
        let dims = ChunkDims::of(&self.world);
        let base_seed = (self
            .seed
            .wrapping_add(chunk_position.x.wrapping_mul(73856093)))
            ^ chunk_position.y.wrapping_mul(19349663);

        for local_y in 0..dims.size {
            for local_x in 0..dims.size {
                let column_index = dims.column_index(local_x, local_y);
                if column_index >= columns.len() {
                    continue;
                }

                let biome = columns[column_index].biome();
                let Some(biome_settings) = self.biomes.get(biome) else {
                    continue;
                };
                if biome_settings.foliage_rules.is_empty()
                    && biome_settings.surface_grass_chance <= 0.0
                {
                    continue;
                }

                let gx = chunk_position.x * dims.size + local_x;
                let gy = chunk_position.y * dims.size + local_y;
                let column_seed =
                    (base_seed ^ gx ^ (gy.wrapping_shl(16)) ^ (gy.wrapping_shr(16))) as u32 as u64;

                FoliageGenerator::attempt_place_foliage_at(
                    columns,
                    local_x,
                    local_y,
                    biome_settings,
                    column_seed,
                    dims,
                );
            }
        }
    }

    /// Full chunk generation: every column generated and populated, then the
    /// foliage pass. This is what chunk generation tasks execute.
    pub fn generate_chunk_columns(&self, chunk_position: Point2<i32>) -> Vec<ChunkColumn> {
        let dims = ChunkDims::of(&self.world);
        let mut columns = Vec::with_capacity((dims.size * dims.size) as usize);

        for local_y in 0..dims.size {
            for local_x in 0..dims.size {
                let gx = chunk_position.x * dims.size + local_x;
                let gy = chunk_position.y * dims.size + local_y;
                let mut column = self.generate_column(gx, gy);
                self.populate_column_blocks(&mut column);
                columns.push(column);
            }
        }

        // Column storage is x + y * size; the loops above push in that order.
        self.decorate_chunk_with_foliage(&mut columns, chunk_position);
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::generation::biome::BiomeType;

    fn generator() -> TerrainGenerator {
        let world = Arc::new(WorldSettings::default());
        TerrainGenerator::new(world, TerrainSettings::default(), BiomeTable::with_defaults())
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generator();
        let b = generator();
        let ca = a.generate_chunk_columns(Point2::new(3, -2));
        let cb = b.generate_chunk_columns(Point2::new(3, -2));
        for (x, y) in ca.iter().zip(cb.iter()) {
            assert_eq!(x.blocks, y.blocks);
            assert_eq!(x.height, y.height);
            assert_eq!(x.biome(), y.biome());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let world = Arc::new(WorldSettings::default());
        let a = TerrainGenerator::with_seed(
            world.clone(),
            TerrainSettings::default(),
            BiomeTable::with_defaults(),
            1,
        );
        let b = TerrainGenerator::with_seed(
            world,
            TerrainSettings::default(),
            BiomeTable::with_defaults(),
            2,
        );
        let heights_a: Vec<i32> = (0..32).map(|i| a.generate_column(i * 11, 5).height).collect();
        let heights_b: Vec<i32> = (0..32).map(|i| b.generate_column(i * 11, 5).height).collect();
        assert_ne!(heights_a, heights_b);
    }

    #[test]
    fn columns_are_fully_stacked() {
        let generator = generator();
        let columns = generator.generate_chunk_columns(Point2::new(0, 0));
        let settings = WorldSettings::default();
        for column in &columns {
            assert_eq!(column.blocks.len(), settings.chunk_height as usize);
            assert!(column.height >= 0 && column.height < settings.chunk_height);
            // Bedrock level is never air.
            assert_ne!(column.block_at(0), BlockType::Air);
        }
    }

    #[test]
    fn water_fills_only_up_to_the_water_level() {
        let generator = generator();
        let settings = WorldSettings::default();
        let mut saw_water = false;
        for cx in -4..4 {
            for column in generator.generate_chunk_columns(Point2::new(cx, 0)) {
                for z in 0..settings.chunk_height {
                    if column.block_at(z) == BlockType::Water {
                        saw_water = true;
                        assert!(z <= settings.water_level, "water above the water level");
                        assert!(z > column.height, "water inside terrain");
                    }
                }
                if column.height < settings.water_level {
                    assert_eq!(column.block_at(settings.water_level), BlockType::Water);
                }
            }
        }
        assert!(saw_water, "expected at least one submerged column in range");
    }

    #[test]
    fn desert_layers_stack_sand_over_stone() {
        let generator = generator();
        let mut column = ChunkColumn::new(128, 0, 0);
        column.height = 70;
        column.set_biome(BiomeType::Desert);
        generator.populate_column_blocks(&mut column);

        for z in 67..=70 {
            assert_eq!(column.block_at(z), BlockType::Sand);
        }
        assert_eq!(column.block_at(66), BlockType::Stone);
        assert_eq!(column.block_at(0), BlockType::Stone);
        assert_eq!(column.block_at(71), BlockType::Air);
    }

    #[test]
    fn layers_truncate_at_bedrock() {
        let generator = generator();
        let mut column = ChunkColumn::new(128, 0, 0);
        column.height = 1;
        column.set_biome(BiomeType::Grassland);
        generator.populate_column_blocks(&mut column);

        assert_eq!(column.block_at(1), BlockType::Grass);
        assert_eq!(column.block_at(0), BlockType::Dirt);
        // Submerged: water fills above the short column.
        assert_eq!(column.block_at(2), BlockType::Water);
    }
}
