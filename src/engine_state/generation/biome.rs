//! # Biome Module
//!
//! Biome classification and the data-driven biome table.
//!
//! Classification works in two steps. Each column's splined terrain
//! parameters and climate values are first *categorized* into coarse bands
//! (five temperature bands, five humidity bands, seven continentalness
//! bands, seven erosion levels, five peaks-and-valleys bands). A fixed
//! decision tree then maps the banded inputs to a biome: oceans first, then
//! valleys and peaks, then coasts, and finally the middle-biome matrix of
//! temperature against humidity.
//!
//! The biome table carries what each biome *does*: its surface block layers,
//! its foliage spawn rules, and its surface grass behavior. Like the block
//! registry it ships compiled-in defaults and accepts JSON overrides.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::engine_state::voxels::block::BlockType;

/// The biomes the classifier can produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BiomeType {
    /// Open plains; also stands in for generic ocean floor and beaches.
    Grassland,
    /// Mixed forest.
    Woodland,
    /// Birch-dominated forest.
    SeasonalForest,
    /// Dense dark forest.
    TemperateRainforest,
    /// Jungle; also used for hot humid valley floors.
    TropicalRainforest,
    /// Cold conifer forest.
    BorealForest,
    /// Hot dry grassland.
    Savanna,
    /// Hot arid sand.
    Desert,
    /// Cold barren plains; also cold ocean floor and stony peaks.
    Tundra,
    /// Frozen terrain: ice spikes, frozen oceans and frozen peaks.
    Ice,
}

static BIOME_NAMES: phf::Map<&'static str, BiomeType> = phf::phf_map! {
    "grassland" => BiomeType::Grassland,
    "woodland" => BiomeType::Woodland,
    "seasonal_forest" => BiomeType::SeasonalForest,
    "temperate_rainforest" => BiomeType::TemperateRainforest,
    "tropical_rainforest" => BiomeType::TropicalRainforest,
    "boreal_forest" => BiomeType::BorealForest,
    "savanna" => BiomeType::Savanna,
    "desert" => BiomeType::Desert,
    "tundra" => BiomeType::Tundra,
    "ice" => BiomeType::Ice,
};

impl FromStr for BiomeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BIOME_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| format!("unknown biome: {:?}", s))
    }
}

impl<'de> Deserialize<'de> for BiomeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BiomeTypeVisitor;

        impl<'de> Visitor<'de> for BiomeTypeVisitor {
            type Value = BiomeType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a snake_case biome name")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<BiomeType, E> {
                BiomeType::from_str(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(BiomeTypeVisitor)
    }
}

/// Temperature bands, coldest to hottest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TemperatureBand {
    /// Frozen.
    Coldest,
    /// Cold.
    Cold,
    /// Temperate.
    Temperate,
    /// Warm.
    Warm,
    /// Hot.
    Hot,
}

/// Humidity bands, driest to wettest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HumidityBand {
    /// Arid.
    Dryest,
    /// Dry.
    Dry,
    /// Average.
    Medium,
    /// Humid.
    Wet,
    /// Saturated.
    Wettest,
}

/// Continentalness bands, from far offshore to deep inland.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContinentalnessBand {
    /// Isolated offshore islands.
    MushroomFields,
    /// Deep ocean.
    DeepOcean,
    /// Ocean.
    Ocean,
    /// Shoreline.
    Coast,
    /// Just inland.
    NearInland,
    /// Inland.
    MidInland,
    /// Deep inland.
    FarInland,
}

/// Erosion levels; higher levels flatten terrain harder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErosionBand {
    /// Least eroded.
    Level0,
    /// Level 1.
    Level1,
    /// Level 2.
    Level2,
    /// Level 3.
    Level3,
    /// Level 4.
    Level4,
    /// Level 5.
    Level5,
    /// Most eroded.
    Level6,
}

/// Peaks-and-valleys bands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PvBand {
    /// River valleys.
    Valleys,
    /// Low ground.
    Low,
    /// Middle ground.
    Mid,
    /// Foothills.
    High,
    /// Mountain peaks.
    Peaks,
}

/// Band cutoffs over [-1, 1] for every categorized parameter.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BiomeThresholds {
    /// Temperature cutoffs: below each value lands in the matching band.
    pub temperature: [f32; 4],
    /// Humidity cutoffs.
    pub humidity: [f32; 4],
    /// Continentalness cutoffs.
    pub continentalness: [f32; 6],
    /// Erosion cutoffs.
    pub erosion: [f32; 6],
    /// Peaks-and-valleys cutoffs.
    pub peaks_valleys: [f32; 4],
}

impl Default for BiomeThresholds {
    fn default() -> Self {
        BiomeThresholds {
            temperature: [-0.45, -0.15, 0.2, 0.55],
            humidity: [-0.35, -0.1, 0.1, 0.3],
            continentalness: [-0.95, -0.455, -0.19, -0.11, 0.03, 0.3],
            erosion: [-0.78, -0.375, -0.2225, 0.05, 0.45, 0.55],
            peaks_valleys: [-0.85, -0.2, 0.2, 0.7],
        }
    }
}

impl BiomeThresholds {
    /// Bands a temperature value in [-1, 1].
    pub fn categorize_temperature(&self, value: f32) -> TemperatureBand {
        let t = &self.temperature;
        if value < t[0] {
            TemperatureBand::Coldest
        } else if value < t[1] {
            TemperatureBand::Cold
        } else if value < t[2] {
            TemperatureBand::Temperate
        } else if value < t[3] {
            TemperatureBand::Warm
        } else {
            TemperatureBand::Hot
        }
    }

    /// Bands a humidity value in [-1, 1].
    pub fn categorize_humidity(&self, value: f32) -> HumidityBand {
        let h = &self.humidity;
        if value < h[0] {
            HumidityBand::Dryest
        } else if value < h[1] {
            HumidityBand::Dry
        } else if value < h[2] {
            HumidityBand::Medium
        } else if value < h[3] {
            HumidityBand::Wet
        } else {
            HumidityBand::Wettest
        }
    }

    /// Bands a continentalness value in [-1, 1].
    pub fn categorize_continentalness(&self, value: f32) -> ContinentalnessBand {
        let c = &self.continentalness;
        if value < c[0] {
            ContinentalnessBand::MushroomFields
        } else if value < c[1] {
            ContinentalnessBand::DeepOcean
        } else if value < c[2] {
            ContinentalnessBand::Ocean
        } else if value < c[3] {
            ContinentalnessBand::Coast
        } else if value < c[4] {
            ContinentalnessBand::NearInland
        } else if value < c[5] {
            ContinentalnessBand::MidInland
        } else {
            ContinentalnessBand::FarInland
        }
    }

    /// Bands an erosion value in [-1, 1].
    pub fn categorize_erosion(&self, value: f32) -> ErosionBand {
        let e = &self.erosion;
        if value < e[0] {
            ErosionBand::Level0
        } else if value < e[1] {
            ErosionBand::Level1
        } else if value < e[2] {
            ErosionBand::Level2
        } else if value < e[3] {
            ErosionBand::Level3
        } else if value < e[4] {
            ErosionBand::Level4
        } else if value < e[5] {
            ErosionBand::Level5
        } else {
            ErosionBand::Level6
        }
    }

    /// Bands a peaks-and-valleys value in [-1, 1].
    pub fn categorize_peaks_valleys(&self, value: f32) -> PvBand {
        let p = &self.peaks_valleys;
        if value < p[0] {
            PvBand::Valleys
        } else if value < p[1] {
            PvBand::Low
        } else if value < p[2] {
            PvBand::Mid
        } else if value < p[3] {
            PvBand::High
        } else {
            PvBand::Peaks
        }
    }
}

/// Banded inputs to the biome decision tree.
#[derive(Copy, Clone, Debug)]
pub struct CategorizedBiomeInputs {
    /// Temperature band.
    pub temperature: TemperatureBand,
    /// Humidity band.
    pub humidity: HumidityBand,
    /// Continentalness band.
    pub continentalness: ContinentalnessBand,
    /// Erosion band.
    pub erosion: ErosionBand,
    /// Peaks-and-valleys band.
    pub peaks_valleys: PvBand,
    /// Raw weirdness in [-1, 1], used by the middle-biome matrix.
    pub weirdness: f32,
}

/// Maps banded inputs to a biome.
pub fn determine_biome(inputs: &CategorizedBiomeInputs) -> BiomeType {
    // Non-inland terrain first.
    if inputs.continentalness == ContinentalnessBand::MushroomFields {
        return BiomeType::Woodland;
    }

    if inputs.continentalness <= ContinentalnessBand::Ocean {
        return match inputs.temperature {
            TemperatureBand::Coldest => BiomeType::Ice,
            TemperatureBand::Cold => BiomeType::Tundra,
            _ => BiomeType::Grassland,
        };
    }

    // River valleys.
    if inputs.peaks_valleys == PvBand::Valleys {
        if inputs.temperature == TemperatureBand::Coldest {
            return BiomeType::Ice;
        }
        if inputs.humidity >= HumidityBand::Wet
            && inputs.erosion <= ErosionBand::Level1
            && (inputs.temperature == TemperatureBand::Warm
                || inputs.temperature == TemperatureBand::Hot)
        {
            return BiomeType::TropicalRainforest;
        }
        return BiomeType::Grassland;
    }

    // Peaks and foothills.
    if inputs.peaks_valleys >= PvBand::High {
        if inputs.temperature <= TemperatureBand::Temperate {
            return BiomeType::Ice;
        }
        if inputs.temperature == TemperatureBand::Warm {
            return BiomeType::Tundra;
        }
        return if inputs.erosion <= ErosionBand::Level1 {
            BiomeType::Desert
        } else {
            BiomeType::Savanna
        };
    }

    // Beaches.
    if inputs.continentalness == ContinentalnessBand::Coast && inputs.peaks_valleys == PvBand::Low {
        return map_beach_biome(inputs.temperature);
    }

    map_middle_biome(inputs.temperature, inputs.humidity, inputs.weirdness)
}

/// The temperature-by-humidity matrix for ordinary inland terrain.
pub fn map_middle_biome(
    temperature: TemperatureBand,
    humidity: HumidityBand,
    weirdness: f32,
) -> BiomeType {
    match temperature {
        TemperatureBand::Coldest => {
            if weirdness > 0.1 {
                return BiomeType::Ice;
            }
            match humidity {
                HumidityBand::Wet | HumidityBand::Wettest => BiomeType::BorealForest,
                _ => BiomeType::Tundra,
            }
        }
        TemperatureBand::Cold => match humidity {
            HumidityBand::Dryest | HumidityBand::Dry => BiomeType::Grassland,
            HumidityBand::Medium => BiomeType::Woodland,
            HumidityBand::Wet | HumidityBand::Wettest => BiomeType::BorealForest,
        },
        TemperatureBand::Temperate => match humidity {
            HumidityBand::Dryest => {
                if weirdness > 0.1 {
                    BiomeType::SeasonalForest
                } else {
                    BiomeType::Grassland
                }
            }
            HumidityBand::Dry => BiomeType::Grassland,
            HumidityBand::Medium => {
                if weirdness > 0.1 {
                    BiomeType::Grassland
                } else {
                    BiomeType::Woodland
                }
            }
            HumidityBand::Wet => BiomeType::SeasonalForest,
            HumidityBand::Wettest => BiomeType::TemperateRainforest,
        },
        TemperatureBand::Warm => match humidity {
            HumidityBand::Wet | HumidityBand::Wettest => BiomeType::TropicalRainforest,
            _ => BiomeType::Savanna,
        },
        TemperatureBand::Hot => BiomeType::Desert,
    }
}

/// Shoreline biomes by temperature.
pub fn map_beach_biome(temperature: TemperatureBand) -> BiomeType {
    match temperature {
        TemperatureBand::Coldest => BiomeType::Tundra,
        TemperatureBand::Hot => BiomeType::Desert,
        _ => BiomeType::Grassland,
    }
}

/// Plateau variants; currently folds the distinct plateau biomes onto their
/// nearest counterparts before falling back to the middle matrix.
pub fn map_plateau_biome(
    temperature: TemperatureBand,
    humidity: HumidityBand,
    weirdness: f32,
) -> BiomeType {
    if temperature == TemperatureBand::Warm && humidity <= HumidityBand::Medium {
        return BiomeType::Savanna;
    }
    if temperature == TemperatureBand::Hot {
        return BiomeType::Desert;
    }
    map_middle_biome(temperature, humidity, weirdness)
}

/// Shattered-terrain variants, same folding approach as the plateaus.
pub fn map_shattered_biome(
    temperature: TemperatureBand,
    humidity: HumidityBand,
    weirdness: f32,
) -> BiomeType {
    if temperature == TemperatureBand::Warm && humidity <= HumidityBand::Medium {
        return BiomeType::Savanna;
    }
    if temperature <= TemperatureBand::Cold && humidity <= HumidityBand::Dry {
        return BiomeType::Tundra;
    }
    map_middle_biome(temperature, humidity, weirdness)
}

/// Kinds of foliage the decorator can place.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoliageKind {
    /// Oak tree: trunk plus rounded canopy.
    OakTree,
    /// Birch tree: taller trunk, sparse diamond canopy.
    BirchTree,
    /// Cactus: trunk with optional arms.
    Cactus,
    /// Single tall-grass block on the surface.
    GrassPlant,
}

fn default_spawn_chance() -> f32 {
    0.05
}
fn default_min_height() -> i32 {
    3
}
fn default_max_height() -> i32 {
    7
}
fn default_variant_chance() -> f32 {
    0.1
}

/// One foliage spawn rule of a biome.
#[derive(Clone, Debug, Deserialize)]
pub struct FoliageRule {
    /// What to place.
    pub kind: FoliageKind,
    /// Chance per column, rolled once per column.
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: f32,
    /// Minimum trunk height.
    #[serde(default = "default_min_height")]
    pub min_height: i32,
    /// Maximum trunk height.
    #[serde(default = "default_max_height")]
    pub max_height: i32,
    /// Chance of the large variant.
    #[serde(default = "default_variant_chance")]
    pub variant_chance: f32,
    /// Surface blocks this foliage may grow on.
    pub allowed_surface_blocks: Vec<BlockType>,
}

/// One layer of a biome's surface block stack.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockLayer {
    /// The block filling the layer.
    pub block: BlockType,
    /// Layer thickness in blocks, counted downward from the surface.
    pub thickness: i32,
}

/// Everything a biome contributes to generation.
#[derive(Clone, Debug, Deserialize)]
pub struct BiomeSettings {
    /// The biome this row describes.
    pub biome: BiomeType,
    /// Surface layers, top first. Stone fills whatever remains below.
    pub layers: Vec<BlockLayer>,
    /// Foliage spawn rules, tried in order; the first that fires wins.
    #[serde(default)]
    pub foliage_rules: Vec<FoliageRule>,
    /// Chance of a tall-grass plant where no larger foliage spawned.
    #[serde(default)]
    pub surface_grass_chance: f32,
    /// Surface blocks tall grass may grow on.
    #[serde(default)]
    pub grass_spawnable_on: Vec<BlockType>,
}

/// The biome table: settings for every biome, JSON-overridable.
#[derive(Clone)]
pub struct BiomeTable {
    rows: HashMap<BiomeType, BiomeSettings>,
}

impl BiomeTable {
    /// Builds the table with compiled-in defaults for every biome.
    pub fn with_defaults() -> Self {
        let mut rows = HashMap::new();
        for row in default_biome_rows() {
            rows.insert(row.biome, row);
        }
        BiomeTable { rows }
    }

    /// Builds the table from defaults plus a JSON array of override rows.
    pub fn with_overrides(json: &str) -> Result<Self, serde_json::Error> {
        let mut table = Self::with_defaults();
        let rows: Vec<BiomeSettings> = serde_json::from_str(json)?;
        for row in rows {
            table.rows.insert(row.biome, row);
        }
        Ok(table)
    }

    /// Settings for a biome, or `None` if the table has no row for it (the
    /// terrain generator then falls back to bare stone).
    pub fn get(&self, biome: BiomeType) -> Option<&BiomeSettings> {
        self.rows.get(&biome)
    }
}

fn layers(entries: &[(BlockType, i32)]) -> Vec<BlockLayer> {
    entries.iter()
        .map(|(block, thickness)| BlockLayer {
            block: *block,
            thickness: *thickness,
        })
        .collect()
}

fn tree_rule(kind: FoliageKind, chance: f32, surfaces: &[BlockType]) -> FoliageRule {
    FoliageRule {
        kind,
        spawn_chance: chance,
        min_height: default_min_height(),
        max_height: default_max_height(),
        variant_chance: default_variant_chance(),
        allowed_surface_blocks: surfaces.to_vec(),
    }
}

fn default_biome_rows() -> Vec<BiomeSettings> {
    use BlockType::*;

    vec![
        BiomeSettings {
            biome: BiomeType::Grassland,
            layers: layers(&[(Grass, 1), (Dirt, 3)]),
            foliage_rules: vec![tree_rule(FoliageKind::OakTree, 0.002, &[Grass])],
            surface_grass_chance: 0.12,
            grass_spawnable_on: vec![Grass],
        },
        BiomeSettings {
            biome: BiomeType::Woodland,
            layers: layers(&[(Grass, 1), (Dirt, 3)]),
            foliage_rules: vec![tree_rule(FoliageKind::OakTree, 0.04, &[Grass])],
            surface_grass_chance: 0.2,
            grass_spawnable_on: vec![Grass],
        },
        BiomeSettings {
            biome: BiomeType::SeasonalForest,
            layers: layers(&[(Grass, 1), (Dirt, 3)]),
            foliage_rules: vec![
                tree_rule(FoliageKind::BirchTree, 0.04, &[Grass]),
                tree_rule(FoliageKind::OakTree, 0.01, &[Grass]),
            ],
            surface_grass_chance: 0.15,
            grass_spawnable_on: vec![Grass],
        },
        BiomeSettings {
            biome: BiomeType::TemperateRainforest,
            layers: layers(&[(Grass, 1), (Dirt, 4)]),
            foliage_rules: vec![tree_rule(FoliageKind::OakTree, 0.06, &[Grass, Dirt])],
            surface_grass_chance: 0.25,
            grass_spawnable_on: vec![Grass],
        },
        BiomeSettings {
            biome: BiomeType::TropicalRainforest,
            layers: layers(&[(Grass, 1), (Dirt, 4)]),
            foliage_rules: vec![tree_rule(FoliageKind::OakTree, 0.08, &[Grass, Dirt])],
            surface_grass_chance: 0.5,
            grass_spawnable_on: vec![Grass],
        },
        BiomeSettings {
            biome: BiomeType::BorealForest,
            layers: layers(&[(Grass, 1), (Dirt, 3)]),
            foliage_rules: vec![tree_rule(FoliageKind::OakTree, 0.05, &[Grass, Snow])],
            surface_grass_chance: 0.05,
            grass_spawnable_on: vec![Grass],
        },
        BiomeSettings {
            biome: BiomeType::Savanna,
            layers: layers(&[(Grass, 1), (Dirt, 2)]),
            foliage_rules: vec![tree_rule(FoliageKind::OakTree, 0.005, &[Grass])],
            surface_grass_chance: 0.4,
            grass_spawnable_on: vec![Grass],
        },
        BiomeSettings {
            biome: BiomeType::Desert,
            layers: layers(&[(Sand, 4)]),
            foliage_rules: vec![FoliageRule {
                kind: FoliageKind::Cactus,
                spawn_chance: 0.01,
                min_height: 1,
                max_height: 4,
                variant_chance: 0.0,
                allowed_surface_blocks: vec![Sand],
            }],
            surface_grass_chance: 0.0,
            grass_spawnable_on: Vec::new(),
        },
        BiomeSettings {
            biome: BiomeType::Tundra,
            layers: layers(&[(Snow, 1), (Dirt, 3)]),
            foliage_rules: Vec::new(),
            surface_grass_chance: 0.0,
            grass_spawnable_on: Vec::new(),
        },
        BiomeSettings {
            biome: BiomeType::Ice,
            layers: layers(&[(Snow, 1), (Ice, 2)]),
            foliage_rules: Vec::new(),
            surface_grass_chance: 0.0,
            grass_spawnable_on: Vec::new(),
        },
    ]
}
