//! # Block Type Module
//!
//! Every block the generator can place. Block types are stored as compact
//! `u8` values inside chunk columns; the rich enum is recovered through
//! `FromPrimitive` when block properties are needed.

use std::fmt;
use std::str::FromStr;

use num_derive::FromPrimitive;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use super::BlockTypeSize;

/// Enumerates all block types the terrain and foliage generators emit.
///
/// `FromPrimitive` allows conversion from the compact integer representation
/// used in column storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Empty space. Never stored in the non-air block tables.
    Air,
    /// Grassy surface block, the default grassland topsoil.
    Grass,
    /// Topsoil below grass and under forests.
    Dirt,
    /// Base rock filling everything below the surface layers.
    Stone,
    /// Desert and beach surface material.
    Sand,
    /// Surface cover in the cold biomes.
    Snow,
    /// Frozen water surface in the ice biome.
    Ice,
    /// Fluid fill below the water level. Not solid, rendered translucent.
    Water,
    /// Oak trunk block.
    OakLog,
    /// Oak canopy block, rendered masked.
    OakLeaves,
    /// Birch trunk block.
    BirchLog,
    /// Birch canopy block, rendered masked.
    BirchLeaves,
    /// Cactus trunk and arm block.
    Cactus,
    /// Decorative surface grass, rendered as cross planes.
    TallGrass,
}

/// Number of distinct block types, for sizing lookup tables.
pub const BLOCK_TYPE_COUNT: usize = 14;

/// Static name table used when parsing block references out of the JSON
/// block and biome tables.
static BLOCK_NAMES: phf::Map<&'static str, BlockType> = phf::phf_map! {
    "air" => BlockType::Air,
    "grass" => BlockType::Grass,
    "dirt" => BlockType::Dirt,
    "stone" => BlockType::Stone,
    "sand" => BlockType::Sand,
    "snow" => BlockType::Snow,
    "ice" => BlockType::Ice,
    "water" => BlockType::Water,
    "oak_log" => BlockType::OakLog,
    "oak_leaves" => BlockType::OakLeaves,
    "birch_log" => BlockType::BirchLog,
    "birch_leaves" => BlockType::BirchLeaves,
    "cactus" => BlockType::Cactus,
    "tall_grass" => BlockType::TallGrass,
};

impl BlockType {
    /// Converts the compact storage representation back to a `BlockType`.
    ///
    /// # Panics
    /// Panics if the value does not correspond to a valid block type, which
    /// would mean column storage has been corrupted.
    pub fn from_int(btype: BlockTypeSize) -> Self {
        let btype_option = num::FromPrimitive::from_u8(btype);
        btype_option.unwrap()
    }

    /// The compact storage representation of this block type.
    pub fn to_int(self) -> BlockTypeSize {
        self as BlockTypeSize
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BLOCK_NAMES
            .get(s)
            .copied()
            .ok_or_else(|| format!("unknown block type: {:?}", s))
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BlockTypeVisitor;

        impl<'de> Visitor<'de> for BlockTypeVisitor {
            type Value = BlockType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a snake_case block name")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<BlockType, E> {
                BlockType::from_str(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(BlockTypeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trip() {
        for i in 0..BLOCK_TYPE_COUNT {
            let block = BlockType::from_int(i as BlockTypeSize);
            assert_eq!(block.to_int() as usize, i);
        }
    }

    #[test]
    fn names_parse() {
        assert_eq!("oak_leaves".parse::<BlockType>(), Ok(BlockType::OakLeaves));
        assert!("granite".parse::<BlockType>().is_err());
    }

    #[test]
    fn deserializes_from_json_strings() {
        let blocks: Vec<BlockType> =
            serde_json::from_str(r#"["air", "water", "tall_grass"]"#).unwrap();
        assert_eq!(
            blocks,
            vec![BlockType::Air, BlockType::Water, BlockType::TallGrass]
        );
    }
}
