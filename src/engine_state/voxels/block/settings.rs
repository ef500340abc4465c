//! # Block Settings
//!
//! Per-block rendering and physics properties, kept in a registry indexed by
//! block type. The registry is data-driven: a JSON table can replace or
//! extend the compiled-in defaults, the same way the original data tables
//! drove block behavior, so adding a block variant is a data change rather
//! than a code change.

use serde::Deserialize;

use super::block_type::{BlockType, BLOCK_TYPE_COUNT};

/// Which mesh section a block's faces are emitted into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialClass {
    /// Fully opaque geometry.
    Opaque,
    /// Translucent fluid geometry, rendered in its own pass.
    Water,
    /// Alpha-masked geometry such as leaves and cross-plane grass.
    Masked,
}

/// How a block is turned into geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// A standard cube with per-face culling.
    Cube,
    /// Two intersecting vertical quads (plants).
    CrossPlanes,
}

/// Texture atlas indices for the three distinct face groups of a cube.
#[derive(Copy, Clone, Debug, Default, Deserialize)]
pub struct FaceTextures {
    /// Texture for the top (+Z) face.
    #[serde(default)]
    pub top: u32,
    /// Texture for the bottom (-Z) face.
    #[serde(default)]
    pub bottom: u32,
    /// Texture for the four lateral faces.
    #[serde(default)]
    pub side: u32,
}

fn default_true() -> bool {
    true
}
fn default_scale() -> f32 {
    1.0
}
fn default_variants() -> u32 {
    1
}
fn default_material() -> MaterialClass {
    MaterialClass::Opaque
}
fn default_render_mode() -> RenderMode {
    RenderMode::Cube
}

/// The full property sheet for one block type.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockSettings {
    /// The block this row describes.
    pub block: BlockType,
    /// Whether the block occupies space for collision and occlusion.
    #[serde(default = "default_true")]
    pub solid: bool,
    /// Whether neighbors behind this block still render their faces.
    #[serde(default)]
    pub transparent: bool,
    /// Mesh section this block's geometry belongs to.
    #[serde(default = "default_material")]
    pub material: MaterialClass,
    /// Geometry style.
    #[serde(default = "default_render_mode")]
    pub render_mode: RenderMode,
    /// Horizontal scale for cross-plane geometry.
    #[serde(default = "default_scale")]
    pub render_scale: f32,
    /// Vertical scale for cross-plane geometry.
    #[serde(default = "default_scale")]
    pub render_height: f32,
    /// Whether cross planes get a per-block random yaw.
    #[serde(default)]
    pub random_rotation: bool,
    /// Number of texture variants to pick from per block instance.
    #[serde(default = "default_variants")]
    pub texture_variants: u32,
    /// Per-face texture indices.
    #[serde(default)]
    pub textures: FaceTextures,
}

impl BlockSettings {
    fn air() -> Self {
        BlockSettings {
            block: BlockType::Air,
            solid: false,
            transparent: true,
            material: MaterialClass::Opaque,
            render_mode: RenderMode::Cube,
            render_scale: 1.0,
            render_height: 1.0,
            random_rotation: false,
            texture_variants: 1,
            textures: FaceTextures::default(),
        }
    }

    fn cube(block: BlockType, top: u32, bottom: u32, side: u32) -> Self {
        BlockSettings {
            block,
            solid: true,
            transparent: false,
            material: MaterialClass::Opaque,
            render_mode: RenderMode::Cube,
            render_scale: 1.0,
            render_height: 1.0,
            random_rotation: false,
            texture_variants: 1,
            textures: FaceTextures { top, bottom, side },
        }
    }

    /// Texture index for a face pointing along `normal_z` (z component of the
    /// face normal; lateral faces pass zero).
    pub fn texture_for_normal(&self, normal_z: f32) -> u32 {
        if normal_z > 0.5 {
            self.textures.top
        } else if normal_z < -0.5 {
            self.textures.bottom
        } else {
            self.textures.side
        }
    }
}

/// Registry of block settings, indexed by block type for O(1) lookup on the
/// meshing hot path.
pub struct BlockRegistry {
    settings: Vec<BlockSettings>,
}

impl BlockRegistry {
    /// Builds the registry with the compiled-in defaults for every block.
    pub fn with_defaults() -> Self {
        let mut registry = BlockRegistry {
            settings: (0..BLOCK_TYPE_COUNT)
                .map(|i| {
                    let mut row = BlockSettings::air();
                    row.block = BlockType::from_int(i as u8);
                    row
                })
                .collect(),
        };

        for row in default_rows() {
            registry.insert(row);
        }

        registry
    }

    /// Builds the registry from defaults plus a JSON array of override rows.
    ///
    /// Rows only need to mention the fields they change from the serde
    /// defaults; unmentioned blocks keep their compiled-in settings.
    pub fn with_overrides(json: &str) -> Result<Self, serde_json::Error> {
        let mut registry = Self::with_defaults();
        let rows: Vec<BlockSettings> = serde_json::from_str(json)?;
        for row in rows {
            registry.insert(row);
        }
        Ok(registry)
    }

    fn insert(&mut self, row: BlockSettings) {
        let index = row.block.to_int() as usize;
        self.settings[index] = row;
    }

    /// The property sheet for a block type.
    pub fn get(&self, block: BlockType) -> &BlockSettings {
        &self.settings[block.to_int() as usize]
    }

    /// Whether the block occupies space. Air is never solid.
    pub fn is_solid(&self, block: BlockType) -> bool {
        self.get(block).solid
    }

    /// Whether a face against this block should still be rendered: true for
    /// air, non-solid blocks and transparent blocks.
    pub fn is_face_visible_against(&self, block: BlockType) -> bool {
        if block == BlockType::Air {
            return true;
        }
        let settings = self.get(block);
        !settings.solid || settings.transparent
    }
}

fn default_rows() -> Vec<BlockSettings> {
    let mut rows = vec![
        BlockSettings::air(),
        BlockSettings::cube(BlockType::Grass, 3, 1, 2),
        BlockSettings::cube(BlockType::Dirt, 1, 1, 1),
        BlockSettings::cube(BlockType::Stone, 0, 0, 0),
        BlockSettings::cube(BlockType::Sand, 4, 4, 4),
        BlockSettings::cube(BlockType::Snow, 5, 1, 6),
        BlockSettings::cube(BlockType::OakLog, 8, 8, 7),
        BlockSettings::cube(BlockType::BirchLog, 10, 10, 9),
        BlockSettings::cube(BlockType::Cactus, 13, 13, 12),
    ];

    let mut ice = BlockSettings::cube(BlockType::Ice, 14, 14, 14);
    ice.transparent = true;
    rows.push(ice);

    let mut water = BlockSettings::cube(BlockType::Water, 15, 15, 15);
    water.solid = false;
    water.transparent = true;
    water.material = MaterialClass::Water;
    rows.push(water);

    let mut oak_leaves = BlockSettings::cube(BlockType::OakLeaves, 16, 16, 16);
    oak_leaves.transparent = true;
    oak_leaves.material = MaterialClass::Masked;
    rows.push(oak_leaves);

    let mut birch_leaves = BlockSettings::cube(BlockType::BirchLeaves, 17, 17, 17);
    birch_leaves.transparent = true;
    birch_leaves.material = MaterialClass::Masked;
    rows.push(birch_leaves);

    let mut tall_grass = BlockSettings::air();
    tall_grass.block = BlockType::TallGrass;
    tall_grass.material = MaterialClass::Masked;
    tall_grass.render_mode = RenderMode::CrossPlanes;
    tall_grass.render_scale = 0.9;
    tall_grass.render_height = 0.8;
    tall_grass.random_rotation = true;
    tall_grass.texture_variants = 3;
    tall_grass.textures = FaceTextures {
        top: 18,
        bottom: 18,
        side: 18,
    };
    rows.push(tall_grass);

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_block() {
        let registry = BlockRegistry::with_defaults();
        assert!(!registry.is_solid(BlockType::Air));
        assert!(registry.is_solid(BlockType::Stone));
        assert!(!registry.is_solid(BlockType::Water));
        assert_eq!(registry.get(BlockType::Water).material, MaterialClass::Water);
        assert_eq!(
            registry.get(BlockType::TallGrass).render_mode,
            RenderMode::CrossPlanes
        );
    }

    #[test]
    fn face_visibility_rules() {
        let registry = BlockRegistry::with_defaults();
        // Faces against air, fluids and masked blocks render; faces against
        // opaque rock do not.
        assert!(registry.is_face_visible_against(BlockType::Air));
        assert!(registry.is_face_visible_against(BlockType::Water));
        assert!(registry.is_face_visible_against(BlockType::OakLeaves));
        assert!(!registry.is_face_visible_against(BlockType::Stone));
    }

    #[test]
    fn json_rows_override_defaults() {
        let registry = BlockRegistry::with_overrides(
            r#"[{ "block": "stone", "textures": { "top": 40, "bottom": 40, "side": 40 } }]"#,
        )
        .unwrap();
        assert_eq!(registry.get(BlockType::Stone).textures.top, 40);
        // Other rows untouched.
        assert_eq!(registry.get(BlockType::Dirt).textures.top, 1);
    }

    #[test]
    fn grass_uses_distinct_face_textures() {
        let registry = BlockRegistry::with_defaults();
        let grass = registry.get(BlockType::Grass);
        assert_eq!(grass.texture_for_normal(1.0), 3);
        assert_eq!(grass.texture_for_normal(-1.0), 1);
        assert_eq!(grass.texture_for_normal(0.0), 2);
    }
}
