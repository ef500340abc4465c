//! # Generation Module
//!
//! Everything that turns coordinates into terrain: the noise stack, the
//! reshaping splines, biome classification and the biome table, the column
//! generator, and the foliage decorator.

pub mod biome;
pub mod foliage;
pub mod noise_stack;
pub mod spline;
pub mod terrain;

pub use terrain::{TerrainGenerator, TerrainSettings};
