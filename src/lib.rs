//! Biome terrain library
//!
//! Seeded biome influence fields packed into two RGBA8 bitmaps, and the
//! height-field meshes built from them. Adjacent regions generated from the
//! same seed tile without seams.

pub mod ascii;
pub mod biomes;
pub mod config;
pub mod error;
pub mod export;
pub mod field;
pub mod gradient;
pub mod influence;
pub mod lattice;
pub mod mesh;
pub mod rasterize;
pub mod region;
pub mod seeds;
pub mod tilemap;

pub use config::GeneratorConfig;
pub use error::{Result, TerrainError};
pub use field::PackedInfluenceField;
pub use region::{RegionOutput, RegionRequest, TerrainGenerator};
