//! Error types for terrain generation.
//!
//! Configuration errors abort the whole region. Degenerate geometry is not an
//! error: it is clamped in [`crate::config`] and reported as a warning.

use thiserror::Error;

/// Maximum number of biomes a packed influence field can address.
pub const MAX_BIOMES: usize = 8;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("biome set has {count} entries, the packed field holds at most {}", MAX_BIOMES)]
    TooManyBiomes { count: usize },

    #[error("biome index {index} does not fit the packed field (valid: 0..{})", MAX_BIOMES)]
    BiomeIndexOutOfRange { index: usize },

    #[error("biome index {index} is declared more than once")]
    DuplicateBiomeIndex { index: u8 },

    #[error("biome set is empty")]
    EmptyBiomeSet,

    #[error("influence field references biome {index} which has no descriptor")]
    UnknownBiome { index: u8 },

    #[error("bitmap holds {actual} bytes, expected {expected} for resolution {resolution}")]
    FieldSizeMismatch {
        resolution: usize,
        expected: usize,
        actual: usize,
    },

    #[error("influence field has zero resolution")]
    EmptyField,

    #[error("generation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TerrainError>;

impl TerrainError {
    /// True for errors caused by the biome set or influence data, as opposed to
    /// I/O or cancellation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TerrainError::TooManyBiomes { .. }
                | TerrainError::BiomeIndexOutOfRange { .. }
                | TerrainError::DuplicateBiomeIndex { .. }
                | TerrainError::EmptyBiomeSet
                | TerrainError::UnknownBiome { .. }
                | TerrainError::FieldSizeMismatch { .. }
                | TerrainError::EmptyField
        )
    }
}
