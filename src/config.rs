//! Generator configuration.
//!
//! Loaded from JSON with every field optional. Geometry that cannot produce a
//! sensible field (zero spacing, a region smaller than one cell, a blend band
//! of zero width) is clamped by [`GeneratorConfig::sanitize`] and logged,
//! never rejected: generation must keep going in an interactive session.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::biomes::BiomeDef;
use crate::error::Result;
use crate::gradient::ResponseCurve;

/// Smallest blend band width accepted, as a fraction of the lattice spacing.
pub const MIN_OVERLAP_FRACTION: f64 = 1e-3;

/// How lattice coordinates relate to world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Lattice anchored at the world origin. Adjacent regions share cells
    /// and tile without seams.
    #[default]
    Absolute,
    /// Lattice anchored at each region's origin. Every region is a
    /// self-contained map; use for single-region previews.
    Local,
}

/// Which biome capabilities feed the mesh height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceLayer {
    /// Detail noise only
    #[default]
    Detail,
    /// Coarse height plus detail noise
    HeightAndDetail,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Master seed; same seed, same terrain
    pub seed: u64,
    /// Lattice cell width in world units
    pub lattice_spacing: f64,
    /// Influence samples per lattice cell, per axis
    pub samples_per_cell: usize,
    /// Half-width of the blend band around biome boundaries, world units
    pub max_overlap_distance: f64,
    /// Jitter as a fraction of the spacing (0.0-1.0)
    pub jitter: f64,
    pub coordinate_space: CoordinateSpace,
    /// Extra cached lattice cells on each side of a region
    pub border_cells: usize,
    /// Boundary-distance response used while blending
    pub blend_curve: ResponseCurve,
    /// Weight response used while building the mesh
    pub mesh_curve: ResponseCurve,
    /// Mesh quads per axis; `None` uses one quad per world unit
    pub mesh_resolution: Option<usize>,
    pub surface: SurfaceLayer,
    /// Also add the base biome's remainder weight to mesh heights
    pub include_base_biome: bool,
    pub biomes: Vec<BiomeDef>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            lattice_spacing: 32.0,
            samples_per_cell: 8,
            max_overlap_distance: 6.0,
            jitter: 0.5,
            coordinate_space: CoordinateSpace::Absolute,
            border_cells: 1,
            blend_curve: ResponseCurve::falloff(),
            mesh_curve: ResponseCurve::identity(),
            mesh_resolution: None,
            surface: SurfaceLayer::Detail,
            include_base_biome: false,
            biomes: BiomeDef::defaults(),
        }
    }
}

/// A geometry parameter that had to be clamped.
#[derive(Clone, Debug, PartialEq)]
pub enum DegenerateGeometry {
    LatticeSpacing { given: f64, used: f64 },
    SamplesPerCell { used: usize },
    OverlapDistance { given: f64, used: f64 },
    Jitter { given: f64, used: f64 },
    RegionSize { given: f64, used: f64 },
    MeshResolution { used: usize },
}

impl std::fmt::Display for DegenerateGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LatticeSpacing { given, used } => {
                write!(f, "lattice spacing {} is not positive, using {}", given, used)
            }
            Self::SamplesPerCell { used } => write!(f, "samples per cell was 0, using {}", used),
            Self::OverlapDistance { given, used } => {
                write!(f, "max overlap distance {} is not positive, using {}", given, used)
            }
            Self::Jitter { given, used } => write!(f, "jitter {} outside 0-1, using {}", given, used),
            Self::RegionSize { given, used } => {
                write!(f, "region size {} is not a finite size of at least one cell, using {}", given, used)
            }
            Self::MeshResolution { used } => write!(f, "mesh resolution was 0, using {}", used),
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Clamp degenerate geometry to the nearest usable value. Each
    /// adjustment is logged and returned.
    pub fn sanitize(&mut self) -> Vec<DegenerateGeometry> {
        let mut fixes = Vec::new();

        if !(self.lattice_spacing > 0.0) || !self.lattice_spacing.is_finite() {
            fixes.push(DegenerateGeometry::LatticeSpacing {
                given: self.lattice_spacing,
                used: 1.0,
            });
            self.lattice_spacing = 1.0;
        }

        if self.samples_per_cell == 0 {
            self.samples_per_cell = 1;
            fixes.push(DegenerateGeometry::SamplesPerCell { used: 1 });
        }

        if !(self.max_overlap_distance > 0.0) {
            let used = self.lattice_spacing * MIN_OVERLAP_FRACTION;
            fixes.push(DegenerateGeometry::OverlapDistance {
                given: self.max_overlap_distance,
                used,
            });
            self.max_overlap_distance = used;
        }

        if !(0.0..=1.0).contains(&self.jitter) {
            let used = if self.jitter.is_nan() { 0.0 } else { self.jitter.clamp(0.0, 1.0) };
            fixes.push(DegenerateGeometry::Jitter {
                given: self.jitter,
                used,
            });
            self.jitter = used;
        }

        if self.mesh_resolution == Some(0) {
            self.mesh_resolution = Some(1);
            fixes.push(DegenerateGeometry::MeshResolution { used: 1 });
        }

        for fix in &fixes {
            log::warn!("degenerate geometry: {}", fix);
        }
        fixes
    }

    /// Region size clamped to at least one lattice cell. Infinite and NaN
    /// sizes fall back to one cell as well.
    pub fn clamp_region_size(&self, size: f64) -> (f64, Option<DegenerateGeometry>) {
        if size.is_finite() && size >= self.lattice_spacing {
            return (size, None);
        }
        let fix = DegenerateGeometry::RegionSize {
            given: size,
            used: self.lattice_spacing,
        };
        log::warn!("degenerate geometry: {}", fix);
        (self.lattice_spacing, Some(fix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_no_fixes() {
        let mut config = GeneratorConfig::default();
        assert!(config.sanitize().is_empty());
    }

    #[test]
    fn test_sanitize_clamps_degenerate_values() {
        let mut config = GeneratorConfig {
            lattice_spacing: 0.0,
            samples_per_cell: 0,
            max_overlap_distance: -2.0,
            jitter: 1.5,
            ..Default::default()
        };
        let fixes = config.sanitize();
        assert_eq!(fixes.len(), 4);
        assert_eq!(config.lattice_spacing, 1.0);
        assert_eq!(config.samples_per_cell, 1);
        assert!(config.max_overlap_distance > 0.0);
        assert_eq!(config.jitter, 1.0);
    }

    #[test]
    fn test_region_smaller_than_cell_is_widened() {
        let config = GeneratorConfig::default();
        let (size, fix) = config.clamp_region_size(4.0);
        assert_eq!(size, config.lattice_spacing);
        assert!(matches!(fix, Some(DegenerateGeometry::RegionSize { .. })));
        assert_eq!(config.clamp_region_size(64.0), (64.0, None));
    }

    #[test]
    fn test_non_finite_region_size_is_clamped() {
        let config = GeneratorConfig::default();
        for given in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let (size, fix) = config.clamp_region_size(given);
            assert_eq!(size, config.lattice_spacing);
            assert!(matches!(fix, Some(DegenerateGeometry::RegionSize { .. })));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GeneratorConfig = serde_json::from_str(
            r#"{"seed": 7, "coordinate_space": "local", "blend_curve": {"kind": "linear", "from": 1.0, "to": 0.2}}"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.coordinate_space, CoordinateSpace::Local);
        assert_eq!(config.lattice_spacing, GeneratorConfig::default().lattice_spacing);
        assert_eq!(config.biomes.len(), 3);
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let path = std::env::temp_dir().join("biome_terrain_config_test.json");
        let config = GeneratorConfig {
            seed: 1234,
            mesh_resolution: Some(16),
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = GeneratorConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
