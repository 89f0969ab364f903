//! Influence field rasterization.
//!
//! Resolves biome influences at every sample point of a square region and
//! packs them into a [`PackedInfluenceField`]. Sample points are independent,
//! so rows are processed in parallel with rayon, each row writing only its
//! own slice of the two bitmaps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::config::{CoordinateSpace, GeneratorConfig};
use crate::error::{Result, TerrainError};
use crate::field::{encode_pixel, PackedInfluenceField, CHANNELS};
use crate::gradient::BakedGradient;
use crate::influence::{resolve, Resolution};
use crate::lattice::{Lattice, LatticeSampler, WorldPos};

/// Sample points per axis for a region of `size` world units. Sizes that do
/// not make a finite, positive cell count get one cell.
pub fn field_resolution(size: f64, spacing: f64, samples_per_cell: usize) -> usize {
    let cells = (size / spacing).ceil();
    let cells = if cells.is_finite() && cells >= 1.0 { cells as usize } else { 1 };
    cells.saturating_mul(samples_per_cell.max(1))
}

/// World position of sample `(x, y)`.
#[inline]
pub fn sample_position(origin: WorldPos, size: f64, resolution: usize, x: usize, y: usize) -> WorldPos {
    let step = size / resolution as f64;
    origin.offset(x as f64 * step, y as f64 * step)
}

/// Everything needed to rasterize regions of one generation session.
#[derive(Clone, Debug)]
pub struct InfluenceRasterizer {
    seed: u64,
    spacing: f64,
    jitter: f64,
    space: CoordinateSpace,
    border: usize,
    samples_per_cell: usize,
    max_overlap: f64,
    biomes: Vec<u8>,
    gradient: BakedGradient,
}

/// A rasterized region: the packed field plus the lattice it was built from.
#[derive(Clone, Debug)]
pub struct RasterOutput {
    pub origin: WorldPos,
    pub size: f64,
    pub field: PackedInfluenceField,
    pub lattice: Lattice,
}

impl InfluenceRasterizer {
    /// `lattice_seed` drives jitter and biome assignment; `biomes` are the
    /// stable indices lattice cells pick from. Expects a sanitized config.
    pub fn new(config: &GeneratorConfig, lattice_seed: u64, biomes: Vec<u8>) -> Self {
        Self {
            seed: lattice_seed,
            spacing: config.lattice_spacing,
            jitter: config.jitter,
            space: config.coordinate_space,
            border: config.border_cells,
            samples_per_cell: config.samples_per_cell,
            max_overlap: config.max_overlap_distance,
            biomes,
            gradient: BakedGradient::bake(&config.blend_curve),
        }
    }

    pub fn gradient(&self) -> &BakedGradient {
        &self.gradient
    }

    pub fn resolution(&self, size: f64) -> usize {
        field_resolution(size, self.spacing, self.samples_per_cell)
    }

    /// Lattice sampler for a region at `origin`.
    pub fn sampler(&self, origin: WorldPos) -> Result<LatticeSampler> {
        let anchor = match self.space {
            CoordinateSpace::Absolute => WorldPos::default(),
            CoordinateSpace::Local => origin,
        };
        LatticeSampler::new(self.seed, self.spacing, self.jitter, anchor, self.biomes.clone())
    }

    /// Cells for the region plus its border.
    pub fn lattice(&self, origin: WorldPos, size: f64) -> Result<Lattice> {
        Ok(Lattice::build(self.sampler(origin)?, origin, size, self.border))
    }

    /// Resolve a single world position against a region's lattice.
    pub fn resolve_at(&self, lattice: &Lattice, pos: WorldPos) -> Resolution {
        resolve(pos, lattice, &self.gradient, self.max_overlap)
    }

    pub fn rasterize(&self, origin: WorldPos, size: f64) -> Result<RasterOutput> {
        self.rasterize_with_cancel(origin, size, &AtomicBool::new(false))
    }

    /// Rasterize, checking `cancel` before every row. A raised flag aborts
    /// with [`TerrainError::Cancelled`] and no output.
    pub fn rasterize_with_cancel(&self, origin: WorldPos, size: f64, cancel: &AtomicBool) -> Result<RasterOutput> {
        let start = Instant::now();
        let lattice = self.lattice(origin, size)?;
        let resolution = self.resolution(size);
        let mut field = PackedInfluenceField::empty(resolution);
        let row_bytes = resolution * CHANNELS;

        {
            let (primary, secondary) = field.bitmaps_mut();
            primary
                .par_chunks_mut(row_bytes)
                .zip(secondary.par_chunks_mut(row_bytes))
                .enumerate()
                .try_for_each(|(y, (primary_row, secondary_row))| {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(TerrainError::Cancelled);
                    }
                    for x in 0..resolution {
                        let pos = sample_position(origin, size, resolution, x, y);
                        let resolved = self.resolve_at(&lattice, pos);
                        let px = x * CHANNELS..(x + 1) * CHANNELS;
                        encode_pixel(&resolved.weights, &mut primary_row[px.clone()], &mut secondary_row[px])?;
                    }
                    Ok(())
                })?;
        }

        log::debug!(
            "rasterized {}x{} influence field at ({:.1}, {:.1}) in {:.2}ms",
            resolution,
            resolution,
            origin.x,
            origin.y,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(RasterOutput {
            origin,
            size,
            field,
            lattice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{dequantize, remainder};
    use crate::lattice::CellSource;

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            lattice_spacing: 10.0,
            samples_per_cell: 4,
            max_overlap_distance: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolution_rounds_up_to_whole_cells() {
        assert_eq!(field_resolution(40.0, 10.0, 4), 16);
        assert_eq!(field_resolution(41.0, 10.0, 4), 20);
        assert_eq!(field_resolution(3.0, 10.0, 2), 2);
    }

    #[test]
    fn test_non_finite_size_gets_one_cell() {
        assert_eq!(field_resolution(f64::INFINITY, 10.0, 4), 4);
        assert_eq!(field_resolution(f64::NAN, 10.0, 4), 4);
        assert_eq!(field_resolution(40.0, 0.0, 4), 4);
        let rasterizer = InfluenceRasterizer::new(&config(), 1, vec![0, 1]);
        assert_eq!(rasterizer.resolution(f64::INFINITY), 4);
    }

    #[test]
    fn test_sample_position_steps_evenly() {
        let origin = WorldPos::new(100.0, -20.0);
        assert_eq!(sample_position(origin, 40.0, 16, 0, 0), origin);
        assert_eq!(sample_position(origin, 40.0, 16, 4, 8), WorldPos::new(110.0, 0.0));
    }

    #[test]
    fn test_packed_field_matches_resolver() {
        let rasterizer = InfluenceRasterizer::new(&config(), 42, vec![0, 1, 2, 5]);
        let origin = WorldPos::new(0.0, 0.0);
        let out = rasterizer.rasterize(origin, 40.0).unwrap();
        let res = out.field.resolution();
        assert_eq!(res, 16);

        for y in 0..res {
            for x in 0..res {
                let pos = sample_position(origin, 40.0, res, x, y);
                let resolved = rasterizer.resolve_at(&out.lattice, pos);
                for biome in 1..8u8 {
                    let expected = resolved.weight_of(biome);
                    let decoded = dequantize(out.field.stored(x, y, biome));
                    assert!((expected - decoded).abs() <= 1.0 / 255.0);
                }
                let base = remainder(&out.field.sample_pixel(x, y));
                assert!((base - resolved.weight_of(0)).abs() <= 8.0 / 255.0);
            }
        }
    }

    #[test]
    fn test_base_biome_only_leaves_bitmaps_empty() {
        let rasterizer = InfluenceRasterizer::new(&config(), 42, vec![0]);
        let out = rasterizer.rasterize(WorldPos::new(-15.0, 30.0), 20.0).unwrap();
        let (primary, secondary) = out.field.into_raw();
        assert!(primary.iter().all(|&b| b == 0));
        assert!(secondary.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rasterize_is_repeatable() {
        let rasterizer = InfluenceRasterizer::new(&config(), 9, vec![0, 1, 2]);
        let a = rasterizer.rasterize(WorldPos::new(5.0, 5.0), 30.0).unwrap();
        let b = rasterizer.rasterize(WorldPos::new(5.0, 5.0), 30.0).unwrap();
        assert_eq!(a.field, b.field);
    }

    #[test]
    fn test_cancel_flag_aborts() {
        let rasterizer = InfluenceRasterizer::new(&config(), 1, vec![0, 1]);
        let cancel = AtomicBool::new(true);
        let result = rasterizer.rasterize_with_cancel(WorldPos::default(), 40.0, &cancel);
        assert!(matches!(result, Err(TerrainError::Cancelled)));
    }

    #[test]
    fn test_local_space_anchors_at_origin() {
        let local = GeneratorConfig {
            coordinate_space: CoordinateSpace::Local,
            ..config()
        };
        let rasterizer = InfluenceRasterizer::new(&local, 3, vec![0, 1, 2]);
        let a = rasterizer.rasterize(WorldPos::new(0.0, 0.0), 20.0).unwrap();
        let b = rasterizer.rasterize(WorldPos::new(500.0, 500.0), 20.0).unwrap();
        // Same local lattice, so the same field up to float rounding
        let (pa, sa) = a.field.into_raw();
        let (pb, sb) = b.field.into_raw();
        for (x, y) in pa.iter().chain(&sa).zip(pb.iter().chain(&sb)) {
            assert!(x.abs_diff(*y) <= 1);
        }
        assert_eq!(b.lattice.anchor(), WorldPos::new(500.0, 500.0));
    }

    #[test]
    fn test_bad_biome_index_fails_fast() {
        let rasterizer = InfluenceRasterizer::new(&config(), 1, vec![0, 8]);
        assert!(matches!(
            rasterizer.rasterize(WorldPos::default(), 20.0),
            Err(TerrainError::BiomeIndexOutOfRange { index: 8 })
        ));
    }
}
