//! Region pipeline: seed + region bounds -> lattice -> packed influence field
//! -> mesh.
//!
//! A [`TerrainGenerator`] holds everything that is fixed for a session (the
//! sanitized config, derived seeds, biome set and baked curves) and turns
//! [`RegionRequest`]s into [`RegionOutput`]s. Requests are independent, so a
//! batch of them is generated in parallel.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::biomes::BiomeSet;
use crate::config::{DegenerateGeometry, GeneratorConfig};
use crate::error::{Result, TerrainError};
use crate::field::PackedInfluenceField;
use crate::lattice::{Lattice, WorldPos};
use crate::mesh::{MeshSynthesizer, TerrainMesh};
use crate::rasterize::{InfluenceRasterizer, RasterOutput};
use crate::seeds::WorldSeeds;

/// A square region of the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionRequest {
    pub origin: WorldPos,
    /// Side length in world units
    pub size: f64,
}

impl RegionRequest {
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        Self {
            origin: WorldPos::new(x, y),
            size,
        }
    }
}

/// Everything generated for one region.
#[derive(Clone, Debug)]
pub struct RegionOutput {
    /// The request as generated, size possibly widened to one cell
    pub request: RegionRequest,
    pub field: PackedInfluenceField,
    pub lattice: Lattice,
    pub mesh: TerrainMesh,
    /// Set when the requested size had to be widened
    pub size_fix: Option<DegenerateGeometry>,
}

/// `n x n` adjacent regions of `chunk_size`, row by row from `origin`.
pub fn chunk_grid(origin: WorldPos, chunk_size: f64, n: usize) -> Vec<RegionRequest> {
    let mut requests = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            requests.push(RegionRequest::new(
                origin.x + col as f64 * chunk_size,
                origin.y + row as f64 * chunk_size,
                chunk_size,
            ));
        }
    }
    requests
}

pub struct TerrainGenerator {
    config: GeneratorConfig,
    seeds: WorldSeeds,
    biomes: BiomeSet,
    rasterizer: InfluenceRasterizer,
    synthesizer: MeshSynthesizer,
    fixes: Vec<DegenerateGeometry>,
}

impl TerrainGenerator {
    /// Sanitize `config` and build the biome set it describes.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let seeds = WorldSeeds::from_master(config.seed);
        let biomes = BiomeSet::from_defs(&config.biomes, seeds.terrain)?;
        Ok(Self::with_biomes(config, biomes))
    }

    /// Use a biome set supplied by the caller instead of the config's
    /// noise definitions.
    pub fn with_biomes(mut config: GeneratorConfig, biomes: BiomeSet) -> Self {
        let fixes = config.sanitize();
        let seeds = WorldSeeds::from_master(config.seed);
        let rasterizer = InfluenceRasterizer::new(&config, seeds.lattice, biomes.indices());
        let synthesizer = MeshSynthesizer::new(&config);

        log::info!("terrain generator ready: {} biomes, {}", biomes.len(), seeds);

        Self {
            config,
            seeds,
            biomes,
            rasterizer,
            synthesizer,
            fixes,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn seeds(&self) -> WorldSeeds {
        self.seeds
    }

    pub fn biomes(&self) -> &BiomeSet {
        &self.biomes
    }

    pub fn rasterizer(&self) -> &InfluenceRasterizer {
        &self.rasterizer
    }

    pub fn synthesizer(&self) -> &MeshSynthesizer {
        &self.synthesizer
    }

    /// Adjustments `sanitize` made to the config.
    pub fn config_fixes(&self) -> &[DegenerateGeometry] {
        &self.fixes
    }

    fn clamp(&self, request: &RegionRequest) -> (RegionRequest, Option<DegenerateGeometry>) {
        let (size, fix) = self.config.clamp_region_size(request.size);
        (RegionRequest { size, ..*request }, fix)
    }

    /// Influence field only, without a mesh.
    pub fn influence_field(&self, request: &RegionRequest) -> Result<RasterOutput> {
        let (request, _) = self.clamp(request);
        self.rasterizer.rasterize(request.origin, request.size)
    }

    pub fn generate(&self, request: &RegionRequest) -> Result<RegionOutput> {
        self.generate_with_cancel(request, &AtomicBool::new(false))
    }

    /// Generate one region. A raised `cancel` flag stops rasterization at the
    /// next row and skips the mesh.
    ///
    /// The mesh's far edge is resolved against this region's lattice at the
    /// neighbouring region's first samples, so adjacent regions share edge
    /// heights.
    pub fn generate_with_cancel(&self, request: &RegionRequest, cancel: &AtomicBool) -> Result<RegionOutput> {
        let (request, size_fix) = self.clamp(request);
        let raster = self
            .rasterizer
            .rasterize_with_cancel(request.origin, request.size, cancel)?;
        if cancel.load(Ordering::Relaxed) {
            return Err(TerrainError::Cancelled);
        }
        let lattice = &raster.lattice;
        let resolve = |pos: WorldPos| self.rasterizer.resolve_at(lattice, pos).weights;
        let mesh = self.synthesizer.synthesize_seamless(
            &self.biomes,
            &raster.field,
            request.origin,
            request.size,
            &resolve,
        )?;

        log::info!(
            "region ({:.1}, {:.1}) size {:.1}: {}x{} field, {} vertices",
            request.origin.x,
            request.origin.y,
            request.size,
            raster.field.resolution(),
            raster.field.resolution(),
            mesh.vertices.len()
        );

        Ok(RegionOutput {
            request,
            field: raster.field,
            lattice: raster.lattice,
            mesh,
            size_fix,
        })
    }

    /// Generate a batch of regions in parallel. The first failing region
    /// aborts the batch.
    pub fn generate_many(&self, requests: &[RegionRequest]) -> Result<Vec<RegionOutput>> {
        requests.par_iter().map(|r| self.generate(r)).collect()
    }
}
