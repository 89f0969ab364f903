//! Height-field mesh synthesis.
//!
//! Builds a uniform `(res + 1) x (res + 1)` vertex grid over a region. Each
//! vertex reads the packed influence field at its UV, remaps every weight
//! through the mesh response curve and sums the biomes' surface functions at
//! its world position.
//!
//! The field covers `[origin, origin + size)`, so the last vertex row and
//! column lie on the next region's first samples. [`MeshSynthesizer::synthesize_seamless`]
//! resolves those vertices at exactly the points the neighbour stores, which
//! makes adjacent meshes agree along their shared edge.

use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

use crate::biomes::{Biome, BiomeSet};
use crate::config::{GeneratorConfig, SurfaceLayer};
use crate::error::{Result, TerrainError};
use crate::field::{remainder, requantize, PackedInfluenceField, BASE_BIOME};
use crate::gradient::{BakedGradient, ResponseCurve};
use crate::influence::BiomeWeight;
use crate::lattice::WorldPos;
use crate::rasterize::sample_position;
use crate::tilemap::Tilemap;

/// Interleaved vertex as uploaded to a GPU: position then UV.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Region-local position; x and z span `0..size`, y is the height
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle mesh for one region. Normals are left to the consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainMesh {
    /// Quads per axis
    pub resolution: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    /// Vertices per axis.
    pub fn stride(&self) -> usize {
        self.resolution + 1
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex heights as a grid, row `z`, column `x`.
    pub fn heightmap(&self) -> Tilemap<f32> {
        let n = self.stride();
        let heights = self.vertices.iter().map(|v| v.position[1]).collect();
        Tilemap::from_vec(n, n, heights).unwrap_or_else(|| Tilemap::new(n, n))
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Influences at an arbitrary world position, as the rasterizer resolves them.
pub type EdgeResolver<'a> = &'a (dyn Fn(WorldPos) -> Vec<BiomeWeight> + Sync);

/// World position of the sample a neighbouring region stores for a vertex on
/// the far edge. Its first column starts at `origin.x + size`, its first row
/// at `origin.y + size`.
fn far_edge_sample(
    field: &PackedInfluenceField,
    origin: WorldPos,
    size: f64,
    u: f32,
    v: f32,
    far_x: bool,
    far_z: bool,
) -> WorldPos {
    let (px, py) = field.pixel_at(u, v);
    let inner = sample_position(origin, size, field.resolution(), px, py);
    WorldPos::new(
        if far_x { origin.x + size } else { inner.x },
        if far_z { origin.y + size } else { inner.y },
    )
}

/// Two triangles per quad, vertex index `x + z * stride`.
pub fn grid_indices(resolution: usize) -> Vec<u32> {
    let n = resolution + 1;
    let mut indices = Vec::with_capacity(resolution * resolution * 6);
    for z in 0..resolution {
        for x in 0..resolution {
            let i = (x + z * n) as u32;
            let n = n as u32;
            indices.extend_from_slice(&[i, i + n, i + 1, i + 1, i + n, i + n + 1]);
        }
    }
    indices
}

#[derive(Clone, Debug)]
pub struct MeshSynthesizer {
    curve: BakedGradient,
    surface: SurfaceLayer,
    include_base: bool,
    resolution: Option<usize>,
}

impl MeshSynthesizer {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            curve: BakedGradient::bake(&config.mesh_curve),
            surface: config.surface,
            include_base: config.include_base_biome,
            resolution: config.mesh_resolution,
        }
    }

    /// Detail-only synthesizer with one quad per world unit.
    pub fn with_curve(curve: &ResponseCurve) -> Self {
        Self {
            curve: BakedGradient::bake(curve),
            surface: SurfaceLayer::Detail,
            include_base: false,
            resolution: None,
        }
    }

    /// Quads per axis for a region of `size` world units.
    pub fn grid_resolution(&self, size: f64) -> usize {
        self.resolution
            .unwrap_or_else(|| if size.is_finite() { size.round().max(1.0) as usize } else { 1 })
            .max(1)
    }

    fn surface_at(&self, biome: &Biome, pos: WorldPos) -> f32 {
        match self.surface {
            SurfaceLayer::Detail => biome.detail_at(pos.x, pos.y),
            SurfaceLayer::HeightAndDetail => biome.height_at(pos.x, pos.y) + biome.detail_at(pos.x, pos.y),
        }
    }

    /// Height at a UV coordinate of the field, `pos` being its world position.
    pub fn height_at(&self, biomes: &BiomeSet, field: &PackedInfluenceField, u: f32, v: f32, pos: WorldPos) -> Result<f32> {
        self.height_from(biomes, &field.sample(u, v), pos)
    }

    /// Height for decoded explicit influences at world position `pos`.
    pub fn height_from(&self, biomes: &BiomeSet, explicit: &[BiomeWeight], pos: WorldPos) -> Result<f32> {
        let mut height = 0.0;
        for w in explicit {
            let biome = biomes.require(w.biome)?;
            height += self.curve.lookup(w.weight) * self.surface_at(biome, pos);
        }

        if self.include_base {
            if let Some(base) = biomes.get(BASE_BIOME) {
                let weight = remainder(explicit);
                if weight > 0.0 {
                    height += self.curve.lookup(weight) * self.surface_at(base, pos);
                }
            }
        }

        Ok(height)
    }

    /// Build the mesh for the square region `origin .. origin + size` from
    /// the field alone. The far edge repeats the field's last samples.
    pub fn synthesize(
        &self,
        biomes: &BiomeSet,
        field: &PackedInfluenceField,
        origin: WorldPos,
        size: f64,
    ) -> Result<TerrainMesh> {
        self.build(biomes, field, origin, size, None)
    }

    /// Like [`Self::synthesize`], but far-edge vertices take their influences
    /// from `resolve` at the neighbouring region's sample points, quantized
    /// the way the neighbour's field stores them.
    pub fn synthesize_seamless(
        &self,
        biomes: &BiomeSet,
        field: &PackedInfluenceField,
        origin: WorldPos,
        size: f64,
        resolve: EdgeResolver<'_>,
    ) -> Result<TerrainMesh> {
        self.build(biomes, field, origin, size, Some(resolve))
    }

    fn build(
        &self,
        biomes: &BiomeSet,
        field: &PackedInfluenceField,
        origin: WorldPos,
        size: f64,
        edge: Option<EdgeResolver<'_>>,
    ) -> Result<TerrainMesh> {
        let start = Instant::now();
        let res = self.grid_resolution(size);
        let n = res + 1;
        let mut vertices = vec![Vertex::default(); n * n];

        vertices.par_chunks_mut(n).enumerate().try_for_each(|(z, row)| {
            let v = z as f32 / res as f32;
            for (x, vertex) in row.iter_mut().enumerate() {
                let u = x as f32 / res as f32;
                let local_x = u as f64 * size;
                let local_z = v as f64 * size;
                let pos = origin.offset(local_x, local_z);
                let (far_x, far_z) = (x == res, z == res);
                let height = match edge {
                    Some(resolve) if far_x || far_z => {
                        let sample = far_edge_sample(field, origin, size, u, v, far_x, far_z);
                        let explicit = requantize(&resolve(sample))?;
                        self.height_from(biomes, &explicit, pos)?
                    }
                    _ => self.height_at(biomes, field, u, v, pos)?,
                };
                *vertex = Vertex {
                    position: [local_x as f32, height, local_z as f32],
                    uv: [u, v],
                };
            }
            Ok::<(), TerrainError>(())
        })?;

        let mesh = TerrainMesh {
            resolution: res,
            vertices,
            indices: grid_indices(res),
        };

        log::debug!(
            "synthesized {} vertices, {} triangles in {:.2}ms",
            mesh.vertices.len(),
            mesh.triangle_count(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(mesh)
    }
}
