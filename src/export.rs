//! Image, mesh and metadata exports for generated regions.

use std::fs::File;
use std::io::{BufWriter, Write};

use image::{ImageBuffer, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::biomes::BiomeSet;
use crate::error::{Result, TerrainError};
use crate::field::{remainder, Bitmap, PackedInfluenceField, BASE_BIOME, CHANNELS};
use crate::mesh::TerrainMesh;
use crate::region::RegionOutput;
use crate::seeds::WorldSeeds;
use crate::tilemap::Tilemap;

/// Display color per biome index.
const BIOME_COLORS: [[u8; 3]; 8] = [
    [126, 170, 86],  // 0 plains green
    [168, 150, 92],  // 1 hills tan
    [120, 110, 100], // 2 mountains grey
    [214, 196, 130], // 3 sand
    [40, 110, 60],   // 4 forest
    [90, 120, 150],  // 5 wetland
    [200, 80, 60],   // 6 volcanic
    [235, 235, 240], // 7 snow
];

pub fn biome_color(biome: u8) -> [u8; 3] {
    BIOME_COLORS[biome as usize % BIOME_COLORS.len()]
}

// =============================================================================
// INFLUENCE BITMAPS
// =============================================================================

fn bitmap_image(field: &PackedInfluenceField, which: Bitmap) -> Result<RgbaImage> {
    let res = field.resolution();
    let bytes = field.bitmap(which).to_vec();
    let actual = bytes.len();
    RgbaImage::from_raw(res as u32, res as u32, bytes).ok_or(TerrainError::FieldSizeMismatch {
        resolution: res,
        expected: res * res * CHANNELS,
        actual,
    })
}

/// Write both bitmaps as RGBA8 PNGs, ready to bind as splat textures.
pub fn export_influence_bitmaps(field: &PackedInfluenceField, primary_path: &str, secondary_path: &str) -> Result<()> {
    bitmap_image(field, Bitmap::Primary)?.save(primary_path)?;
    bitmap_image(field, Bitmap::Secondary)?.save(secondary_path)?;
    Ok(())
}

/// Read back a field written by [`export_influence_bitmaps`].
pub fn load_influence_bitmaps(primary_path: &str, secondary_path: &str) -> Result<PackedInfluenceField> {
    let primary = image::open(primary_path)?.to_rgba8();
    let secondary = image::open(secondary_path)?.to_rgba8();
    let res = primary.width() as usize;
    if primary.height() as usize != res || secondary.dimensions() != primary.dimensions() {
        let expected = res * res * CHANNELS;
        return Err(TerrainError::FieldSizeMismatch {
            resolution: res,
            expected,
            actual: secondary.as_raw().len(),
        });
    }
    PackedInfluenceField::from_raw(res, primary.into_raw(), secondary.into_raw())
}

/// Dominant biome per sample as flat colors.
pub fn render_dominant_biomes(field: &PackedInfluenceField) -> RgbImage {
    let dominant = field.dominant_biomes();
    let mut img: RgbImage = ImageBuffer::new(dominant.width as u32, dominant.height as u32);
    for (x, y, &biome) in dominant.iter() {
        img.put_pixel(x as u32, y as u32, Rgb(biome_color(biome)));
    }
    img
}

/// Biome colors mixed by weight, base biome included. Shows the blend bands.
pub fn render_blend_map(field: &PackedInfluenceField) -> RgbImage {
    let res = field.resolution();
    let mut img: RgbImage = ImageBuffer::new(res as u32, res as u32);
    for y in 0..res {
        for x in 0..res {
            let explicit = field.sample_pixel(x, y);
            let base = remainder(&explicit);
            let mut rgb = biome_color(BASE_BIOME).map(|c| c as f32 * base);
            for w in &explicit {
                let color = biome_color(w.biome);
                for i in 0..3 {
                    rgb[i] += color[i] as f32 * w.weight;
                }
            }
            img.put_pixel(x as u32, y as u32, Rgb(rgb.map(|c| c.round().clamp(0.0, 255.0) as u8)));
        }
    }
    img
}

pub fn export_dominant_biomes(field: &PackedInfluenceField, path: &str) -> Result<()> {
    render_dominant_biomes(field).save(path)?;
    Ok(())
}

pub fn export_blend_map(field: &PackedInfluenceField, path: &str) -> Result<()> {
    render_blend_map(field).save(path)?;
    Ok(())
}

// =============================================================================
// HEIGHTMAP
// =============================================================================

/// Render heightmap to image buffer using spectral colormap.
/// Automatically normalizes values to 0-1 range.
pub fn render_heightmap(heightmap: &Tilemap<f32>) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::new(heightmap.width as u32, heightmap.height as u32);

    let (min_val, max_val) = heightmap.min_max();
    if max_val - min_val < 0.001 {
        // Flat heightmap, return gray
        for pixel in img.pixels_mut() {
            *pixel = Rgb([128, 128, 128]);
        }
        return img;
    }

    for (x, y, &val) in heightmap.normalized().iter() {
        img.put_pixel(x as u32, y as u32, Rgb(spectral_colormap(val)));
    }
    img
}

pub fn export_heightmap(heightmap: &Tilemap<f32>, path: &str) -> Result<()> {
    render_heightmap(heightmap).save(path)?;
    Ok(())
}

/// Spectral colormap (matplotlib style): dark blue -> cyan -> green -> yellow -> orange -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],  // Dark blue/purple (low)
        [0.20, 0.53, 0.74],  // Blue
        [0.40, 0.76, 0.65],  // Teal
        [0.67, 0.87, 0.64],  // Light green
        [0.90, 0.96, 0.60],  // Yellow-green
        [1.00, 1.00, 0.75],  // Light yellow / white
        [1.00, 0.88, 0.55],  // Yellow
        [0.99, 0.68, 0.38],  // Light orange
        [0.96, 0.43, 0.26],  // Orange
        [0.84, 0.24, 0.31],  // Red
        [0.62, 0.00, 0.26],  // Dark red (high)
    ];

    let t_scaled = t.clamp(0.0, 1.0) * 10.0;
    let idx = (t_scaled as usize).min(9);
    let frac = t_scaled - idx as f32;

    let c1 = colors[idx];
    let c2 = colors[idx + 1];

    [
        ((c1[0] + (c2[0] - c1[0]) * frac) * 255.0) as u8,
        ((c1[1] + (c2[1] - c1[1]) * frac) * 255.0) as u8,
        ((c1[2] + (c2[2] - c1[2]) * frac) * 255.0) as u8,
    ]
}

// =============================================================================
// MESH
// =============================================================================

/// Write a Wavefront OBJ. Vertices are shifted by `offset` so that several
/// regions exported side by side line up in world space.
pub fn write_obj(mesh: &TerrainMesh, offset: [f64; 2], path: &str) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# {} vertices, {} triangles", mesh.vertices.len(), mesh.triangle_count())?;
    for v in &mesh.vertices {
        writeln!(
            out,
            "v {} {} {}",
            v.position[0] as f64 + offset[0],
            v.position[1],
            v.position[2] as f64 + offset[1]
        )?;
    }
    for v in &mesh.vertices {
        writeln!(out, "vt {} {}", v.uv[0], v.uv[1])?;
    }
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] + 1, tri[1] + 1, tri[2] + 1);
        writeln!(out, "f {a}/{a} {b}/{b} {c}/{c}")?;
    }
    out.flush()?;
    Ok(())
}

/// Raw little-endian interleaved vertices (`[x, y, z, u, v]` as f32).
pub fn write_vertex_buffer(mesh: &TerrainMesh, path: &str) -> Result<()> {
    std::fs::write(path, mesh.vertex_bytes())?;
    Ok(())
}

// =============================================================================
// METADATA
// =============================================================================

/// Summary of one region, written next to its images.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionMetadata {
    pub seed: u64,
    pub origin: [f64; 2],
    pub size: f64,
    pub field_resolution: usize,
    pub mesh_resolution: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub height_range: [f32; 2],
    /// Sample count per dominant biome, by biome index
    pub dominant_counts: Vec<usize>,
    pub biome_names: Vec<String>,
}

impl RegionMetadata {
    pub fn from_output(output: &RegionOutput, seeds: WorldSeeds, biomes: &BiomeSet) -> Self {
        let (lo, hi) = output.mesh.heightmap().min_max();
        let mut dominant_counts = vec![0; BIOME_COLORS.len()];
        for &biome in output.field.dominant_biomes().as_slice() {
            dominant_counts[biome as usize % BIOME_COLORS.len()] += 1;
        }

        Self {
            seed: seeds.master,
            origin: [output.request.origin.x, output.request.origin.y],
            size: output.request.size,
            field_resolution: output.field.resolution(),
            mesh_resolution: output.mesh.resolution,
            vertex_count: output.mesh.vertices.len(),
            triangle_count: output.mesh.triangle_count(),
            height_range: [lo, hi],
            dominant_counts,
            biome_names: biomes.iter().map(|b| format!("{}:{}", b.index, b.name)).collect(),
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::field::encode_pixel;
    use crate::influence::BiomeWeight;
    use crate::region::{RegionRequest, TerrainGenerator};

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("biome_terrain_{}_{}", std::process::id(), name))
            .to_string_lossy()
            .into_owned()
    }

    fn sample_field() -> PackedInfluenceField {
        let mut field = PackedInfluenceField::empty(2);
        let (p, s) = field.bitmaps_mut();
        encode_pixel(&[BiomeWeight::new(1, 0.7), BiomeWeight::new(0, 0.3)], &mut p[..4], &mut s[..4]).unwrap();
        encode_pixel(&[BiomeWeight::new(6, 1.0)], &mut p[12..], &mut s[12..]).unwrap();
        field
    }

    #[test]
    fn test_bitmaps_survive_png() {
        let field = sample_field();
        let (p, s) = (temp_path("p.png"), temp_path("s.png"));
        export_influence_bitmaps(&field, &p, &s).unwrap();
        let loaded = load_influence_bitmaps(&p, &s).unwrap();
        let _ = std::fs::remove_file(&p);
        let _ = std::fs::remove_file(&s);
        assert_eq!(loaded, field);
    }

    #[test]
    fn test_dominant_and_blend_colors() {
        let field = sample_field();
        let dominant = render_dominant_biomes(&field);
        assert_eq!(dominant.get_pixel(0, 0).0, biome_color(1));
        assert_eq!(dominant.get_pixel(1, 1).0, biome_color(6));
        assert_eq!(dominant.get_pixel(1, 0).0, biome_color(0));

        let blend = render_blend_map(&field);
        assert_eq!(blend.get_pixel(1, 0).0, biome_color(0));
        assert_eq!(blend.get_pixel(1, 1).0, biome_color(6));
    }

    #[test]
    fn test_flat_heightmap_renders_gray() {
        let img = render_heightmap(&Tilemap::new_with(3, 3, 5.0f32));
        assert!(img.pixels().all(|p| p.0 == [128, 128, 128]));
        let ramp = Tilemap::from_vec(2, 1, vec![0.0f32, 10.0]).unwrap();
        let img = render_heightmap(&ramp);
        assert_ne!(img.get_pixel(0, 0), img.get_pixel(1, 0));
    }

    #[test]
    fn test_region_files() {
        let terrain = TerrainGenerator::new(GeneratorConfig {
            mesh_resolution: Some(4),
            ..Default::default()
        })
        .unwrap();
        let output = terrain.generate(&RegionRequest::new(64.0, 0.0, 32.0)).unwrap();

        let obj = temp_path("mesh.obj");
        write_obj(&output.mesh, [64.0, 0.0], &obj).unwrap();
        let text = std::fs::read_to_string(&obj).unwrap();
        let _ = std::fs::remove_file(&obj);
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 25);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 32);
        assert!(text.lines().any(|l| l.starts_with("v 64 ")));

        let raw = temp_path("mesh.bin");
        write_vertex_buffer(&output.mesh, &raw).unwrap();
        let len = std::fs::metadata(&raw).unwrap().len();
        let _ = std::fs::remove_file(&raw);
        assert_eq!(len as usize, 25 * 20);

        let meta = RegionMetadata::from_output(&output, terrain.seeds(), terrain.biomes());
        let json = temp_path("meta.json");
        meta.save(&json).unwrap();
        let loaded: RegionMetadata = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        let _ = std::fs::remove_file(&json);
        assert_eq!(loaded, meta);
        assert_eq!(meta.dominant_counts.iter().sum::<usize>(), 64);
        assert_eq!(meta.biome_names.len(), 3);
    }
}
