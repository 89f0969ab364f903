//! ASCII rendering and export module for regions
//!
//! Quick terminal previews of the influence field and mesh heights.

use std::fs::File;
use std::io::{self, Write};

use crate::field::PackedInfluenceField;
use crate::region::RegionOutput;
use crate::tilemap::Tilemap;

/// ASCII rendering modes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AsciiMode {
    /// Show dominant biome digits
    Biome,
    /// Show how many biomes blend at each point
    Blend,
    /// Show elevation gradient
    Height,
}

impl AsciiMode {
    pub fn name(&self) -> &'static str {
        match self {
            AsciiMode::Biome => "Biome",
            AsciiMode::Blend => "Blend",
            AsciiMode::Height => "Height",
        }
    }

    pub fn all() -> &'static [AsciiMode] {
        &[AsciiMode::Biome, AsciiMode::Blend, AsciiMode::Height]
    }
}

/// Get ASCII character for a biome index
pub fn biome_char(biome: u8) -> char {
    char::from_digit(biome as u32, 10).unwrap_or('?')
}

/// Character for the number of biomes with weight at a point.
pub fn blend_char(count: usize) -> char {
    match count {
        0 | 1 => '.',
        2 => '+',
        3 => '*',
        _ => '#',
    }
}

/// Get ASCII character for a normalized (0-1) elevation
pub fn height_char(normalized: f32) -> char {
    const CHARS: &[char] = &['~', '.', '-', '=', '+', '*', '#', '%', '^', 'A', 'M'];
    let idx = (normalized.clamp(0.0, 1.0) * (CHARS.len() - 1) as f32) as usize;
    CHARS[idx.min(CHARS.len() - 1)]
}

/// Number of biomes with any weight at a pixel, base biome included.
fn blend_count(field: &PackedInfluenceField, x: usize, y: usize) -> usize {
    let explicit = field.sample_pixel(x, y);
    let total: f32 = explicit.iter().map(|w| w.weight).sum();
    // Base counts once the explicit channels leave a byte of room
    explicit.len() + usize::from(total < 1.0 - 1.0 / 255.0)
}

/// Render the influence field as ASCII, sampled every `step` pixels.
pub fn render_field(field: &PackedInfluenceField, mode: AsciiMode, step: usize) -> String {
    let res = field.resolution();
    let step = step.max(1);
    let dominant = field.dominant_biomes();
    let mut result = String::with_capacity((res / step + 1) * (res / step + 1));

    for y in (0..res).step_by(step) {
        for x in (0..res).step_by(step) {
            let ch = match mode {
                AsciiMode::Blend => blend_char(blend_count(field, x, y)),
                _ => biome_char(*dominant.get(x, y)),
            };
            result.push(ch);
        }
        result.push('\n');
    }

    result
}

/// Render a heightmap as ASCII, sampled every `step` cells.
pub fn render_heights(heights: &Tilemap<f32>, step: usize) -> String {
    let step = step.max(1);
    let normalized = heights.normalized();
    let mut result = String::new();
    for y in (0..heights.height).step_by(step) {
        for x in (0..heights.width).step_by(step) {
            result.push(height_char(*normalized.get(x, y)));
        }
        result.push('\n');
    }
    result
}

pub fn render_region(output: &RegionOutput, mode: AsciiMode, step: usize) -> String {
    match mode {
        AsciiMode::Height => render_heights(&output.mesh.heightmap(), step),
        _ => render_field(&output.field, mode, step),
    }
}

/// Generate legend for the given mode
pub fn legend(mode: AsciiMode) -> String {
    match mode {
        AsciiMode::Biome => "=== BIOME LEGEND ===\n0-7 dominant biome index\n".to_string(),
        AsciiMode::Blend => "=== BLEND LEGEND ===\n. single biome  + two  * three  # four or more\n".to_string(),
        AsciiMode::Height => "=== HEIGHT LEGEND ===\n\
             Lowest -> highest:\n\
             ~ . - = + * # % ^ A M\n"
            .to_string(),
    }
}

/// Samples per dominant biome index.
pub fn biome_stats(field: &PackedInfluenceField) -> [usize; 8] {
    let mut stats = [0usize; 8];
    for &biome in field.dominant_biomes().as_slice() {
        stats[biome as usize % 8] += 1;
    }
    stats
}

/// Export a region to an ASCII file with every view
pub fn export_region_file(output: &RegionOutput, seed: u64, step: usize, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    let res = output.field.resolution();

    writeln!(file, "=== BIOME TERRAIN REGION ===")?;
    writeln!(file, "Seed: {}", seed)?;
    writeln!(
        file,
        "Origin: ({:.1}, {:.1})  Size: {:.1}",
        output.request.origin.x, output.request.origin.y, output.request.size
    )?;
    writeln!(file, "Field: {}x{}  Mesh: {} vertices", res, res, output.mesh.vertices.len())?;
    writeln!(file)?;

    for &mode in AsciiMode::all() {
        writeln!(file, "=== MAP ({} View) ===", mode.name())?;
        write!(file, "{}", render_region(output, mode, step))?;
        writeln!(file)?;
        write!(file, "{}", legend(mode))?;
        writeln!(file)?;
    }

    writeln!(file, "=== BIOME STATISTICS ===")?;
    let total = (res * res).max(1);
    for (biome, &count) in biome_stats(&output.field).iter().enumerate() {
        if count > 0 {
            writeln!(
                file,
                "  {}: {:>6} ({:.1}%)",
                biome,
                count,
                count as f64 * 100.0 / total as f64
            )?;
        }
    }

    Ok(())
}
