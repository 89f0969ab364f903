//! Debug script to dump biome influences as ASCII and per-point weights

use std::fs::File;
use std::io::Write;

use biome_terrain::ascii::{render_field, AsciiMode};
use biome_terrain::config::GeneratorConfig;
use biome_terrain::influence::resolve;
use biome_terrain::lattice::{CellSource, LatticeSampler, WorldPos};
use biome_terrain::rasterize::sample_position;
use biome_terrain::region::{RegionRequest, TerrainGenerator};

fn main() -> biome_terrain::Result<()> {
    env_logger::init();

    let seed = 12345u64;
    let size = 128.0;
    let config = GeneratorConfig {
        seed,
        mesh_resolution: Some(32),
        ..Default::default()
    };
    let generator = TerrainGenerator::new(config)?;
    let config = generator.config();
    let request = RegionRequest::new(0.0, 0.0, size);
    let raster = generator.influence_field(&request)?;
    let field = &raster.field;
    let res = field.resolution();

    let mut file = File::create("influence_debug.txt")?;

    writeln!(file, "=== BIOME INFLUENCE DEBUG ({}x{}) seed={} ===", res, res, seed)?;
    writeln!(
        file,
        "spacing={} samples/cell={} overlap={} jitter={}",
        config.lattice_spacing, config.samples_per_cell, config.max_overlap_distance, config.jitter
    )?;
    writeln!(file)?;

    // Lattice points in and around the region
    writeln!(file, "LATTICE CELLS:")?;
    let (min, cols, rows) = raster.lattice.bounds();
    for row in 0..rows as i64 {
        let mut line = String::new();
        for col in 0..cols as i64 {
            let cell = raster.lattice.cell_at(min.0 + col, min.1 + row);
            line.push_str(&format!(
                "({:>3},{:>3})={} @ ({:>7.2},{:>7.2})  ",
                cell.coord.0, cell.coord.1, cell.biome, cell.position.x, cell.position.y
            ));
        }
        writeln!(file, "{}", line.trim_end())?;
    }
    writeln!(file)?;

    writeln!(file, "DOMINANT BIOME MAP:")?;
    write!(file, "{}", render_field(field, AsciiMode::Biome, 1))?;
    writeln!(file)?;
    writeln!(file, "BLEND MAP (. one biome, + two, * three, # more):")?;
    write!(file, "{}", render_field(field, AsciiMode::Blend, 1))?;
    writeln!(file)?;

    // Weights along the middle row, resolved directly from an uncached sampler
    let sampler = LatticeSampler::new(
        generator.seeds().lattice,
        config.lattice_spacing,
        config.jitter,
        raster.lattice.anchor(),
        generator.biomes().indices(),
    )?;
    let gradient = generator.rasterizer().gradient();
    let mut blended = 0usize;
    let mut mismatches = 0usize;
    writeln!(file, "MIDDLE ROW WEIGHTS:")?;
    let y = res / 2;
    for x in 0..res {
        let pos = sample_position(raster.origin, raster.size, res, x, y);
        let resolution = resolve(pos, &sampler, gradient, config.max_overlap_distance);
        let cached = generator.rasterizer().resolve_at(&raster.lattice, pos);
        if cached != resolution {
            mismatches += 1;
        }
        if resolution.weights.len() > 1 {
            blended += 1;
        }
        let weights: Vec<_> = resolution
            .weights
            .iter()
            .map(|w| format!("{}:{:.3}", w.biome, w.weight))
            .collect();
        let stored: Vec<_> = field
            .sample_pixel(x, y)
            .iter()
            .map(|w| format!("{}:{:.3}", w.biome, w.weight))
            .collect();
        writeln!(
            file,
            "  x={:>3} ({:>7.2},{:>7.2}) main={} weights=[{}] packed=[{}]",
            x,
            pos.x,
            pos.y,
            resolution.main_biome,
            weights.join(" "),
            stored.join(" ")
        )?;
    }
    writeln!(file)?;
    writeln!(file, "Blended points on row: {}/{}", blended, res)?;
    writeln!(file, "Cached vs on-demand mismatches: {}", mismatches)?;

    println!("Influence debug written to influence_debug.txt");
    println!("Blended points on middle row: {}/{}", blended, res);
    if mismatches > 0 {
        println!("WARNING: {} cached lattice lookups disagreed with the sampler", mismatches);
    }

    Ok(())
}
