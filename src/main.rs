use std::path::Path;
use std::time::Instant;

use clap::Parser;

use biome_terrain::ascii;
use biome_terrain::config::{CoordinateSpace, GeneratorConfig};
use biome_terrain::export;
use biome_terrain::lattice::WorldPos;
use biome_terrain::region::{chunk_grid, RegionOutput, TerrainGenerator};

#[derive(Parser, Debug)]
#[command(name = "biome_terrain")]
#[command(about = "Generate seamless biome influence fields and terrain meshes")]
struct Args {
    /// JSON generator config (defaults used for missing fields)
    #[arg(short, long)]
    config: Option<String>,

    /// Random seed (overrides the config)
    #[arg(short, long)]
    seed: Option<u64>,

    /// World X of the first region
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    origin_x: f64,

    /// World Y of the first region
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    origin_y: f64,

    /// Region side length in world units
    #[arg(long, default_value = "256")]
    size: f64,

    /// Generate an N x N block of adjacent regions
    #[arg(long, default_value = "1")]
    chunks: usize,

    /// Lattice cell width (overrides the config)
    #[arg(long)]
    spacing: Option<f64>,

    /// Influence samples per cell and axis (overrides the config)
    #[arg(long)]
    samples_per_cell: Option<usize>,

    /// Blend band half-width (overrides the config)
    #[arg(long)]
    overlap: Option<f64>,

    /// Mesh quads per axis (overrides the config)
    #[arg(long)]
    mesh_resolution: Option<usize>,

    /// Anchor the lattice at each region's origin instead of the world origin
    #[arg(long)]
    local: bool,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: String,

    /// Also write each mesh as Wavefront OBJ
    #[arg(long)]
    obj: bool,

    /// Also write each mesh as a raw vertex buffer
    #[arg(long)]
    raw: bool,

    /// Also write an ASCII preview per region
    #[arg(long)]
    ascii: bool,

    /// Print the ASCII biome map of the first region
    #[arg(long)]
    preview: bool,

    /// Save the effective config as JSON and continue
    #[arg(long)]
    save_config: Option<String>,
}

fn build_config(args: &Args) -> biome_terrain::Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            println!("Loading config from {}", path);
            GeneratorConfig::load(path)?
        }
        None => GeneratorConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(spacing) = args.spacing {
        config.lattice_spacing = spacing;
    }
    if let Some(samples) = args.samples_per_cell {
        config.samples_per_cell = samples;
    }
    if let Some(overlap) = args.overlap {
        config.max_overlap_distance = overlap;
    }
    if args.mesh_resolution.is_some() {
        config.mesh_resolution = args.mesh_resolution;
    }
    if args.local {
        config.coordinate_space = CoordinateSpace::Local;
    }
    Ok(config)
}

fn export_region(args: &Args, generator: &TerrainGenerator, index: usize, output: &RegionOutput) {
    let base = Path::new(&args.output).join(format!("region_{}", index));
    let base = base.to_string_lossy();
    let path = |suffix: &str| format!("{}_{}", base, suffix);

    if let Err(e) = export::export_influence_bitmaps(&output.field, &path("influence_a.png"), &path("influence_b.png")) {
        eprintln!("Failed to export influence bitmaps: {}", e);
    }
    if let Err(e) = export::export_heightmap(&output.mesh.heightmap(), &path("heightmap.png")) {
        eprintln!("Failed to export heightmap: {}", e);
    }
    if let Err(e) = export::export_dominant_biomes(&output.field, &path("biomes.png")) {
        eprintln!("Failed to export biome map: {}", e);
    }
    if let Err(e) = export::export_blend_map(&output.field, &path("blend.png")) {
        eprintln!("Failed to export blend map: {}", e);
    }

    let meta = export::RegionMetadata::from_output(output, generator.seeds(), generator.biomes());
    if let Err(e) = meta.save(&path("meta.json")) {
        eprintln!("Failed to export metadata: {}", e);
    }

    if args.obj {
        let offset = [output.request.origin.x, output.request.origin.y];
        if let Err(e) = export::write_obj(&output.mesh, offset, &path("mesh.obj")) {
            eprintln!("Failed to export OBJ: {}", e);
        }
    }
    if args.raw {
        if let Err(e) = export::write_vertex_buffer(&output.mesh, &path("vertices.bin")) {
            eprintln!("Failed to export vertex buffer: {}", e);
        }
    }
    if args.ascii {
        let step = (output.field.resolution() / 96).max(1);
        if let Err(e) = ascii::export_region_file(output, generator.seeds().master, step, &path("map.txt")) {
            eprintln!("Failed to export ASCII map: {}", e);
        }
    }
}

fn run(args: &Args) -> biome_terrain::Result<()> {
    let config = build_config(args)?;

    if let Some(ref path) = args.save_config {
        config.save(path)?;
        println!("Saved config to {}", path);
    }

    let generator = TerrainGenerator::new(config)?;
    let config = generator.config();
    println!("Generating terrain with seed: {}", config.seed);
    println!(
        "Lattice: spacing {:.1}, {} samples/cell, overlap {:.1}, {:?} coordinates",
        config.lattice_spacing, config.samples_per_cell, config.max_overlap_distance, config.coordinate_space
    );
    let names: Vec<_> = generator.biomes().iter().map(|b| format!("{}={}", b.index, b.name)).collect();
    println!("Biomes: {}", names.join(", "));
    for fix in generator.config_fixes() {
        println!("  adjusted: {}", fix);
    }

    let requests = chunk_grid(WorldPos::new(args.origin_x, args.origin_y), args.size, args.chunks.max(1));
    println!("Generating {} region(s) of size {:.1}...", requests.len(), args.size);

    let start = Instant::now();
    let outputs = generator.generate_many(&requests)?;
    println!("Generated in {:.2}s", start.elapsed().as_secs_f64());

    std::fs::create_dir_all(&args.output)?;
    for (i, output) in outputs.iter().enumerate() {
        let res = output.field.resolution();
        let (lo, hi) = output.mesh.heightmap().min_max();
        println!(
            "Region {} at ({:.1}, {:.1}): field {}x{}, {} vertices, height {:.2} to {:.2}",
            i,
            output.request.origin.x,
            output.request.origin.y,
            res,
            res,
            output.mesh.vertices.len(),
            lo,
            hi
        );
        if let Some(ref fix) = output.size_fix {
            println!("  adjusted: {}", fix);
        }
        export_region(args, &generator, i, output);
    }
    println!("Exported to: {}", args.output);

    if args.preview {
        if let Some(first) = outputs.first() {
            let step = (first.field.resolution() / 64).max(1);
            print!("{}", ascii::render_field(&first.field, ascii::AsciiMode::Biome, step));
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        if e.is_configuration() {
            eprintln!("Configuration error: {}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
