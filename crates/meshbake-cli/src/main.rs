//! meshbake CLI - bake displacement and normal maps from JSON meshes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use meshbake::{
    bake_maps, estimate_edge_curvature, pad_maps, BackendKind, BakeConfig, BakeError,
    MapWriter, Mesh, Neighborhood,
};

mod writer;

use writer::FileWriter;

#[derive(Parser)]
#[command(name = "meshbake")]
#[command(about = "Bake displacement and normal maps from a high-detail mesh", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake a low-detail quad mesh against a high-detail triangle mesh
    Bake {
        /// Low-detail quad mesh (.json) with texel-space UVs
        #[arg(long)]
        low: PathBuf,
        /// High-detail triangle mesh (.json)
        #[arg(long)]
        high: PathBuf,
        /// Texture size in texels (square)
        #[arg(short, long)]
        resolution: i32,
        /// Backend: cpu or accelerated (required unless the config file sets one)
        #[arg(short, long)]
        backend: Option<BackendKind>,
        /// Edge padding passes after baking
        #[arg(short, long, default_value_t = 0)]
        padding: u32,
        /// Neighbours used by edge padding
        #[arg(long, value_enum, default_value_t = PaddingMode::Eight)]
        padding_mode: PaddingMode,
        /// TOML bake configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Skip the PNG previews
        #[arg(long)]
        no_preview: bool,
        /// Also write per-vertex edge curvature of the low-detail mesh
        #[arg(long)]
        curvature: bool,
    },
    /// Display information about a mesh file
    Info {
        /// Path to the mesh (.json)
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaddingMode {
    /// Edge neighbours only
    Four,
    /// Edge and diagonal neighbours
    Eight,
}

impl From<PaddingMode> for Neighborhood {
    fn from(mode: PaddingMode) -> Self {
        match mode {
            PaddingMode::Four => Neighborhood::Four,
            PaddingMode::Eight => Neighborhood::Eight,
        }
    }
}

struct BakeArgs {
    low: PathBuf,
    high: PathBuf,
    resolution: i32,
    backend: Option<BackendKind>,
    padding: u32,
    neighborhood: Neighborhood,
    config: Option<PathBuf>,
    out: PathBuf,
    previews: bool,
    curvature: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Bake {
            low,
            high,
            resolution,
            backend,
            padding,
            padding_mode,
            config,
            out,
            no_preview,
            curvature,
        } => bake(&BakeArgs {
            low,
            high,
            resolution,
            backend,
            padding,
            neighborhood: padding_mode.into(),
            config,
            out,
            previews: !no_preview,
            curvature,
        }),
        Commands::Info { file } => show_info(&file),
    }
}

fn load_mesh(path: &Path) -> Result<Mesh> {
    let json =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let mut mesh =
        Mesh::from_json(&json).with_context(|| format!("cannot parse {}", path.display()))?;
    if mesh.name.is_empty() {
        mesh.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("mesh")
            .to_string();
    }
    Ok(mesh)
}

/// Config file values first, then command-line overrides.
fn resolve_config(path: Option<&Path>, backend: Option<BackendKind>) -> Result<BakeConfig> {
    let mut config = match path {
        Some(path) => BakeConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => BakeConfig::default(),
    };
    if let Some(backend) = backend {
        config.backend = backend;
    }
    if config.backend == BackendKind::None {
        return Err(BakeError::Configuration(
            "no bake backend selected; pass --backend cpu|accelerated or set `backend` in the config file"
                .into(),
        )
        .into());
    }
    Ok(config)
}

fn bake(args: &BakeArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), args.backend)?;
    let low = load_mesh(&args.low)?;
    let high = load_mesh(&args.high)?;

    log::info!("using {} backend", config.backend);
    let (mut maps, stats) = bake_maps(&config, &low, &high, args.resolution)?;

    if args.padding > 0 {
        let filled = pad_maps(&mut maps, args.padding, args.neighborhood);
        log::info!("padding filled {} texels", filled);
    }

    let mut writer = FileWriter::new(&args.out, args.previews)?;
    writer.write_maps(&maps)?;

    if args.curvature {
        let curvature = estimate_edge_curvature(&low, &maps)?;
        let path = args.out.join(format!("{}_curvature.json", maps.name));
        fs::write(&path, serde_json::to_vec(&curvature)?)
            .with_context(|| format!("cannot write {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }

    println!(
        "Baked '{}' onto '{}' at {}x{}: {} hits, {} misses, {} rejected",
        low.name, high.name, maps.width, maps.height, stats.hits, stats.misses, stats.rejected
    );
    if let Some((lo, hi)) = maps.displacement_range() {
        println!("  displacement range: {:.6} .. {:.6}", lo, hi);
    }
    Ok(())
}

fn show_info(path: &Path) -> Result<()> {
    let mesh = load_mesh(path)?;

    println!("Mesh: {}", mesh.name);
    println!("  Vertices: {}", mesh.num_vertices());
    println!("  Indices: {}", mesh.indices.len());
    if mesh.validate_quads().is_ok() {
        println!("  Quads: {}", mesh.num_quads());
    }
    if mesh.validate_triangles().is_ok() {
        println!(
            "  Triangles: {} ({} degenerate)",
            mesh.num_triangles(),
            mesh.degenerate_triangle_count()
        );
    }
    println!(
        "  Texture coordinates: {}",
        if mesh.has_tex_coords() { "yes" } else { "no" }
    );
    if let Some(bounds) = mesh.bounds() {
        println!(
            "  Bounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
        println!("  Radius: {:.3}", bounds.radius);
    }

    Ok(())
}
