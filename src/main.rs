//! texture-tools CLI - elevation preprocessing and procedural noise for the
//! globe textures.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

use texture_tools::export::{SampleFormat, export_field};
use texture_tools::noise::{BatchConfig, PerlinParams, perlin_noise, run_worley_batch, worley_noise};
use texture_tools::raster::Raster;
use texture_tools::tools::{
    KMeansParams, NormalMapOptions, PaletteOptions, ResizeOptions, combine_elevation,
    contrast_stretch, downscale, normal_map, recolour, side_by_side,
};

/// Texture preparation tools.
#[derive(Parser)]
#[command(name = "texture-tools")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Downscale an elevation map, optionally smoothing it first.
    Resize {
        /// Source image.
        #[arg(short, long, default_value = "../gebco_08_rev_elev_21600x10800.png")]
        input: PathBuf,

        /// Destination PNG.
        #[arg(short, long, default_value = "../smooth.png")]
        output: PathBuf,

        /// Output is 1/factor of the input on both axes.
        #[arg(short, long, default_value = "100")]
        factor: u32,

        /// Keep the first channel only and smooth it with a wrapping 3x3 Gaussian.
        #[arg(long)]
        smooth: bool,
    },

    /// Find the dominant colours of an image and recolour it with them.
    Palette {
        /// Source RGB image.
        image: PathBuf,

        /// Destination PNG.
        #[arg(short, long, default_value = "recoloured.png")]
        output: PathBuf,

        /// Number of colours.
        #[arg(short = 'k', long, default_value = "8")]
        clusters: usize,

        /// Random seed for reproducible clustering.
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Merge bathymetry and topography into a displacement map.
    Displace {
        /// Bathymetry image.
        #[arg(long, default_value = "bath.png")]
        bath: PathBuf,

        /// Topography image.
        #[arg(long, default_value = "elev.png")]
        elev: PathBuf,

        /// Destination PNG.
        #[arg(short, long, default_value = "displacement.png")]
        output: PathBuf,

        /// Also write a tangent-space normal map here.
        #[arg(long)]
        normal_map: Option<PathBuf>,

        /// Normal map bump strength.
        #[arg(long, default_value = "0.5")]
        strength: f32,
    },

    /// Stretch an image's contrast to the full 8-bit range.
    Stretch {
        /// Source image.
        #[arg(short, long, default_value = "displacement_scaled.png")]
        input: PathBuf,

        /// Destination PNG.
        #[arg(short, long, default_value = "stretched.png")]
        output: PathBuf,

        /// Also write original and stretched side by side here.
        #[arg(long)]
        compare: Option<PathBuf>,
    },

    /// Generate procedural noise.
    Noise {
        #[command(subcommand)]
        kind: NoiseCommand,
    },
}

#[derive(Subcommand)]
enum NoiseCommand {
    /// Worley (cellular) noise; 2D is dark at seeds, 3D is inverted.
    Worley {
        /// Field shape, 2 or 3 comma-separated extents.
        #[arg(long, value_delimiter = ',', default_value = "256,256")]
        shape: Vec<usize>,

        /// Grid cell size in samples.
        #[arg(short, long, default_value = "32")]
        frequency: usize,

        /// Random seed for reproducible generation.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Destination; `.png` for 2D images, raw samples otherwise.
        #[arg(short, long, default_value = "worley.png")]
        output: PathBuf,

        /// Raw sample width.
        #[arg(long, default_value = "f64")]
        format: RawFormat,

        /// Write 2D images twice side by side to check tiling.
        #[arg(long)]
        tiled_preview: bool,
    },

    /// Tileable Perlin noise.
    Perlin {
        /// Field shape, 2 or 3 comma-separated extents.
        #[arg(long, value_delimiter = ',', default_value = "256,256")]
        shape: Vec<usize>,

        /// Samples per lattice cell (3D only).
        #[arg(long, default_value = "32.0")]
        scale: f64,

        /// Number of noise octaves.
        #[arg(long, default_value = "6")]
        octaves: u32,

        /// Amplitude decay per octave (persistence).
        #[arg(long, default_value = "0.5")]
        persistence: f64,

        /// Frequency multiplier per octave (lacunarity).
        #[arg(long, default_value = "2.0")]
        lacunarity: f64,

        /// Permutation table offset.
        #[arg(long, default_value = "0")]
        base: u8,

        /// Destination; `.png` for 2D images, raw samples otherwise.
        #[arg(short, long, default_value = "perlin.png")]
        output: PathBuf,

        /// Raw sample width.
        #[arg(long, default_value = "f64")]
        format: RawFormat,

        /// Write 2D images twice side by side to check tiling.
        #[arg(long)]
        tiled_preview: bool,
    },

    /// One 3D Worley volume per frequency, written as raw samples.
    Batch {
        /// Volume shape, 3 comma-separated extents.
        #[arg(long, value_delimiter = ',', default_value = "128,128,128")]
        shape: Vec<usize>,

        /// Cell sizes to generate.
        #[arg(long, value_delimiter = ',', default_value = "4,8,16")]
        frequencies: Vec<usize>,

        /// Random seed for reproducible generation.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Raw sample width.
        #[arg(long, default_value = "f64")]
        format: RawFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RawFormat {
    /// 32-bit float samples.
    F32,
    /// 64-bit float samples.
    F64,
}

impl From<RawFormat> for SampleFormat {
    fn from(format: RawFormat) -> Self {
        match format {
            RawFormat::F32 => SampleFormat::F32,
            RawFormat::F64 => SampleFormat::F64,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resize {
            input,
            output,
            factor,
            smooth,
        } => run_resize(&input, &output, ResizeOptions { factor, smooth }),
        Commands::Palette {
            image,
            output,
            clusters,
            seed,
        } => run_palette(&image, &output, clusters, seed),
        Commands::Displace {
            bath,
            elev,
            output,
            normal_map,
            strength,
        } => run_displace(&bath, &elev, &output, normal_map.as_deref(), strength),
        Commands::Stretch {
            input,
            output,
            compare,
        } => run_stretch(&input, &output, compare.as_deref()),
        Commands::Noise { kind } => run_noise(kind),
    }
}

/// Use the given seed or draw a fresh one, logging it so the run can be
/// repeated.
fn resolve_seed(seed: Option<u64>) -> u64 {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().r#gen());
    info!(seed, "using seed");
    seed
}

fn load(path: &Path) -> Result<Raster> {
    let raster = Raster::load(path).with_context(|| format!("failed to read {}", path.display()))?;
    info!(
        path = %path.display(),
        width = raster.width(),
        height = raster.height(),
        channels = raster.channels(),
        "loaded image"
    );
    Ok(raster)
}

fn save(raster: &Raster, path: &Path) -> Result<()> {
    raster
        .save_png(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), width = raster.width(), height = raster.height(), "saved image");
    Ok(())
}

fn run_resize(input: &Path, output: &Path, options: ResizeOptions) -> Result<()> {
    let _scope = info_span!("resize").entered();
    let raster = load(input)?;
    let resized = downscale(&raster, &options).context("resize failed")?;
    save(&resized, output)
}

fn run_palette(image: &Path, output: &Path, clusters: usize, seed: Option<u64>) -> Result<()> {
    let _scope = info_span!("palette").entered();
    let mut rng = Pcg32::seed_from_u64(resolve_seed(seed));

    let options = PaletteOptions {
        kmeans: KMeansParams {
            clusters,
            ..Default::default()
        },
        ..Default::default()
    };

    let raster = load(image)?;
    let (palette, recoloured) = recolour(&raster, &options, &mut rng).context("recolouring failed")?;
    info!(colours = ?palette.colours(), "dominant colours");
    save(&recoloured, output)
}

fn run_displace(
    bath: &Path,
    elev: &Path,
    output: &Path,
    normals: Option<&Path>,
    strength: f32,
) -> Result<()> {
    let _scope = info_span!("displace").entered();
    let bath = load(bath)?;
    let topo = load(elev)?;

    let displacement = combine_elevation(&bath, &topo).context("failed to merge elevation")?;
    info!(sea_level = displacement.sea_level, "sea level");
    save(&displacement.map, output)?;

    if let Some(path) = normals {
        let options = NormalMapOptions {
            strength,
            ..Default::default()
        };
        let normals = normal_map(&displacement.heights, &options).context("normal map failed")?;
        save(&normals, path)?;
    }
    Ok(())
}

fn run_stretch(input: &Path, output: &Path, compare: Option<&Path>) -> Result<()> {
    let _scope = info_span!("stretch").entered();
    let raster = load(input)?;
    let stretched = contrast_stretch(&raster);
    save(&stretched, output)?;

    if let Some(path) = compare {
        let both = side_by_side(&raster, &stretched).context("comparison image failed")?;
        save(&both, path)?;
    }
    Ok(())
}

fn run_noise(kind: NoiseCommand) -> Result<()> {
    match kind {
        NoiseCommand::Worley {
            shape,
            frequency,
            seed,
            output,
            format,
            tiled_preview,
        } => {
            let _scope = info_span!("worley").entered();
            let mut rng = Pcg32::seed_from_u64(resolve_seed(seed));
            info!(?shape, frequency, "generating worley noise");
            let field = worley_noise(&shape, frequency, &mut rng).context("worley noise failed")?;
            export_field(&field, &output, format.into(), tiled_preview)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), "wrote worley noise");
        }
        NoiseCommand::Perlin {
            shape,
            scale,
            octaves,
            persistence,
            lacunarity,
            base,
            output,
            format,
            tiled_preview,
        } => {
            let _scope = info_span!("perlin").entered();
            let params = PerlinParams {
                octaves,
                persistence,
                lacunarity,
                base,
            };
            info!(?shape, scale, ?params, "generating perlin noise");
            let field = perlin_noise(&shape, scale, params).context("perlin noise failed")?;
            export_field(&field, &output, format.into(), tiled_preview)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), "wrote perlin noise");
        }
        NoiseCommand::Batch {
            shape,
            frequencies,
            seed,
            output,
            format,
        } => {
            let _scope = info_span!("batch").entered();
            let shape: [usize; 3] = shape
                .as_slice()
                .try_into()
                .map_err(|_| anyhow!("batch shape must have 3 extents, got {shape:?}"))?;
            let config = BatchConfig {
                shape,
                frequencies,
                seed: resolve_seed(seed),
                format: format.into(),
            };
            let written = run_worley_batch(&config, &output).context("worley batch failed")?;
            info!(files = written.len(), dir = %output.display(), "batch complete");
        }
    }
    Ok(())
}
