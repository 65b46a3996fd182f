use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use annotate_common::{CertificationRecord, Point, Rect};
use annotate_core::{
    AnnotationSession, EditOperation, LayerId, MaskDirectory, MaskPersistence,
};
use clap::{Parser, Subcommand, ValueEnum};
use cli::SessionConfig;
use color_eyre::eyre::{eyre, Result};
use image::RgbImage;
use segmentation::{
    run_and_merge, ImageProvider, SegmentationError, SegmentationRunner, Segmenter,
};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

/// Local-disk image source: the identifier is the file path.
struct FsImageProvider;

impl ImageProvider for FsImageProvider {
    fn load_image(&self, identifier: &str) -> segmentation::Result<RgbImage> {
        let path = Path::new(identifier);
        if !path.is_file() {
            return Err(SegmentationError::ImageNotFound(identifier.to_string()));
        }
        image::open(path)
            .map(|decoded| decoded.to_rgb8())
            .map_err(|err| SegmentationError::ImageLoad(err.to_string()))
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configured layer tree in traversal order
    Layers {
        /// Path to the session configuration file (.json or .toml)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run an edit-operation script against an image and save the masks
    Apply {
        /// Path to the session configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Path to the input image
        #[arg(short, long)]
        image: PathBuf,
        /// Directory holding the per-layer mask files
        #[arg(short, long)]
        masks: PathBuf,
        /// JSON file with the list of operations to execute
        #[arg(short, long)]
        script: PathBuf,
    },
    /// Run a segmentation algorithm and merge the result into a layer
    Segment {
        /// Path to the session configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Path to the input image
        #[arg(short, long)]
        image: PathBuf,
        /// Directory holding the per-layer mask files
        #[arg(short, long)]
        masks: PathBuf,
        /// Target layer name
        #[arg(short, long)]
        layer: String,
        /// Algorithm to run
        #[arg(short, long, value_enum)]
        algorithm: AlgorithmArg,
        /// Seed rectangle as x,y,width,height
        #[arg(short, long)]
        rect: Option<String>,
        /// Seed points as x,y (repeatable, clustering only)
        #[arg(long)]
        seed: Vec<String>,
        /// Cluster count (clustering only)
        #[arg(short = 'k', long)]
        clusters: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Lab,
    Bright,
    Grabcut,
    Clustering,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layers { config } => print_layers(&config),
        Commands::Apply { config, image, masks, script } => {
            apply_script(&config, &image, &masks, &script)
        }
        Commands::Segment {
            config,
            image,
            masks,
            layer,
            algorithm,
            rect,
            seed,
            clusters,
        } => {
            segment(
                &config,
                &image,
                &masks,
                &layer,
                algorithm,
                rect.as_deref(),
                &seed,
                clusters,
            )
            .await
        }
    }
}

fn print_layers(config_path: &Path) -> Result<()> {
    let config = SessionConfig::from_file(config_path)?;
    let session = AnnotationSession::new(&config.layers)?;
    for layer in session.layers().iter() {
        let indent = "  ".repeat(layer.depth as usize);
        let [r, g, b] = layer.color.rgb;
        println!("{indent}{} (#{:02x}{:02x}{:02x})", layer.name, r, g, b);
    }
    Ok(())
}

fn apply_script(
    config_path: &Path,
    image_path: &Path,
    masks_dir: &Path,
    script_path: &Path,
) -> Result<()> {
    let (mut session, layers, masks, _rgb) =
        open_session(config_path, image_path, masks_dir)?;

    let ops: Vec<EditOperation> = serde_json::from_str(&fs::read_to_string(script_path)?)?;
    info!(count = ops.len(), "executing script");
    for op in &ops {
        info!(operation = %op, "applying");
        session.execute(op)?;
    }

    save_layers(&session, &layers, &masks)?;
    info!("script applied, masks saved");
    Ok(())
}

async fn segment(
    config_path: &Path,
    image_path: &Path,
    masks_dir: &Path,
    layer_name: &str,
    algorithm: AlgorithmArg,
    rect: Option<&str>,
    seeds: &[String],
    clusters: Option<usize>,
) -> Result<()> {
    let (mut session, layers, masks, rgb) = open_session(config_path, image_path, masks_dir)?;
    let layer = session.resolve_layer(layer_name)?;

    if let Some(rect) = rect {
        session.push_rect(parse_rect(rect)?);
    }
    for seed in seeds {
        session.stamp_seeds(parse_point(seed)?, 0);
    }

    let mut segmenter = match algorithm {
        AlgorithmArg::Lab => Segmenter::lab(),
        AlgorithmArg::Bright => Segmenter::bright(),
        AlgorithmArg::Grabcut => Segmenter::grab_cut(),
        AlgorithmArg::Clustering => Segmenter::clustering(),
    };
    segmenter.feed_selection(session.selection())?;
    if let Some(k) = clusters {
        segmenter.set_cluster_count(k)?;
    }

    let runner = SegmentationRunner::new();
    let shared = Arc::new(Mutex::new(session));
    run_and_merge(&runner, &shared, layer, segmenter, rgb).await?;

    let session = shared
        .lock()
        .map_err(|_| eyre!("session lock poisoned"))?;
    save_layers(&session, &layers, &masks)?;
    info!(layer = layer_name, "segmentation merged, masks saved");
    Ok(())
}

/// Build the session for an image: parse config, decode the image, allocate
/// masks, and load any previously saved masks from the directory.
fn open_session(
    config_path: &Path,
    image_path: &Path,
    masks_dir: &Path,
) -> Result<(AnnotationSession, Vec<(LayerId, String)>, MaskDirectory, RgbImage)> {
    let config = SessionConfig::from_file(config_path)?;
    let mut session =
        AnnotationSession::with_undo_capacity(&config.layers, config.undo_capacity)?;

    let rgb = FsImageProvider.load_image(&image_path.to_string_lossy())?;
    session.load_image(rgb.width(), rgb.height());

    let image_name = image_path
        .file_name()
        .ok_or_else(|| eyre!("image path has no file name: {}", image_path.display()))?
        .to_string_lossy()
        .into_owned();
    fs::create_dir_all(masks_dir)?;
    let masks = MaskDirectory::new(masks_dir, &image_name);

    let layers: Vec<(LayerId, String)> = session
        .layers()
        .iter()
        .map(|layer| (layer.id, layer.name.clone()))
        .collect();
    for (id, name) in &layers {
        let mask = masks.load_mask(name, rgb.width(), rgb.height())?;
        session.install_mask(*id, mask)?;
    }

    Ok((session, layers, masks, rgb))
}

fn save_layers(
    session: &AnnotationSession,
    layers: &[(LayerId, String)],
    masks: &MaskDirectory,
) -> Result<()> {
    for (id, name) in layers {
        masks.save_mask(name, session.store().mask(*id)?)?;

        let layer = session.layers().resolve(*id)?;
        if layer.certified || layer.hard_example {
            let record = CertificationRecord::new(
                layer.certified,
                layer.hard_example,
                std::env::var("USER").ok(),
            );
            let path = masks.mask_path(name).with_extension("json");
            fs::write(path, record.to_json()?)?;
        }
    }
    Ok(())
}

fn parse_rect(text: &str) -> Result<Rect> {
    let parts = parse_numbers(text)?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(Rect::new(*x, *y, *width, *height)),
        _ => Err(eyre!("expected x,y,width,height, got {text:?}")),
    }
}

fn parse_point(text: &str) -> Result<Point> {
    let parts = parse_numbers(text)?;
    match parts.as_slice() {
        [x, y] => Ok(Point::new(*x, *y)),
        _ => Err(eyre!("expected x,y, got {text:?}")),
    }
}

fn parse_numbers(text: &str) -> Result<Vec<u32>> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| eyre!("invalid number {part:?} in {text:?}"))
        })
        .collect()
}
