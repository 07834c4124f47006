//! `mvtec-ad` CLI - inspect MVTec splits, compare images, write residual maps.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use ndarray::{ArcArray, Ix3};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mvtec_ad::compare::{compare_images, Counterpart};
use mvtec_ad::dataset::{load_mvtec_data, OutputFormat};
use mvtec_ad::image::{load_image, save_image};
use mvtec_ad::model::OnnxReconstructor;
use mvtec_ad::{preprocess_tensor, residual_map, Loss, SsimConfig};

/// Dataset splits, SSIM comparisons and residual maps for MVTec anomaly detection.
#[derive(Parser, Debug)]
#[command(name = "mvtec-ad")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load X_train.npy, X_test.npy and y_test.npy and print the split shapes.
    Split {
        /// Directory holding the three arrays.
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Fraction of the training images held out for validation.
        #[arg(long, default_value = "0.1", value_name = "FLOAT")]
        validation_split: f64,

        /// Return plain owned arrays instead of shared tensors.
        #[arg(long)]
        array: bool,
    },

    /// Compare an image with a second image or with a model's reconstruction.
    #[command(group(ArgGroup::new("counterpart").required(true).args(["image2", "model"])))]
    Compare {
        /// First (original) image.
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Second image to compare against.
        #[arg(value_name = "IMAGE2")]
        image2: Option<PathBuf>,

        /// ONNX autoencoder used to reconstruct the first image.
        #[arg(short, long, value_name = "ONNX")]
        model: Option<PathBuf>,

        /// Loss the images are prepared for: SSIM compares grayscale, MSSSIM compares RGB.
        #[arg(long, default_value = "MSSSIM", value_parser = parse_loss)]
        loss: Loss,

        /// Save the side-by-side figure to this path.
        #[arg(long, value_name = "PATH")]
        figure: Option<PathBuf>,
    },

    /// Write the absolute residual map |IMAGE1 - IMAGE2|.
    Residual {
        #[arg(value_name = "IMAGE1")]
        image1: PathBuf,

        #[arg(value_name = "IMAGE2")]
        image2: PathBuf,

        /// Output image path.
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output JPEG quality (1-100).
        #[arg(short, long, default_value = "95", value_name = "INT")]
        quality: u8,
    },
}

fn parse_loss(value: &str) -> std::result::Result<Loss, String> {
    value.parse::<Loss>().map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mvtec_ad={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Split {
            dir,
            validation_split,
            array,
        } => split(dir, *validation_split, *array),
        Command::Compare {
            image,
            image2,
            model,
            loss,
            figure,
        } => compare(
            image,
            image2.as_deref(),
            model.as_deref(),
            *loss,
            figure.as_deref(),
        ),
        Command::Residual {
            image1,
            image2,
            output,
            quality,
        } => residual(image1, image2, output, *quality),
    }
}

fn split(dir: &Path, validation_split: f64, array: bool) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Dataset directory does not exist: {}", dir.display());
    }

    let format = if array {
        OutputFormat::Array
    } else {
        OutputFormat::Tensor
    };

    let splits = load_mvtec_data(dir, validation_split, format)
        .with_context(|| format!("Failed to load dataset from {}", dir.display()))?;

    let anomalous = splits.test_labels.count_nonzero();

    println!("train        {:?}", splits.train.dim());
    println!("validation   {:?}", splits.valid.dim());
    println!("test         {:?}", splits.test.dim());
    println!(
        "test labels  [{}] {} ({anomalous} anomalous)",
        splits.test_labels.len(),
        splits.test_labels.dtype()
    );

    Ok(())
}

fn compare(
    image: &Path,
    image2: Option<&Path>,
    model: Option<&Path>,
    loss: Loss,
    figure: Option<&Path>,
) -> Result<()> {
    let first = prepare(image, loss)?;

    let second;
    let mut reconstructor;
    let counterpart = match (image2, model) {
        (Some(path), None) => {
            second = prepare(path, loss)?;
            Counterpart::Image(second.view())
        }
        (None, Some(path)) => {
            reconstructor = OnnxReconstructor::from_file(path).context("Failed to load model")?;
            Counterpart::Model(&mut reconstructor)
        }
        _ => anyhow::bail!("Pass either a second image or --model"),
    };

    let comparison = compare_images(first.view(), counterpart, &SsimConfig::default())
        .context("Failed to compare images")?;

    if let Some(path) = figure {
        comparison
            .figure
            .save(path)
            .context("Failed to save figure")?;
    }

    Ok(())
}

/// Load an image and prepare it for `loss`.
fn prepare(path: &Path, loss: Loss) -> Result<ArcArray<f32, Ix3>> {
    let image = load_image(path, false)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(preprocess_tensor(image.view(), loss)?)
}

fn residual(image1: &Path, image2: &Path, output: &Path, quality: u8) -> Result<()> {
    let first = load_image(image1, false)
        .with_context(|| format!("Failed to load {}", image1.display()))?;
    let second = load_image(image2, false)
        .with_context(|| format!("Failed to load {}", image2.display()))?;

    let residual = residual_map(&first, &second).context("Images differ in shape")?;
    let magnitude = residual.mapv(f32::abs);

    save_image(magnitude.view(), output, quality).context("Failed to save residual map")?;

    println!(
        "Residual map {} - {} -> {}",
        image1.display(),
        image2.display(),
        output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_takes_loss() {
        let args = Args::try_parse_from(["mvtec-ad", "compare", "a.png", "b.png", "--loss", "ssim"])
            .unwrap();
        assert!(matches!(args.command, Command::Compare { loss: Loss::Ssim, .. }));

        let args = Args::try_parse_from(["mvtec-ad", "compare", "a.png", "--model", "ae.onnx"])
            .unwrap();
        assert!(matches!(args.command, Command::Compare { loss: Loss::MsSsim, .. }));
    }

    #[test]
    fn test_compare_rejects_unknown_options() {
        assert!(Args::try_parse_from(["mvtec-ad", "compare", "a.png", "b.png", "--grayscale"]).is_err());
        assert!(Args::try_parse_from(["mvtec-ad", "compare", "a.png", "b.png", "--loss", "l1"]).is_err());
        assert!(Args::try_parse_from(["mvtec-ad", "compare", "a.png"]).is_err());
    }
}
