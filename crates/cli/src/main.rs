//! Canopy CLI - NDVI and unsupervised classification of multi-band rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use canopy_algorithms::classification::{kmeans_stack, KmeansParams};
use canopy_algorithms::imagery::{histogram, mask, ndvi, ndvi_from_stack, HistogramParams};
use canopy_core::io::{read_geotiff, read_metadata, read_stack, write_geotiff, DataType, GeoTiffOptions};
use canopy_core::{Raster, RasterElement, RasterStack};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "canopy")]
#[command(author, version, about = "NDVI and k-means classification of multi-band rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// NDVI from two bands of one file, or from two single-band files
    Ndvi {
        /// Output file
        output: PathBuf,
        /// Multi-band input file
        #[arg(short, long, required_unless_present_all = ["nir_file", "red_file"])]
        input: Option<PathBuf>,
        /// NIR band index in the input (1-based)
        #[arg(long, default_value = "4")]
        nir: usize,
        /// Red band index in the input (1-based)
        #[arg(long, default_value = "3")]
        red: usize,
        /// Single-band NIR file
        #[arg(long, conflicts_with = "input", requires = "red_file")]
        nir_file: Option<PathBuf>,
        /// Single-band red file
        #[arg(long, conflicts_with = "input", requires = "nir_file")]
        red_file: Option<PathBuf>,
        /// Output data type: uint8, int16, int32, float32, float64
        #[arg(long, default_value = "float32")]
        datatype: DataType,
        /// Multiply values by this factor before writing (e.g. 10000 with int16)
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },
    /// Set cells below a threshold to no-data
    Mask {
        /// Input index layer
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Cells strictly below this value become no-data
        #[arg(short, long, default_value = "0.4")]
        threshold: f64,
    },
    /// Print a histogram of a single-band raster
    Histogram {
        /// Input raster file
        input: PathBuf,
        /// Number of bins
        #[arg(short, long, default_value = "20")]
        bins: usize,
        /// Lower bound of the binned range (default: data minimum)
        #[arg(long, requires = "max", allow_hyphen_values = true)]
        min: Option<f64>,
        /// Upper bound of the binned range (default: data maximum)
        #[arg(long, requires = "min", allow_hyphen_values = true)]
        max: Option<f64>,
    },
    /// Unsupervised k-means classification
    Kmeans {
        /// Multi-band input file
        input: PathBuf,
        /// Output label raster (Int32, no-data 0)
        output: PathBuf,
        /// Number of clusters
        #[arg(short, long, default_value = "5")]
        k: usize,
        /// Maximum iterations per start
        #[arg(long, default_value = "100")]
        max_iterations: usize,
        /// Number of random starts
        #[arg(long, default_value = "10")]
        n_start: usize,
        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Bands to cluster on, 1-based and comma-separated (default: all)
        #[arg(long, value_delimiter = ',')]
        bands: Option<Vec<usize>>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_band(path: &Path, band: Option<usize>) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path, band).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_bands(path: &Path) -> Result<RasterStack<f64>> {
    let pb = spinner("Reading raster...");
    let stack: RasterStack<f64> = read_stack(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    let (rows, cols) = stack.shape();
    info!("Input: {} x {}, {} bands", cols, rows, stack.band_count());
    Ok(stack)
}

fn write_result<T: RasterElement>(raster: &Raster<T>, path: &Path, options: GeoTiffOptions) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(options)).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_statistics(label: &str, raster: &Raster<f64>) {
    let stats = raster.statistics();
    println!("\n{}:", label);
    if let (Some(min), Some(max)) = (stats.min, stats.max) {
        println!("  Min: {:.4}", min);
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if let Some(std_dev) = stats.std_dev {
        println!("  Std dev: {:.4}", std_dev);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
    );
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    debug!("Worker threads: {}", canopy_algorithms::worker_count());

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let meta = read_metadata(&input).context("Failed to read raster")?;

            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} ({} cells)",
                meta.cols,
                meta.rows,
                meta.rows * meta.cols
            );
            println!("Bands: {}", meta.band_count);
            println!("Resolution: {} x {}", meta.resolution.0, meta.resolution.1);
            println!("Extent: {}", meta.extent);
            if let Some(crs) = &meta.crs {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = meta.nodata {
                println!("NoData: {}", nodata);
            }

            let stack = read_bands(&input)?;
            for (i, band) in stack.bands().iter().enumerate() {
                print_statistics(&format!("Band {}", i + 1), band);
            }
        }

        // ── NDVI ─────────────────────────────────────────────────────
        Commands::Ndvi {
            output,
            input,
            nir,
            red,
            nir_file,
            red_file,
            datatype,
            scale,
        } => {
            let options = GeoTiffOptions::scaled(datatype, scale);
            let (result, elapsed) = match (input, nir_file, red_file) {
                (Some(input), _, _) => {
                    let stack = read_bands(&input)?;
                    let start = Instant::now();
                    let result = ndvi_from_stack(&stack, nir, red)
                        .context("Failed to calculate NDVI")?;
                    (result, start.elapsed())
                }
                (None, Some(nir_file), Some(red_file)) => {
                    let nir_r = read_band(&nir_file, None)?;
                    let red_r = read_band(&red_file, None)?;
                    let start = Instant::now();
                    let result = ndvi(&nir_r, &red_r).context("Failed to calculate NDVI")?;
                    (result, start.elapsed())
                }
                _ => anyhow::bail!("Provide --input, or both --nir-file and --red-file"),
            };
            print_statistics("NDVI", &result);
            write_result(&result, &output, options)?;
            done("NDVI", &output, elapsed);
        }

        // ── Mask ─────────────────────────────────────────────────────
        Commands::Mask {
            input,
            output,
            threshold,
        } => {
            let layer = read_band(&input, None)?;
            let start = Instant::now();
            let result = mask(&layer, threshold).context("Failed to apply mask")?;
            let elapsed = start.elapsed();
            let kept = result.statistics().valid_count;
            info!("Kept {} of {} cells", kept, result.len());
            write_result(&result, &output, GeoTiffOptions::default())?;
            done("Mask", &output, elapsed);
        }

        // ── Histogram ────────────────────────────────────────────────
        Commands::Histogram {
            input,
            bins,
            min,
            max,
        } => {
            let layer = read_band(&input, None)?;
            let range = min.zip(max);
            let hist = histogram(&layer, HistogramParams { bins, range })
                .context("Failed to compute histogram")?;

            println!("{:>12} {:>12} {:>10}", "from", "to", "count");
            for (lo, hi, count) in hist.bins() {
                println!("{:>12.4} {:>12.4} {:>10}", lo, hi, count);
            }
            println!("\nBinned: {}", hist.total());
            println!("NoData: {}", hist.nodata_count);
            if hist.out_of_range > 0 {
                println!("Out of range: {}", hist.out_of_range);
            }
        }

        // ── K-means ──────────────────────────────────────────────────
        Commands::Kmeans {
            input,
            output,
            k,
            max_iterations,
            n_start,
            seed,
            bands,
        } => {
            let mut stack = read_bands(&input)?;
            if let Some(bands) = bands {
                stack = stack.select(&bands).context("Failed to select bands")?;
            }
            let params = KmeansParams {
                k,
                max_iterations,
                n_start,
                seed,
            };

            let pb = spinner("Clustering...");
            let start = Instant::now();
            let (labels, model) = kmeans_stack(&stack, params).context("Failed to run k-means")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            info!(
                "Best start {} of {}: {} iterations, converged: {}",
                model.best_start + 1,
                model.n_start,
                model.iterations,
                model.converged
            );
            println!("Total within-cluster SS: {:.4}", model.total_within_ss);
            for (c, (size, centroid)) in model.sizes.iter().zip(&model.centroids).enumerate() {
                let center: Vec<String> = centroid.iter().map(|v| format!("{:.4}", v)).collect();
                println!("  Cluster {}: {} pixels, center [{}]", c + 1, size, center.join(", "));
            }

            let options = GeoTiffOptions::scaled(DataType::Int32, 1.0);
            write_result(&labels, &output, options)?;
            done("K-means", &output, elapsed);
        }
    }

    Ok(())
}
