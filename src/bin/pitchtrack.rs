//! pitchtrack CLI
//!
//! Calibrate a camera against the pitch, map recorded tracks to field
//! coordinates and produce the analysis report for rendering.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pitchtrack::records;
use pitchtrack::{Analysis, Config, HomographyEstimator, Session};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pitchtrack", version, about = "Football player tracking analytics")]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the homography from the configured correspondences
    Calibrate {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Map a recorded pixel-space tracking log to field coordinates
    Map {
        /// Tracking log, `[{frame_id, tracks: [{track_id, bbox}]}]`
        #[arg(short, long)]
        detections: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "tracking_field_coords.json")]
        out: PathBuf,
    },

    /// Aggregate field coordinates into distances, heatmaps and trajectories
    Analyze {
        /// Field log, `[{frame_id, field_tracks: [{track_id, field_pos}]}]`
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, default_value = "report.json")]
        out: PathBuf,
    },

    /// Decode a video and map the recorded identities frame by frame
    #[cfg(feature = "video")]
    Track {
        #[arg(long)]
        video: PathBuf,
        #[arg(short, long)]
        detections: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "tracking_field_coords.json")]
        out: PathBuf,
    },
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_path(path).with_context(|| format!("loading config {}", path.display()))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    Ok(BufReader::new(file))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;

    Ok(BufWriter::new(file))
}

fn calibrate(config: &Path) -> Result<()> {
    let config = load_config(config)?;
    let estimate = HomographyEstimator::new(config.ransac)
        .estimate(&config.calibration.correspondences)
        .context("homography estimation failed")?;

    println!("Homography (image -> field):");
    for row in estimate.homography.to_rows() {
        println!("  [{:>14.8}, {:>14.8}, {:>14.8}]", row[0], row[1], row[2]);
    }
    println!(
        "Inliers: {}/{}  RMS reprojection error: {:.4} m",
        estimate.n_inliers,
        config.calibration.correspondences.len(),
        estimate.rms_error
    );

    Ok(())
}

fn map(detections: &Path, config: &Path, out: &Path) -> Result<()> {
    let session = Session::new(load_config(config)?).context("calibration failed")?;
    let log = records::read_tracked_frames(open(detections)?)?;
    let field = session.remap(&log)?;

    records::write_frames(create(out)?, &field)?;
    info!("mapped {} frames to {}", field.len(), out.display());

    Ok(())
}

fn analyze(input: &Path, config: Option<&Path>, out: &Path) -> Result<()> {
    let config = match config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let parsed = records::read_frames(open(input)?)?;
    let report = Analysis::new(config).run_records(parsed);

    println!("Top {} distance covered:", report.distance_ranking.len());
    for (rank, entry) in report.distance_ranking.iter().enumerate() {
        println!(
            "  {:>2}. ID {:<6} {:>9.1} m  ({} samples)",
            rank + 1,
            entry.track_id,
            entry.distance_m,
            entry.samples
        );
    }
    if report.skipped_records > 0 {
        println!("Skipped {} malformed records", report.skipped_records);
    }

    report.write(create(out)?)?;
    info!("report saved at {}", out.display());

    Ok(())
}

#[cfg(feature = "video")]
fn track(video: &Path, detections: &Path, config: &Path, out: &Path) -> Result<()> {
    use pitchtrack::detector::RecordedStream;
    use pitchtrack::video::OpenCvSource;

    let session = Session::new(load_config(config)?).context("calibration failed")?;
    let source = OpenCvSource::open(video)?;
    let stream = RecordedStream::new(records::read_tracked_frames(open(detections)?)?);

    let run = session.track(source, stream)?;
    records::write_frames(create(out)?, &run.field)?;
    info!(
        "field coordinates for {} frames saved at {}",
        run.field.len(),
        out.display()
    );

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match &args.command {
        Command::Calibrate { config } => calibrate(config),
        Command::Map {
            detections,
            config,
            out,
        } => map(detections, config, out),
        Command::Analyze { input, config, out } => analyze(input, config.as_deref(), out),
        #[cfg(feature = "video")]
        Command::Track {
            video,
            detections,
            config,
            out,
        } => track(video, detections, config, out),
    }
}
