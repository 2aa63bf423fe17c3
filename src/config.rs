//! Explicit configuration for every stage of the pipeline.
//!
//! Everything that used to be a module-level constant (pitch size, bin
//! counts, smoothing window, selection thresholds, calibration points) is a
//! named field here and is handed to each component at construction.

use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;
use crate::homography::Correspondence;
use crate::ranking::OrderBy;

/// Standard pitch size in meters.
pub const PITCH_LENGTH: f64 = 105.0;
pub const PITCH_WIDTH: f64 = 68.0;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub pitch: PitchConfig,
    pub calibration: CalibrationConfig,
    pub ransac: RansacConfig,
    pub metrics: MetricsConfig,
    pub selection: SelectionConfig,
    pub frame_order: FrameOrder,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PitchConfig {
    /// Touchline length, maps to field X.
    pub length: f64,
    /// Goal line width, maps to field Y.
    pub width: f64,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            length: PITCH_LENGTH,
            width: PITCH_WIDTH,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Image to field point pairs for the camera setup.
    pub correspondences: Vec<Correspondence>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RansacConfig {
    /// Maximum number of minimal-sample hypotheses.
    pub max_iters: usize,
    /// Inlier threshold on reprojection error, in field meters.
    pub inlier_threshold: f64,
    /// Fewer inliers than this and the fit is rejected.
    pub min_inliers: usize,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            inlier_threshold: 3.0,
            min_inliers: 4,
            seed: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct MetricsConfig {
    pub smoothing: SmoothingConfig,
    pub occupancy: OccupancyConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Samples averaged on each side of the center sample.
    pub half_window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { half_window: 5 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct OccupancyConfig {
    /// Bins along field X (pitch length).
    pub x_bins: usize,
    /// Bins along field Y (pitch width).
    pub y_bins: usize,
    /// Gaussian blur spread, in bins. Zero disables the blur.
    pub sigma: f64,
    /// Kernel radius in multiples of `sigma`.
    pub truncate: f64,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            x_bins: 80,
            y_bins: 50,
            sigma: 3.0,
            truncate: 4.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    pub min_samples: usize,
    pub top_n: usize,
    pub order_by: OrderBy,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    pub distance: SelectionPolicy,
    pub heatmap: SelectionPolicy,
    pub trajectory: SelectionPolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            distance: SelectionPolicy {
                min_samples: 301,
                top_n: 10,
                order_by: OrderBy::Distance,
            },
            heatmap: SelectionPolicy {
                min_samples: 200,
                top_n: 5,
                order_by: OrderBy::SampleCount,
            },
            trajectory: SelectionPolicy {
                min_samples: 120,
                top_n: 10,
                order_by: OrderBy::SampleCount,
            },
        }
    }
}

/// How records are ordered before they reach the aggregator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrder {
    /// Trust arrival order.
    #[default]
    Arrival,
    /// Stable sort by `frame_id` first; records of one frame keep their order.
    SortByFrame,
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Config = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.pitch.length > 0.0 && self.pitch.width > 0.0) {
            return Err(Error::Config(format!(
                "pitch dimensions must be positive, got {}x{}",
                self.pitch.length, self.pitch.width
            )));
        }

        let occ = &self.metrics.occupancy;
        if occ.x_bins == 0 || occ.y_bins == 0 {
            return Err(Error::Config("occupancy bin counts must be non-zero".into()));
        }

        if !(occ.sigma >= 0.0 && occ.truncate > 0.0) {
            return Err(Error::Config(format!(
                "invalid gaussian blur sigma={} truncate={}",
                occ.sigma, occ.truncate
            )));
        }

        let n = self.calibration.correspondences.len();
        if n != 0 && n < 4 {
            return Err(Error::InsufficientCorrespondences { got: n });
        }

        if !(self.ransac.inlier_threshold > 0.0) {
            return Err(Error::Config("ransac inlier threshold must be positive".into()));
        }

        Ok(())
    }
}
