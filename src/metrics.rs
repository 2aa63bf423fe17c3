//! Per-track derived metrics: path length, smoothed trajectory and a
//! normalized occupancy grid.

use nalgebra as na;
use ndarray::{Array2, Axis};

use crate::config::{MetricsConfig, OccupancyConfig, PitchConfig};
use crate::math;
use crate::rolling_avg::RollingAvg;
use crate::track::Track;

/// Sum of straight-line steps between consecutive positions, in meters.
#[inline]
pub fn distance(points: &[na::Point2<f64>]) -> f64 {
    math::path_length(points)
}

/// Raw sample counts over the pitch, shape `(x_bins, y_bins)`.
///
/// Bins are uniform over `[0, length] x [0, width]`; a coordinate on the far
/// edge lands in the last bin and anything outside the pitch is dropped.
pub fn histogram(
    points: &[na::Point2<f64>],
    pitch: &PitchConfig,
    x_bins: usize,
    y_bins: usize,
) -> Array2<f64> {
    let mut grid = Array2::zeros((x_bins, y_bins));

    for p in points {
        if let (Some(ix), Some(iy)) = (
            bin_index(p.x, pitch.length, x_bins),
            bin_index(p.y, pitch.width, y_bins),
        ) {
            grid[(ix, iy)] += 1.0;
        }
    }

    grid
}

#[inline]
fn bin_index(v: f64, extent: f64, bins: usize) -> Option<usize> {
    if !(0.0..=extent).contains(&v) || bins == 0 {
        return None;
    }

    Some(((v / extent * bins as f64) as usize).min(bins - 1))
}

/// Separable gaussian blur with reflected borders, so the total mass of the
/// grid is preserved.
pub fn blur(grid: &Array2<f64>, sigma: f64, truncate: f64) -> Array2<f64> {
    let kernel = math::gauss_kernel(sigma, truncate);
    if kernel.len() == 1 {
        return grid.clone();
    }

    let rows = convolve_axis(grid, &kernel, Axis(0));
    convolve_axis(&rows, &kernel, Axis(1))
}

fn convolve_axis(grid: &Array2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let radius = (kernel.len() / 2) as isize;
    let mut out = Array2::zeros(grid.raw_dim());

    for (src, mut dst) in grid.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        let len = src.len();

        for i in 0..len {
            dst[i] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = math::reflect_index(i as isize + k as isize - radius, len);
                    w * src[j]
                })
                .sum();
        }
    }

    out
}

/// Scales the grid so its densest cell is 1.0. An all-zero grid stays zero.
pub fn normalize_max(mut grid: Array2<f64>) -> Array2<f64> {
    let max = grid.iter().copied().fold(0.0, f64::max);

    if max > 0.0 {
        grid.mapv_inplace(|v| (v / max).clamp(0.0, 1.0));
    } else {
        grid.fill(0.0);
    }

    grid
}

/// Histogram, blur and max-normalization in one go.
pub fn occupancy(
    points: &[na::Point2<f64>],
    pitch: &PitchConfig,
    config: &OccupancyConfig,
) -> Array2<f64> {
    let counts = histogram(points, pitch, config.x_bins, config.y_bins);

    normalize_max(blur(&counts, config.sigma, config.truncate))
}

/// Everything derived from one track. Never written back into the track.
#[derive(Debug, Clone)]
pub struct MetricBundle {
    pub track_id: i64,
    pub samples: usize,
    /// Path length of the raw positions.
    pub distance: f64,
    /// Normalized density, indexed `[x_bin, y_bin]`.
    pub occupancy: Array2<f64>,
    pub smoothed: Vec<na::Point2<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    pitch: PitchConfig,
    occupancy: OccupancyConfig,
    smoother: RollingAvg,
}

impl MetricsEngine {
    pub fn new(pitch: PitchConfig, config: MetricsConfig) -> Self {
        Self {
            pitch,
            occupancy: config.occupancy,
            smoother: RollingAvg::new(config.smoothing.half_window),
        }
    }

    #[inline]
    pub fn pitch(&self) -> &PitchConfig {
        &self.pitch
    }

    #[inline]
    pub fn distance(&self, track: &Track) -> f64 {
        distance(&track.positions)
    }

    #[inline]
    pub fn smooth(&self, track: &Track) -> Vec<na::Point2<f64>> {
        self.smoother.smooth(&track.positions)
    }

    #[inline]
    pub fn occupancy(&self, track: &Track) -> Array2<f64> {
        occupancy(&track.positions, &self.pitch, &self.occupancy)
    }

    pub fn bundle(&self, track: &Track) -> MetricBundle {
        MetricBundle {
            track_id: track.track_id,
            samples: track.len(),
            distance: self.distance(track),
            occupancy: self.occupancy(track),
            smoothed: self.smooth(track),
        }
    }
}
