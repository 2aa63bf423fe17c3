//! Rendering hand-off: distance ranking, heatmaps and trajectories for the
//! selected identities.

use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};
use std::io::Write;
use tracing::info;

use crate::config::Config;
use crate::error::Error;
use crate::metrics::{self, MetricsEngine};
use crate::ranking;
use crate::records::Parsed;
use crate::track::{TrackAggregator, TrackSet};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DistanceEntry {
    pub track_id: i64,
    pub samples: usize,
    pub distance_m: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub track_id: i64,
    pub samples: usize,
    /// `[x_min, x_max, y_min, y_max]` of the grid in meters.
    pub extent: [f64; 4],
    /// Normalized density, `grid[x_bin][y_bin]`.
    pub grid: Vec<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub track_id: i64,
    pub samples: usize,
    /// Path length of the smoothed points, used as the plot label.
    pub distance_m: f64,
    pub points: Vec<[f64; 2]>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub num_tracks: usize,
    pub skipped_records: usize,
    pub distance_ranking: Vec<DistanceEntry>,
    pub heatmaps: Vec<Heatmap>,
    pub trajectories: Vec<Trajectory>,
}

impl Report {
    pub fn write<W: Write>(&self, writer: W) -> Result<(), Error> {
        serde_json::to_writer_pretty(writer, self)?;

        Ok(())
    }
}

fn grid_rows(grid: &Array2<f64>) -> Vec<Vec<f64>> {
    grid.outer_iter().map(|row| row.to_vec()).collect()
}

pub struct Analysis {
    config: Config,
    engine: MetricsEngine,
}

impl Analysis {
    pub fn new(config: Config) -> Self {
        let engine = MetricsEngine::new(config.pitch, config.metrics);

        Self { config, engine }
    }

    /// Aggregates parsed records in the configured frame order and analyses
    /// the resulting tracks.
    pub fn run_records(&self, parsed: Parsed) -> Report {
        let mut aggregator = TrackAggregator::with_order(self.config.frame_order);
        aggregator.extend(parsed.records);
        let tracks = aggregator.finish();

        let mut report = self.run(&tracks);
        report.skipped_records = parsed.skipped;

        report
    }

    pub fn run(&self, tracks: &TrackSet) -> Report {
        let selection = &self.config.selection;
        let pitch = self.engine.pitch();

        let distance_ranking: Vec<DistanceEntry> =
            ranking::select_with(tracks, &selection.distance)
                .into_iter()
                .filter_map(|id| tracks.get(id))
                .map(|t| DistanceEntry {
                    track_id: t.track_id,
                    samples: t.len(),
                    distance_m: self.engine.distance(t),
                })
                .collect();

        let heatmaps: Vec<Heatmap> = ranking::select_with(tracks, &selection.heatmap)
            .into_iter()
            .filter_map(|id| tracks.get(id))
            .map(|t| Heatmap {
                track_id: t.track_id,
                samples: t.len(),
                extent: [0.0, pitch.length, 0.0, pitch.width],
                grid: grid_rows(&self.engine.occupancy(t)),
            })
            .collect();

        let trajectories: Vec<Trajectory> = ranking::select_with(tracks, &selection.trajectory)
            .into_iter()
            .filter_map(|id| tracks.get(id))
            .map(|t| {
                let smoothed = self.engine.smooth(t);

                Trajectory {
                    track_id: t.track_id,
                    samples: t.len(),
                    distance_m: metrics::distance(&smoothed),
                    points: smoothed.iter().map(|p| [p.x, p.y]).collect(),
                }
            })
            .collect();

        info!(
            "analysed {} tracks: {} ranked, {} heatmaps, {} trajectories",
            tracks.len(),
            distance_ranking.len(),
            heatmaps.len(),
            trajectories.len()
        );

        Report {
            num_tracks: tracks.len(),
            skipped_records: 0,
            distance_ranking,
            heatmaps,
            trajectories,
        }
    }
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
