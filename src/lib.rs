//! Camera-to-pitch mapping and per-player track analytics for football video.
//!
//! Tracked bounding boxes from an external detector are projected onto a
//! standard pitch through a homography, grouped per identity and turned into
//! distance rankings, occupancy heatmaps and smoothed trajectories.

pub mod bbox;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod homography;
pub mod mapper;
pub mod math;
pub mod metrics;
pub mod ranking;
pub mod records;
pub mod report;
pub mod rolling_avg;
pub mod track;
pub mod tracker;
pub mod video;

pub use config::Config;
pub use detection::Detection;
pub use error::Error;
pub use frame::Frame;
pub use homography::{Correspondence, Homography, HomographyEstimator};
pub use mapper::FieldMapper;
pub use report::{Analysis, Report};
pub use track::{Track, TrackRecord, TrackSet};

use detector::ObjectStream;
use records::{FrameRecord, TrackedFrame};
use tracker::{FieldTracker, TrackingRun};
use video::VideoSource;

/// One capture session: a calibrated mapper plus the analysis settings.
///
/// Construction estimates the transform, so a bad calibration fails here and
/// nothing downstream runs without a valid homography.
pub struct Session {
    config: Config,
    mapper: FieldMapper,
}

impl Session {
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;

        let estimator = HomographyEstimator::new(config.ransac);
        let mut mapper = FieldMapper::new();
        mapper.set_correspondences(&estimator, &config.calibration.correspondences)?;

        Ok(Self { config, mapper })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Runs the object stream over every frame of `source`.
    pub fn track<S: VideoSource, D: ObjectStream>(
        &self,
        source: S,
        stream: D,
    ) -> Result<TrackingRun, Error> {
        FieldTracker::from_mapper(source, stream, &self.mapper)?.run()
    }

    /// Re-maps a recorded pixel-space log with this session's transform.
    pub fn remap(&self, log: &[TrackedFrame]) -> Result<Vec<FrameRecord>, Error> {
        let h = self.mapper.homography()?;

        log.iter()
            .map(|frame| {
                let field_tracks = frame
                    .tracks
                    .iter()
                    .map(|t| {
                        let pos = mapper::map_bbox(h, &t.bbox)?;

                        Ok(records::FieldTrack {
                            track_id: t.track_id,
                            field_pos: [pos.x, pos.y],
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()?;

                Ok(FrameRecord {
                    frame_id: frame.frame_id,
                    field_tracks,
                })
            })
            .collect()
    }

    pub fn analyze(&self, frames: &[FrameRecord]) -> Report {
        let parsed = records::Parsed {
            records: frames.iter().flat_map(|f| f.records()).collect(),
            skipped: 0,
        };

        Analysis::new(self.config.clone()).run_records(parsed)
    }
}
