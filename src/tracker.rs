use tracing::{debug, info, warn};

use crate::detector::ObjectStream;
use crate::error::Error;
use crate::homography::Homography;
use crate::mapper;
use crate::records::{FieldTrack, FrameRecord, PixelTrack, TrackedFrame};
use crate::video::VideoSource;

/// Output of a full pass over a video.
#[derive(Debug, Clone, Default)]
pub struct TrackingRun {
    pub field: Vec<FrameRecord>,
    pub pixels: Vec<TrackedFrame>,
    /// Tracked detections whose anchor could not be projected.
    pub unmapped: usize,
}

/// Reads frames, asks the object stream for tracked boxes and maps each box
/// to the pitch.
///
/// Works one frame at a time through [`FieldTracker::step`], so a caller can
/// stop between frames.
pub struct FieldTracker<'h, S, D> {
    source: S,
    stream: D,
    homography: &'h Homography,
    unmapped: usize,
}

impl<'h, S: VideoSource, D: ObjectStream> FieldTracker<'h, S, D> {
    pub fn new(source: S, stream: D, homography: &'h Homography) -> Self {
        Self {
            source,
            stream,
            homography,
            unmapped: 0,
        }
    }

    /// Builds a tracker from a mapper, failing if its transform is not set.
    pub fn from_mapper(
        source: S,
        stream: D,
        mapper: &'h mapper::FieldMapper,
    ) -> Result<Self, Error> {
        Ok(Self::new(source, stream, mapper.homography()?))
    }

    #[inline]
    pub fn unmapped(&self) -> usize {
        self.unmapped
    }

    /// Processes the next frame, `Ok(None)` at end of stream.
    pub fn step(&mut self) -> Result<Option<(FrameRecord, TrackedFrame)>, Error> {
        let frame = match self.source.next_frame()? {
            Some(frame) => frame,
            None => return Ok(None),
        };

        let detections = self.stream.infer(&frame)?;
        let mut field = FrameRecord {
            frame_id: frame.index,
            field_tracks: Vec::with_capacity(detections.len()),
        };
        let mut pixels = TrackedFrame {
            frame_id: frame.index,
            tracks: Vec::with_capacity(detections.len()),
        };

        for det in detections {
            let track_id = match det.track_id {
                Some(id) => id,
                None => continue,
            };

            pixels.tracks.push(PixelTrack {
                track_id,
                bbox: det.bbox,
            });

            match mapper::map_bbox(self.homography, &det.bbox) {
                Ok(pos) => field.field_tracks.push(FieldTrack {
                    track_id,
                    field_pos: [pos.x, pos.y],
                }),
                Err(err) => {
                    warn!("frame {}, track {}: {}", frame.index, track_id, err);
                    self.unmapped += 1;
                }
            }
        }

        debug!(
            "frame {}: {} tracked, {} mapped",
            frame.index,
            pixels.tracks.len(),
            field.field_tracks.len()
        );

        Ok(Some((field, pixels)))
    }

    pub fn run(mut self) -> Result<TrackingRun, Error> {
        let meta = self.source.meta();
        info!(
            "tracking {}x{} @ {} fps, {} frames",
            meta.width, meta.height, meta.fps, meta.frame_count
        );

        let mut out = TrackingRun::default();
        while let Some((field, pixels)) = self.step()? {
            out.field.push(field);
            out.pixels.push(pixels);
        }
        out.unmapped = self.unmapped;

        info!(
            "tracking complete: {} frames, {} unmapped detections",
            out.field.len(),
            out.unmapped
        );

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::detection::Detection;
    use crate::frame::Frame;
    use crate::homography::{estimate, Correspondence};
    use crate::mapper::FieldMapper;
    use crate::video::{BlankSource, VideoMeta};
    use approx::assert_abs_diff_eq;

    struct Scripted;

    impl ObjectStream for Scripted {
        fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
            let x = 100.0 + 10.0 * frame.index as f64;

            Ok(vec![
                Detection::new(BBox::ltrb(x - 10.0, 300.0, x + 10.0, 480.0), Some(1)),
                Detection::new(BBox::ltrb(0.0, 0.0, 5.0, 5.0), None),
            ])
        }
    }

    /// One box on the vanishing column x = 0, one at x = 100.
    struct EdgeOfView;

    impl ObjectStream for EdgeOfView {
        fn infer(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Error> {
            Ok(vec![
                Detection::new(BBox::ltrb(-10.0, 300.0, 10.0, 480.0), Some(1)),
                Detection::new(BBox::ltrb(90.0, 300.0, 110.0, 480.0), Some(2)),
            ])
        }
    }

    fn homography() -> Homography {
        estimate(&[
            Correspondence::new((0.0, 0.0), (0.0, 0.0)),
            Correspondence::new((640.0, 0.0), (105.0, 0.0)),
            Correspondence::new((0.0, 480.0), (0.0, 68.0)),
            Correspondence::new((640.0, 480.0), (105.0, 68.0)),
        ])
        .unwrap()
    }

    fn source(frames: u64) -> BlankSource {
        BlankSource::new(VideoMeta {
            width: 640,
            height: 480,
            fps: 25.0,
            frame_count: frames,
        })
    }

    #[test]
    fn maps_tracked_detections_per_frame() {
        let h = homography();
        let run = FieldTracker::new(source(4), Scripted, &h).run().unwrap();

        assert_eq!(run.field.len(), 4);
        assert_eq!(run.pixels.len(), 4);
        assert_eq!(run.unmapped, 0);

        for (i, frame) in run.field.iter().enumerate() {
            assert_eq!(frame.frame_id, i as u64);
            assert_eq!(frame.field_tracks.len(), 1);

            let pos = frame.field_tracks[0].field_pos;
            assert_abs_diff_eq!(pos[0], (100.0 + 10.0 * i as f64) * 105.0 / 640.0, epsilon = 1e-6);
            assert_abs_diff_eq!(pos[1], 68.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn uninitialized_mapper_is_rejected() {
        let mapper = FieldMapper::new();

        assert!(matches!(
            FieldTracker::from_mapper(source(1), Scripted, &mapper),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn unprojectable_anchor_is_skipped_and_counted() {
        // third row [1, 0, 0] sends x = 0 to infinity
        let h = Homography::from_matrix(nalgebra::Matrix3::new(
            0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0,
        ))
        .unwrap();

        let mut tracker = FieldTracker::new(source(2), EdgeOfView, &h);
        let (field, pixels) = tracker.step().unwrap().unwrap();

        assert_eq!(field.frame_id, 0);
        assert_eq!(pixels.tracks.len(), 2);
        assert_eq!(field.field_tracks.len(), 1);
        assert_eq!(field.field_tracks[0].track_id, 2);
        assert_eq!(tracker.unmapped(), 1);

        let run = tracker.run().unwrap();
        assert_eq!(run.field.len(), 1);
        assert_eq!(run.unmapped, 2);
    }

    #[test]
    fn step_stops_at_end_of_stream() {
        let h = homography();
        let mut tracker = FieldTracker::new(source(1), Scripted, &h);

        assert!(tracker.step().unwrap().is_some());
        assert!(tracker.step().unwrap().is_none());
    }
}
