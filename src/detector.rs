use std::collections::HashMap;

use crate::detection::Detection;
use crate::error::Error;
use crate::frame::Frame;
use crate::records::TrackedFrame;

/// Anything that turns a frame into tracked detections: a learned detector
/// with an association step, a classical tracker, or a replayed log.
///
/// Identities must persist across frames; detections without a `track_id`
/// are ignored downstream.
pub trait ObjectStream {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error>;
}

impl<T: ObjectStream + ?Sized> ObjectStream for Box<T> {
    #[inline]
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        (**self).infer(frame)
    }
}

/// Replays a pixel-space tracking log, keyed by frame index.
///
/// Frames missing from the log yield no detections.
#[derive(Debug, Clone, Default)]
pub struct RecordedStream {
    frames: HashMap<u64, Vec<Detection>>,
    last_frame: Option<u64>,
}

impl RecordedStream {
    pub fn new(log: Vec<TrackedFrame>) -> Self {
        let last_frame = log.iter().map(|f| f.frame_id).max();
        let mut frames: HashMap<u64, Vec<Detection>> = HashMap::with_capacity(log.len());

        for frame in log {
            frames.entry(frame.frame_id).or_default().extend(
                frame
                    .tracks
                    .into_iter()
                    .map(|t| Detection::new(t.bbox, Some(t.track_id))),
            );
        }

        Self { frames, last_frame }
    }

    /// Number of frames the log covers, counting from frame 0.
    #[inline]
    pub fn frame_span(&self) -> u64 {
        self.last_frame.map_or(0, |f| f + 1)
    }
}

impl ObjectStream for RecordedStream {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        Ok(self.frames.get(&frame.index).cloned().unwrap_or_default())
    }
}
