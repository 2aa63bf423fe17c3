use crate::bbox::{BBox, Ltrb};

/// One object reported by the detector/tracker for a single frame.
///
/// Only `bbox` and `track_id` are consumed by field mapping, confidence and
/// class filtering is expected to happen upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
    pub class: i32,
    pub track_id: Option<i64>,
}

impl Detection {
    pub fn new(bbox: BBox<Ltrb>, track_id: Option<i64>) -> Self {
        Self {
            bbox,
            confidence: 1.0,
            class: 0,
            track_id,
        }
    }
}
