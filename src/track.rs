use nalgebra as na;
use std::collections::HashMap;
use tracing::debug;

use crate::config::FrameOrder;

/// One field position of one identity in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRecord {
    pub frame_id: u64,
    pub track_id: i64,
    /// Meters on the pitch.
    pub position: na::Point2<f64>,
}

impl TrackRecord {
    #[inline]
    pub fn new(frame_id: u64, track_id: i64, x: f64, y: f64) -> Self {
        Self {
            frame_id,
            track_id,
            position: na::Point2::new(x, y),
        }
    }
}

/// Positions sharing one identity, in the order they were received.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: i64,
    pub frames: Vec<u64>,
    pub positions: Vec<na::Point2<f64>>,
}

impl Track {
    fn new(track_id: i64) -> Self {
        Self {
            track_id,
            frames: Vec::new(),
            positions: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Finished tracks keyed by identity.
///
/// Iteration follows first appearance of each identity in the stream, which
/// is the tie-break order used by ranking.
#[derive(Debug, Clone, Default)]
pub struct TrackSet {
    tracks: Vec<Track>,
    index: HashMap<i64, usize>,
}

impl TrackSet {
    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn get(&self, track_id: i64) -> Option<&Track> {
        self.index.get(&track_id).map(|&i| &self.tracks[i])
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.tracks.iter().map(|t| t.track_id)
    }

    /// Total number of samples over all tracks.
    pub fn num_samples(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }
}

impl<'a> IntoIterator for &'a TrackSet {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

/// Groups a record stream into per-identity tracks.
///
/// Records are appended as they arrive: no deduplication, no filtering and,
/// with [`FrameOrder::Arrival`], no reordering. Out-of-order input therefore
/// yields out-of-order tracks.
#[derive(Debug, Default)]
pub struct TrackAggregator {
    order: FrameOrder,
    set: TrackSet,
    pending: Vec<TrackRecord>,
}

impl TrackAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(order: FrameOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn push(&mut self, record: TrackRecord) {
        match self.order {
            FrameOrder::Arrival => self.append(record),
            FrameOrder::SortByFrame => self.pending.push(record),
        }
    }

    pub fn extend<I: IntoIterator<Item = TrackRecord>>(&mut self, records: I) {
        for record in records {
            self.push(record);
        }
    }

    fn append(&mut self, record: TrackRecord) {
        let set = &mut self.set;
        let idx = match set.index.get(&record.track_id) {
            Some(&idx) => idx,
            None => {
                set.tracks.push(Track::new(record.track_id));
                set.index.insert(record.track_id, set.tracks.len() - 1);
                set.tracks.len() - 1
            }
        };

        let track = &mut set.tracks[idx];
        track.frames.push(record.frame_id);
        track.positions.push(record.position);
    }

    /// Consumes the aggregator once the whole stream has been pushed.
    pub fn finish(mut self) -> TrackSet {
        if !self.pending.is_empty() {
            let mut pending = std::mem::take(&mut self.pending);
            pending.sort_by_key(|r| r.frame_id);

            for record in pending {
                self.append(record);
            }
        }

        debug!(
            "aggregated {} samples into {} tracks",
            self.set.num_samples(),
            self.set.len()
        );

        self.set
    }
}

/// Batch form of [`TrackAggregator`] in arrival order.
pub fn aggregate<I: IntoIterator<Item = TrackRecord>>(records: I) -> TrackSet {
    let mut aggregator = TrackAggregator::new();
    aggregator.extend(records);
    aggregator.finish()
}
