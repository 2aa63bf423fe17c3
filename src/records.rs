//! Persisted per-frame record lists.
//!
//! Field log, one entry per frame in frame order:
//!
//! ```json
//! [{ "frame_id": 0, "field_tracks": [{ "track_id": 3, "field_pos": [12.5, 40.1] }] }]
//! ```
//!
//! Pixel log written next to it by the tracking stage:
//!
//! ```json
//! [{ "frame_id": 0, "tracks": [{ "track_id": 3, "bbox": [410, 220, 452, 330] }] }]
//! ```

use serde::Deserialize;
use serde_derive::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{debug, warn};

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;
use crate::track::TrackRecord;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct FieldTrack {
    pub track_id: i64,
    pub field_pos: [f64; 2],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FrameRecord {
    pub frame_id: u64,
    pub field_tracks: Vec<FieldTrack>,
}

impl FrameRecord {
    pub fn records(&self) -> impl Iterator<Item = TrackRecord> + '_ {
        self.field_tracks.iter().map(move |t| {
            TrackRecord::new(self.frame_id, t.track_id, t.field_pos[0], t.field_pos[1])
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PixelTrack {
    pub track_id: i64,
    pub bbox: BBox<Ltrb>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TrackedFrame {
    pub frame_id: u64,
    pub tracks: Vec<PixelTrack>,
}

/// Records recovered from a field log plus the number of entries dropped.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    pub records: Vec<TrackRecord>,
    pub skipped: usize,
}

/// Parses one `field_tracks` entry.
pub fn parse_entry(frame_id: u64, entry: &serde_json::Value) -> Result<TrackRecord, Error> {
    let track = FieldTrack::deserialize(entry)
        .map_err(|e| Error::malformed(Some(frame_id), e.to_string()))?;

    Ok(TrackRecord::new(
        frame_id,
        track.track_id,
        track.field_pos[0],
        track.field_pos[1],
    ))
}

/// Reads a field log, skipping and counting malformed entries.
///
/// A frame without a usable `frame_id` or `field_tracks` counts each of its
/// entries as skipped (at least one). Input that is not a JSON array at all is
/// an error.
pub fn read_frames<R: Read>(reader: R) -> Result<Parsed, Error> {
    let frames: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
    let mut parsed = Parsed::default();

    for (pos, frame) in frames.iter().enumerate() {
        let frame_id = frame.get("frame_id").and_then(serde_json::Value::as_u64);
        let entries = frame
            .get("field_tracks")
            .and_then(serde_json::Value::as_array);

        let (frame_id, entries) = match (frame_id, entries) {
            (Some(id), Some(entries)) => (id, entries),
            (id, entries) => {
                let dropped = entries.map_or(1, |e| e.len().max(1));
                let err = Error::malformed(
                    id,
                    format!("frame #{} lacks a valid frame_id or field_tracks", pos),
                );
                warn!("{}, skipping {} record(s)", err, dropped);
                parsed.skipped += dropped;
                continue;
            }
        };

        for entry in entries {
            match parse_entry(frame_id, entry) {
                Ok(record) => parsed.records.push(record),
                Err(err) => {
                    warn!("{}, skipping", err);
                    parsed.skipped += 1;
                }
            }
        }
    }

    debug!(
        "read {} records from {} frames, {} skipped",
        parsed.records.len(),
        frames.len(),
        parsed.skipped
    );

    Ok(parsed)
}

pub fn write_frames<W: Write>(writer: W, frames: &[FrameRecord]) -> Result<(), Error> {
    serde_json::to_writer_pretty(writer, frames)?;

    Ok(())
}

pub fn read_tracked_frames<R: Read>(reader: R) -> Result<Vec<TrackedFrame>, Error> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_tracked_frames<W: Write>(writer: W, frames: &[TrackedFrame]) -> Result<(), Error> {
    serde_json::to_writer_pretty(writer, frames)?;

    Ok(())
}
