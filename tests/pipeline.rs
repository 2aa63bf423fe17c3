use approx::assert_abs_diff_eq;
use pitchtrack::bbox::BBox;
use pitchtrack::config::{FrameOrder, SelectionPolicy};
use pitchtrack::detector::{ObjectStream, RecordedStream};
use pitchtrack::ranking::OrderBy;
use pitchtrack::records;
use pitchtrack::track::{aggregate, TrackAggregator};
use pitchtrack::video::{BlankSource, VideoMeta};
use pitchtrack::{Analysis, Config, Correspondence, Detection, Error, Frame, Session, TrackRecord};

const FRAMES: u64 = 150;

/// Two players walking across a 1280x720 view; player 7 runs twice as fast.
/// A third detection has no identity and must be ignored.
struct Walkers;

impl ObjectStream for Walkers {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        let t = frame.index as f64;
        let player = |id, x: f64, y: f64| {
            Detection::new(BBox::ltrb(x - 15.0, y - 80.0, x + 15.0, y), Some(id))
        };

        Ok(vec![
            player(3, 200.0 + 2.0 * t, 400.0),
            player(7, 100.0 + 4.0 * t, 600.0),
            Detection::new(BBox::ltrb(0.0, 0.0, 10.0, 10.0), None),
        ])
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.calibration.correspondences = vec![
        Correspondence::new((0.0, 0.0), (0.0, 0.0)),
        Correspondence::new((1280.0, 0.0), (105.0, 0.0)),
        Correspondence::new((0.0, 720.0), (0.0, 68.0)),
        Correspondence::new((1280.0, 720.0), (105.0, 68.0)),
    ];
    config.selection.distance = SelectionPolicy {
        min_samples: 100,
        top_n: 10,
        order_by: OrderBy::Distance,
    };
    config.selection.heatmap.min_samples = 100;
    config.selection.trajectory.min_samples = 100;
    config
}

fn source() -> BlankSource {
    BlankSource::new(VideoMeta {
        width: 1280,
        height: 720,
        fps: 25.0,
        frame_count: FRAMES,
    })
}

#[test]
fn video_to_report() {
    let session = Session::new(config()).unwrap();
    let run = session.track(source(), Walkers).unwrap();

    assert_eq!(run.field.len(), FRAMES as usize);
    assert_eq!(run.unmapped, 0);
    assert!(run.field.iter().all(|f| f.field_tracks.len() == 2));

    // persist and read back through the on-disk shape
    let mut buf = Vec::new();
    records::write_frames(&mut buf, &run.field).unwrap();
    let parsed = records::read_frames(buf.as_slice()).unwrap();
    assert_eq!(parsed.skipped, 0);

    let report = Analysis::new(config()).run_records(parsed);
    let scale = 105.0 / 1280.0;

    assert_eq!(report.num_tracks, 2);
    let ranked: Vec<_> = report.distance_ranking.iter().map(|e| e.track_id).collect();
    assert_eq!(ranked, vec![7, 3]);
    assert_abs_diff_eq!(
        report.distance_ranking[0].distance_m,
        4.0 * (FRAMES - 1) as f64 * scale,
        epsilon = 1e-4
    );
    assert_abs_diff_eq!(
        report.distance_ranking[1].distance_m,
        2.0 * (FRAMES - 1) as f64 * scale,
        epsilon = 1e-4
    );

    assert_eq!(report.heatmaps.len(), 2);
    for heatmap in &report.heatmaps {
        let max = heatmap
            .grid
            .iter()
            .flatten()
            .copied()
            .fold(f64::MIN, f64::max);
        assert_abs_diff_eq!(max, 1.0);
    }

    assert_eq!(report.trajectories.len(), 2);
    for traj in &report.trajectories {
        assert_eq!(traj.points.len(), FRAMES as usize);
        // the player walks along a constant image row, so field Y is constant
        let y0 = traj.points[0][1];
        assert!(traj.points.iter().all(|p| (p[1] - y0).abs() < 1e-6));
    }
}

#[test]
fn recorded_log_reproduces_live_run() {
    let session = Session::new(config()).unwrap();
    let live = session.track(source(), Walkers).unwrap();

    let mut buf = Vec::new();
    records::write_tracked_frames(&mut buf, &live.pixels).unwrap();
    let log = records::read_tracked_frames(buf.as_slice()).unwrap();
    assert_eq!(log, live.pixels);

    let replayed = session
        .track(source(), RecordedStream::new(log))
        .unwrap();
    assert_eq!(replayed.field, live.field);

    let remapped = session.remap(&live.pixels).unwrap();
    assert_eq!(remapped, live.field);
}

#[test]
fn session_analyzes_its_own_run() {
    let session = Session::new(config()).unwrap();
    let run = session.track(source(), Walkers).unwrap();

    let report = session.analyze(&run.field);

    assert_eq!(report.skipped_records, 0);
    assert_eq!(report.num_tracks, 2);
    let ranked: Vec<_> = report.distance_ranking.iter().map(|e| e.track_id).collect();
    assert_eq!(ranked, vec![7, 3]);
    assert_eq!(report.heatmaps.len(), 2);
    assert_eq!(report.trajectories.len(), 2);
}

#[test]
fn failed_calibration_aborts_the_session() {
    let mut config = config();
    config.calibration.correspondences.truncate(3);
    assert!(matches!(
        Session::new(config),
        Err(Error::InsufficientCorrespondences { got: 3 })
    ));

    let mut config = self::config();
    config.calibration.correspondences[1] = Correspondence::new((640.0, 360.0), (52.5, 34.0));
    config.calibration.correspondences[2] = Correspondence::new((1280.0, 720.0), (105.0, 68.0));
    assert!(matches!(
        Session::new(config),
        Err(Error::DegenerateGeometry(_))
    ));
}

#[test]
fn malformed_records_are_counted_not_fatal() {
    let json = r#"[
        { "frame_id": 0, "field_tracks": [
            { "track_id": 1, "field_pos": [1.0, 1.0] },
            { "track_id": 2, "field_pos": ["a", 1.0] }
        ] },
        { "frame_id": 1, "field_tracks": [
            { "track_id": 1, "field_pos": [2.0, 1.0] },
            { "track_id": 1 }
        ] }
    ]"#;

    let mut config = Config::default();
    config.selection.distance.min_samples = 0;
    let report = Analysis::new(config).run_records(records::read_frames(json.as_bytes()).unwrap());

    assert_eq!(report.skipped_records, 2);
    assert_eq!(report.num_tracks, 1);
    assert_abs_diff_eq!(report.distance_ranking[0].distance_m, 1.0);
}

#[test]
fn aggregation_scenario() {
    let set = aggregate(vec![
        TrackRecord::new(0, 1, 1.0, 1.0),
        TrackRecord::new(1, 1, 2.0, 1.0),
        TrackRecord::new(0, 2, 5.0, 5.0),
    ]);

    let xy = |id| -> Vec<(f64, f64)> {
        set.get(id)
            .unwrap()
            .positions
            .iter()
            .map(|p| (p.x, p.y))
            .collect()
    };
    assert_eq!(xy(1), vec![(1.0, 1.0), (2.0, 1.0)]);
    assert_eq!(xy(2), vec![(5.0, 5.0)]);
}

#[test]
fn out_of_order_frames_only_sorted_on_request() {
    let records = vec![
        TrackRecord::new(1, 1, 10.0, 0.0),
        TrackRecord::new(0, 1, 0.0, 0.0),
        TrackRecord::new(2, 1, 20.0, 0.0),
    ];

    let arrival = aggregate(records.clone());
    assert_eq!(arrival.get(1).unwrap().frames, vec![1, 0, 2]);

    let mut sorted = TrackAggregator::with_order(FrameOrder::SortByFrame);
    sorted.extend(records);
    let sorted = sorted.finish();
    assert_eq!(sorted.get(1).unwrap().frames, vec![0, 1, 2]);
}
