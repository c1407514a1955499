use image::RgbImage;

use zone_occupancy::detect::{ContourBackend, ScriptedBackend};
use zone_occupancy::ingest::SyntheticSource;
use zone_occupancy::{
    run_batch, BatchState, BoundingBox, CancelToken, Completion, Detection, Frame, FrameSource,
    Progress, Session, SessionConfig, SourceError, Vertex, Zone, ZoneSet,
};

fn table1() -> ZoneSet {
    let zone = Zone::new(
        "Table1",
        vec![
            Vertex::new(0, 0),
            Vertex::new(10, 0),
            Vertex::new(10, 10),
            Vertex::new(0, 10),
        ],
    )
    .expect("valid zone");
    [zone].into_iter().collect()
}

fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::person(BoundingBox::new(x1, y1, x2, y2).expect("valid box"), 0.9)
}

/// Blank frames, failing with a source error once `fail_at` frames were read.
struct FlakySource {
    next: u64,
    len: u64,
    fail_at: Option<u64>,
}

impl FrameSource for FlakySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.fail_at == Some(self.next) {
            return Err(SourceError::failure("decoder lost sync"));
        }
        if self.next >= self.len {
            return Ok(None);
        }
        let frame = Frame::new(self.next, RgbImage::new(16, 16));
        self.next += 1;
        Ok(Some(frame))
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.len)
    }
}

fn frames(len: u64) -> FlakySource {
    FlakySource {
        next: 0,
        len,
        fail_at: None,
    }
}

#[test]
fn single_person_in_single_zone() {
    let detector = ScriptedBackend::constant(vec![person(2.0, 2.0, 6.0, 6.0)]);
    let session = Session::start(SessionConfig::batch(None), table1(), Box::new(detector));
    let report = run_batch(session, &mut frames(1), &CancelToken::new(), |_, _| {});

    assert!(report.is_complete());
    let frame = &report.history[0];
    assert_eq!(
        frame.per_zone_counts,
        [("Table1".to_string(), 1)].into_iter().collect()
    );
    assert_eq!(frame.global_person_count, 1);
}

#[test]
fn no_zones_counts_globally() {
    let detector = ScriptedBackend::constant(vec![
        person(2.0, 2.0, 6.0, 6.0),
        person(20.0, 20.0, 30.0, 40.0),
    ]);
    let session = Session::start(SessionConfig::batch(None), ZoneSet::new(), Box::new(detector));
    let report = run_batch(session, &mut frames(1), &CancelToken::new(), |_, _| {});

    assert!(report.history[0].per_zone_counts.is_empty());
    assert_eq!(report.history[0].global_person_count, 2);
    assert!(report.summary.zones.is_empty());
}

#[test]
fn frame_cap_truncates_long_source() {
    let session = Session::start(
        SessionConfig::batch(Some(300)),
        table1(),
        Box::new(ScriptedBackend::empty()),
    );
    let mut last = None;
    let report = run_batch(session, &mut frames(500), &CancelToken::new(), |p, _| {
        last = Some(p.clone());
    });

    assert_eq!(report.history.len(), 300);
    assert_eq!(report.frames_read, 300);
    assert_eq!(report.completion, Completion::Truncated { cap: 300 });
    assert!(report.is_truncated());
    assert_eq!(report.status_line().split(" (").next(), Some("analysis truncated at 300 frames"));
    assert_eq!(
        last,
        Some(Progress::Batch {
            processed: 300,
            total: Some(300)
        })
    );
}

#[test]
fn disabled_cap_processes_everything() {
    let session = Session::start(
        SessionConfig::batch(None),
        table1(),
        Box::new(ScriptedBackend::empty()),
    );
    let report = run_batch(session, &mut frames(500), &CancelToken::new(), |_, _| {});
    assert_eq!(report.history.len(), 500);
    assert!(report.is_complete());
}

#[test]
fn detection_failures_skip_frames() {
    let detector = ScriptedBackend::constant(vec![person(2.0, 2.0, 6.0, 6.0)]).failing_on([1, 3]);
    let session = Session::start(SessionConfig::batch(None), table1(), Box::new(detector));
    let mut skipped_callbacks = 0;
    let report = run_batch(session, &mut frames(5), &CancelToken::new(), |_, output| {
        if output.is_none() {
            skipped_callbacks += 1;
        }
    });

    assert!(report.is_complete());
    assert_eq!(skipped_callbacks, 2);
    assert_eq!(report.skipped_frames, vec![1, 3]);
    assert_eq!(report.frame_indices(), vec![0, 2, 4]);
    assert_eq!(report.zone_series("Table1"), vec![1, 1, 1]);
}

#[test]
fn skipped_frames_count_against_the_cap() {
    let detector = ScriptedBackend::empty().failing_on([0, 1]);
    let session = Session::start(SessionConfig::batch(Some(3)), table1(), Box::new(detector));
    let report = run_batch(session, &mut frames(10), &CancelToken::new(), |_, _| {});
    assert_eq!(report.frames_read, 3);
    assert_eq!(report.history.len(), 1);
    assert!(report.is_truncated());
}

#[test]
fn source_failure_keeps_partial_history() {
    let mut source = FlakySource {
        next: 0,
        len: 10,
        fail_at: Some(4),
    };
    let session = Session::start(
        SessionConfig::batch(None),
        table1(),
        Box::new(ScriptedBackend::empty()),
    );
    let report = run_batch(session, &mut source, &CancelToken::new(), |_, _| {});

    assert_eq!(BatchState::of(&report.completion), BatchState::Failed);
    match &report.completion {
        Completion::Failed { reason } => assert!(reason.contains("decoder lost sync")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(report.history.len(), 4);
    assert!(!report.is_complete());
}

#[test]
fn cancellation_stops_between_frames() {
    let cancel = CancelToken::new();
    let session = Session::start(
        SessionConfig::batch(None),
        table1(),
        Box::new(ScriptedBackend::empty()),
    );
    let report = run_batch(session, &mut frames(100), &cancel, |p, _| {
        if p.processed() == 7 {
            cancel.cancel();
        }
    });

    assert_eq!(report.completion, Completion::Cancelled);
    assert_eq!(report.history.len(), 7);
}

#[test]
fn contour_detector_counts_synthetic_people() {
    let whole_frame = Zone::new(
        "Floor",
        vec![
            Vertex::new(0, 0),
            Vertex::new(320, 0),
            Vertex::new(320, 240),
            Vertex::new(0, 240),
        ],
    )
    .expect("valid zone");
    let zones: ZoneSet = [whole_frame].into_iter().collect();
    let mut source = SyntheticSource::new(320, 240)
        .with_people(1)
        .with_frame_limit(5);
    let session = Session::start(
        SessionConfig::batch(None),
        zones,
        Box::new(ContourBackend::default()),
    );
    let report = run_batch(session, &mut source, &CancelToken::new(), |_, _| {});

    assert_eq!(report.history.len(), 5);
    assert_eq!(report.global_series(), vec![1; 5]);
    assert_eq!(report.zone_series("Floor"), vec![1; 5]);
    assert_eq!(report.summary.zones["Floor"].max, 1);
}
