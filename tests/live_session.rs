use image::RgbImage;
use std::time::{Duration, Instant};

use zone_occupancy::detect::ScriptedBackend;
use zone_occupancy::{
    live_channel, BoundingBox, Completion, Detection, LiveController, LiveState, Progress,
    Session, SessionConfig, SessionMode, Vertex, Zone, ZoneSet,
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

fn live_session() -> Session {
    let person = Detection::person(BoundingBox::new(2.0, 2.0, 6.0, 6.0).unwrap(), 0.8);
    Session::start(
        SessionConfig::live(Some(100)),
        table1(),
        Box::new(ScriptedBackend::constant(vec![person])),
    )
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn controller_stops_when_publisher_is_dropped() {
    let mut controller = LiveController::new(live_session());
    assert_eq!(controller.state(), LiveState::Idle);
    let snapshot = controller.snapshot();

    let (mut publisher, receiver) = live_channel(2);
    controller.start(receiver).expect("start live session");
    assert_eq!(controller.state(), LiveState::Streaming);

    publisher.publish(RgbImage::new(16, 16)).expect("publish");
    assert!(wait_until(Duration::from_secs(5), || snapshot.updates() >= 1));
    let latest = snapshot.latest().expect("snapshot published");
    assert_eq!(latest.occupancy.count_for("Table1"), 1);
    assert_eq!(latest.occupancy.global_person_count, 1);
    assert!(matches!(latest.progress, Progress::Live { processed: 1, .. }));

    drop(publisher);
    assert!(wait_until(Duration::from_secs(5), || {
        controller.state() == LiveState::Stopped
    }));

    let report = controller.join().expect("join live session");
    assert_eq!(report.mode, SessionMode::Live);
    assert_eq!(report.completion, Completion::Stopped);
    assert!(report.history.len() >= 1);
    assert_eq!(report.zone_series("Table1")[0], 1);
}

#[test]
fn publisher_never_blocks_while_consumer_is_busy() {
    let mut controller = LiveController::new(live_session());
    let snapshot = controller.snapshot();
    let (mut publisher, receiver) = live_channel(1);
    controller.start(receiver).expect("start live session");

    let started = Instant::now();
    let mut last_index = 0;
    for _ in 0..500 {
        last_index = publisher.publish(RgbImage::new(64, 64)).expect("publish");
    }
    // Publishing is fire-and-forget; 500 frames must not wait on processing.
    assert!(started.elapsed() < Duration::from_secs(5));

    // The freshest frame is eventually processed.
    assert!(wait_until(Duration::from_secs(5), || {
        snapshot
            .latest()
            .is_some_and(|s| s.occupancy.frame_index == last_index)
    }));

    drop(publisher);
    let report = controller.join().expect("join live session");
    let processed = report.frames_read;
    assert!(processed <= 500);
    assert_eq!(processed + report.dropped_frames, 500);
    assert_eq!(
        report.history.len() as u64 + report.evicted_frames,
        processed
    );
}

#[test]
fn stop_ends_a_live_session_with_an_open_feed() {
    let mut controller = LiveController::new(live_session());
    let (mut publisher, receiver) = live_channel(2);
    controller.start(receiver).expect("start live session");
    publisher.publish(RgbImage::new(16, 16)).expect("publish");

    controller.stop();
    let report = controller.join().expect("join live session");
    assert_eq!(report.completion, Completion::Stopped);

    // The consumer is gone, so further publishing fails.
    assert!(publisher.publish(RgbImage::new(16, 16)).is_err());
}
