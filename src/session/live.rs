//! Live streaming sessions.
//!
//! `LiveController` moves a session onto a consumer thread that pulls frames
//! from a `LiveReceiver`. The capture side publishes without blocking (see
//! `ingest::live`) and the consumer only ever processes the freshest frame.
//! Each result replaces the previous one in a `LatestSnapshot`, which readers
//! poll at their own pace.
//!
//! States: `Idle → Streaming → Stopped`. The controller never stops on frame
//! count; it stops when `stop()` is called or every publisher has been dropped.

use anyhow::{anyhow, bail, Result};
use image::RgbImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::ingest::{LiveReceiver, LiveRecv};
use crate::occupancy::OccupancyFrame;
use crate::report::{Completion, FinalReport};

use super::{CancelToken, Progress, Session};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Streaming,
    Stopped,
}

/// The most recent result of a live session.
#[derive(Clone, Debug)]
pub struct LiveSnapshot {
    pub occupancy: OccupancyFrame,
    pub annotated: RgbImage,
    pub progress: Progress,
}

/// Single-slot cell holding the latest snapshot. Writes replace, never queue.
#[derive(Clone, Default)]
pub struct LatestSnapshot {
    slot: Arc<Mutex<Option<Arc<LiveSnapshot>>>>,
    updates: Arc<AtomicU64>,
}

impl LatestSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: LiveSnapshot) {
        let snapshot = Arc::new(snapshot);
        // A poisoned slot still holds a complete value; keep using it.
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(snapshot);
        self.updates.fetch_add(1, Ordering::Release);
    }

    pub fn latest(&self) -> Option<Arc<LiveSnapshot>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of snapshots published so far.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }
}

struct ConsumerExit {
    session: Session,
    dropped: u64,
}

pub struct LiveController {
    state: LiveState,
    session: Option<Session>,
    snapshot: LatestSnapshot,
    stop: CancelToken,
    join: Option<JoinHandle<ConsumerExit>>,
}

impl LiveController {
    pub fn new(session: Session) -> Self {
        Self {
            state: LiveState::Idle,
            session: Some(session),
            snapshot: LatestSnapshot::new(),
            stop: CancelToken::new(),
            join: None,
        }
    }

    pub fn state(&self) -> LiveState {
        match (&self.state, &self.join) {
            (LiveState::Streaming, Some(join)) if join.is_finished() => LiveState::Stopped,
            (state, _) => *state,
        }
    }

    /// Handle for readers of the latest result.
    pub fn snapshot(&self) -> LatestSnapshot {
        self.snapshot.clone()
    }

    /// Token that stops the consumer when cancelled.
    pub fn stop_token(&self) -> CancelToken {
        self.stop.clone()
    }

    /// Spawn the consumer thread.
    pub fn start(&mut self, receiver: LiveReceiver) -> Result<()> {
        if self.state != LiveState::Idle {
            bail!("live session already started");
        }
        let session = self
            .session
            .take()
            .ok_or_else(|| anyhow!("live session already consumed"))?;
        let snapshot = self.snapshot.clone();
        let stop = self.stop.clone();
        let join = std::thread::Builder::new()
            .name("live-consumer".to_string())
            .spawn(move || consume(session, receiver, snapshot, stop))?;
        self.join = Some(join);
        self.state = LiveState::Streaming;
        log::info!("live session streaming");
        Ok(())
    }

    /// Ask the consumer to stop after the frame in flight.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Wait for the consumer to finish and build the report.
    ///
    /// Calling this on an `Idle` controller ends the session without frames.
    pub fn join(mut self) -> Result<FinalReport> {
        let (session, dropped) = match self.join.take() {
            Some(join) => {
                let exit = join
                    .join()
                    .map_err(|_| anyhow!("live consumer thread panicked"))?;
                (exit.session, exit.dropped)
            }
            None => {
                let session = self
                    .session
                    .take()
                    .ok_or_else(|| anyhow!("live session already consumed"))?;
                (session, 0)
            }
        };
        self.state = LiveState::Stopped;
        let mut report = session.end(Completion::Stopped);
        report.dropped_frames = dropped;
        Ok(report)
    }
}

fn consume(
    mut session: Session,
    receiver: LiveReceiver,
    snapshot: LatestSnapshot,
    stop: CancelToken,
) -> ConsumerExit {
    let mut processed = 0u64;
    while !stop.is_cancelled() {
        let frame = match receiver.recv_latest(POLL_INTERVAL) {
            LiveRecv::Frame(frame) => frame,
            LiveRecv::Idle => continue,
            LiveRecv::Closed => {
                log::info!("live source closed");
                break;
            }
        };
        let index = frame.index;
        let lag = frame.age();
        match session.tick(frame) {
            Ok(output) => {
                processed += 1;
                log::debug!("live frame {} processed {:?} after capture", index, lag);
                snapshot.publish(LiveSnapshot {
                    occupancy: output.occupancy,
                    annotated: output.annotated,
                    progress: Progress::Live {
                        processed,
                        last_update: Instant::now(),
                    },
                });
            }
            Err(err) => log::warn!("skipping live frame {}: {}", index, err),
        }
    }
    let dropped = receiver.dropped();
    if dropped > 0 {
        log::info!("live session dropped {} stale frame(s)", dropped);
    }
    ConsumerExit { session, dropped }
}
