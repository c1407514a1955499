//! Push-based live frame feed.
//!
//! The capture layer owns a `FramePublisher` and pushes frames as they arrive;
//! the session side owns the `LiveReceiver`. The channel between them is
//! bounded and the publisher never blocks:
//! - when the queue is full, the oldest queued frame is evicted to make room
//! - when the consumer takes a frame, any newer queued frames replace it, so
//!   only the freshest frame is processed
//!
//! Evicted and coalesced frames are counted as dropped. Dropping the
//! publisher closes the feed.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::FrameSource;
use crate::error::SourceError;
use crate::frame::Frame;

/// Create a live feed holding at most `capacity` queued frames (minimum 1).
pub fn live_channel(capacity: usize) -> (FramePublisher, LiveReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let closed = Arc::new(AtomicBool::new(false));
    let publisher = FramePublisher {
        tx,
        evict: rx.clone(),
        next_index: 0,
        dropped: dropped.clone(),
        consumer_closed: closed.clone(),
    };
    let receiver = LiveReceiver {
        rx,
        dropped,
        closed,
    };
    (publisher, receiver)
}

pub struct FramePublisher {
    tx: Sender<Frame>,
    evict: Receiver<Frame>,
    next_index: u64,
    dropped: Arc<AtomicU64>,
    consumer_closed: Arc<AtomicBool>,
}

impl FramePublisher {
    /// Push a frame without blocking. Returns the index assigned to it.
    ///
    /// Fails only when the consumer side has been torn down.
    pub fn publish(&mut self, image: RgbImage) -> Result<u64, SourceError> {
        if self.consumer_closed.load(Ordering::Acquire) {
            return Err(SourceError::failure("live consumer has shut down"));
        }
        let index = self.next_index;
        self.next_index += 1;

        match self.tx.try_send(Frame::new(index, image)) {
            Ok(()) => Ok(index),
            Err(TrySendError::Full(frame)) => {
                if self.evict.try_recv().is_ok() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                if let Err(TrySendError::Full(_)) = self.tx.try_send(frame) {
                    // Consumer raced us for the slot; the new frame loses.
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Ok(index)
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(SourceError::failure("live consumer has shut down"))
            }
        }
    }

    /// Frames evicted or coalesced so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub enum LiveRecv {
    Frame(Frame),
    /// Nothing arrived within the timeout.
    Idle,
    /// The publisher is gone and the queue is drained.
    Closed,
}

pub struct LiveReceiver {
    rx: Receiver<Frame>,
    dropped: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl LiveReceiver {
    /// Wait up to `timeout` for a frame, then coalesce to the newest queued one.
    pub fn recv_latest(&self, timeout: Duration) -> LiveRecv {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => LiveRecv::Frame(self.coalesce(frame)),
            Err(RecvTimeoutError::Timeout) => LiveRecv::Idle,
            Err(RecvTimeoutError::Disconnected) => LiveRecv::Closed,
        }
    }

    fn coalesce(&self, mut frame: Frame) -> Frame {
        while let Ok(newer) = self.rx.try_recv() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            frame = newer;
        }
        frame
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for LiveReceiver {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl FrameSource for LiveReceiver {
    /// Blocks until a frame arrives; `None` once the publisher is dropped.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        match self.rx.recv() {
            Ok(frame) => Ok(Some(self.coalesce(frame))),
            Err(_) => Ok(None),
        }
    }
}
