//! Frame sources.
//!
//! This module provides the sources that feed frames into a session:
//! - Local video files (`FileSource`, FFmpeg decode behind `ingest-file-ffmpeg`)
//! - Synthetic scenes (`stub://` paths, `SyntheticSource`) for tests and demos
//! - Push-based live feeds (`live_channel`) for streaming sessions
//!
//! A source is a lazy, non-restartable sequence of frames. Finite sources
//! signal exhaustion with `Ok(None)`; only unrecoverable read failures are
//! errors.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod live;
pub mod synthetic;

pub use file::{FileConfig, FileSource};
pub use live::{live_channel, FramePublisher, LiveReceiver, LiveRecv};
pub use synthetic::SyntheticSource;

use crate::error::SourceError;
use crate::frame::Frame;

pub trait FrameSource {
    /// Next frame in arrival order, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Total number of frames, when the source knows it up front.
    fn len_hint(&self) -> Option<u64> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }

    fn len_hint(&self) -> Option<u64> {
        (**self).len_hint()
    }
}
