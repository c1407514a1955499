//! Decoded frames flowing through the pipeline.
//!
//! - `Frame`: one RGB image plus its source-assigned index and capture instant.
//!
//! Indices are assigned by the frame source and strictly increase within one
//! source. Live sources may skip indices when stale frames are dropped.

use image::RgbImage;
use std::time::{Duration, Instant};

pub struct Frame {
    /// Source-assigned, strictly increasing.
    pub index: u64,
    pub image: RgbImage,
    captured_at: Instant,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self {
            index,
            image,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Time since the source produced this frame.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
