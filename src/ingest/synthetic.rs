//! Synthetic scene generator.
//!
//! Renders a light background with dark square "people" wandering around and
//! bouncing off the frame edges. The contour detector picks them up, which makes
//! the generator usable for end-to-end runs without a video file or a model.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::FrameSource;
use crate::error::SourceError;
use crate::frame::Frame;

const BACKGROUND: Rgb<u8> = Rgb([225, 225, 225]);
const FIGURE: Rgb<u8> = Rgb([15, 15, 15]);
const FIGURE_SIZE: u32 = 40;
const MAX_SPEED: f32 = 6.0;

struct Walker {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
}

pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    next_index: u64,
    walkers: Vec<Walker>,
    rng: StdRng,
}

impl SyntheticSource {
    /// Unbounded scene with three figures.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(FIGURE_SIZE * 2);
        let height = height.max(FIGURE_SIZE * 2);
        let mut source = Self {
            width,
            height,
            frame_limit: None,
            next_index: 0,
            walkers: Vec::new(),
            rng: StdRng::seed_from_u64(7),
        };
        source.spawn_walkers(3);
        source
    }

    pub fn with_people(mut self, people: usize) -> Self {
        self.walkers.clear();
        self.spawn_walkers(people);
        self
    }

    /// Stop after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        let people = self.walkers.len();
        self.rng = StdRng::seed_from_u64(seed);
        self.walkers.clear();
        self.spawn_walkers(people);
        self
    }

    pub fn frames_generated(&self) -> u64 {
        self.next_index
    }

    fn spawn_walkers(&mut self, people: usize) {
        let max_x = (self.width - FIGURE_SIZE) as f32;
        let max_y = (self.height - FIGURE_SIZE) as f32;
        for _ in 0..people {
            let walker = Walker {
                x: self.rng.gen_range(0.0..max_x),
                y: self.rng.gen_range(0.0..max_y),
                dx: self.rng.gen_range(-MAX_SPEED..MAX_SPEED),
                dy: self.rng.gen_range(-MAX_SPEED..MAX_SPEED),
            };
            self.walkers.push(walker);
        }
    }

    /// Render the current scene, then move every figure one step.
    pub fn render_next(&mut self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        for w in &self.walkers {
            let rect = Rect::at(w.x as i32, w.y as i32).of_size(FIGURE_SIZE, FIGURE_SIZE);
            draw_filled_rect_mut(&mut img, rect, FIGURE);
        }

        let max_x = (self.width - FIGURE_SIZE) as f32;
        let max_y = (self.height - FIGURE_SIZE) as f32;
        for w in &mut self.walkers {
            w.dx = (w.dx + self.rng.gen_range(-0.5..0.5)).clamp(-MAX_SPEED, MAX_SPEED);
            w.dy = (w.dy + self.rng.gen_range(-0.5..0.5)).clamp(-MAX_SPEED, MAX_SPEED);
            w.x += w.dx;
            w.y += w.dy;
            if w.x < 0.0 || w.x > max_x {
                w.dx = -w.dx;
                w.x = w.x.clamp(0.0, max_x);
            }
            if w.y < 0.0 || w.y > max_y {
                w.dy = -w.dy;
                w.y = w.y.clamp(0.0, max_y);
            }
        }
        img
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.frame_limit.is_some_and(|limit| self.next_index >= limit) {
            return Ok(None);
        }
        let image = self.render_next();
        let frame = Frame::new(self.next_index, image);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn len_hint(&self) -> Option<u64> {
        self.frame_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_source_is_exhausted_after_limit() {
        let mut source = SyntheticSource::new(160, 120).with_frame_limit(3);
        assert_eq!(source.len_hint(), Some(3));
        let indices: Vec<u64> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn frames_contain_figures() {
        let mut source = SyntheticSource::new(160, 120).with_people(1);
        let frame = source.next_frame().unwrap().unwrap();
        let dark = frame.image.pixels().filter(|p| p[0] < 50).count();
        assert_eq!(dark, (FIGURE_SIZE * FIGURE_SIZE) as usize);
    }

    #[test]
    fn same_seed_renders_same_scene() {
        let mut a = SyntheticSource::new(160, 120).with_seed(42);
        let mut b = SyntheticSource::new(160, 120).with_seed(42);
        for _ in 0..5 {
            assert_eq!(a.render_next(), b.render_next());
        }
    }
}
