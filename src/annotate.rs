//! Frame annotation.
//!
//! Draws on a copy of the frame:
//! - zone outlines and zone names in green
//! - person boxes in blue with a caption above each box
//! - per-zone counts in red, below-left of the zone centroid
//!
//! Labels use the bundled DejaVu Sans unless another font is configured.

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::detect::{Detection, PERSON_CLASS_ID};
use crate::zones::{Zone, ZoneSet};

const ZONE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const PERSON_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const COUNT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const NAME_OFFSET: (f64, f64) = (-20.0, -20.0);
const COUNT_OFFSET: (f64, f64) = (-10.0, 10.0);
const CAPTION_GAP: f32 = 14.0;

static DEJAVU_SANS: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// The bundled label font, parsed once.
pub fn default_font() -> Option<FontArc> {
    static FONT: OnceLock<Option<FontArc>> = OnceLock::new();
    FONT.get_or_init(|| match FontArc::try_from_slice(DEJAVU_SANS) {
        Ok(font) => Some(font),
        Err(err) => {
            log::warn!("bundled label font unusable ({}); frames get shapes only", err);
            None
        }
    })
    .clone()
}

pub struct FrameAnnotator {
    font: Option<FontArc>,
    scale: PxScale,
    person_class_id: u32,
    caption: String,
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new(default_font())
    }
}

impl FrameAnnotator {
    /// `None` draws shapes only.
    pub fn new(font: Option<FontArc>) -> Self {
        Self {
            font,
            scale: PxScale::from(16.0),
            person_class_id: PERSON_CLASS_ID,
            caption: "person".to_string(),
        }
    }

    /// Load a TTF/OTF font for labels.
    pub fn with_font_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("read font file {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .with_context(|| format!("parse font file {}", path.display()))?;
        Ok(Self::new(Some(font)))
    }

    pub fn with_person_class(mut self, class_id: u32) -> Self {
        self.person_class_id = class_id;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_text_scale(mut self, px: f32) -> Self {
        self.scale = PxScale::from(px);
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn annotate(
        &self,
        frame: &RgbImage,
        detections: &[Detection],
        zones: &ZoneSet,
        counts: &BTreeMap<String, u32>,
    ) -> RgbImage {
        let mut canvas = frame.clone();
        if canvas.width() == 0 || canvas.height() == 0 {
            return canvas;
        }

        for zone in zones.iter() {
            draw_polygon_outline(&mut canvas, zone, ZONE_COLOR);
            // Zero-area polygons have no centroid to anchor labels on.
            let Some(centroid) = zone.centroid() else {
                continue;
            };
            self.draw_label(
                &mut canvas,
                zone.name(),
                centroid.x + NAME_OFFSET.0,
                centroid.y + NAME_OFFSET.1,
                ZONE_COLOR,
            );
            let count = counts.get(zone.name()).copied().unwrap_or(0);
            self.draw_label(
                &mut canvas,
                &count.to_string(),
                centroid.x + COUNT_OFFSET.0,
                centroid.y + COUNT_OFFSET.1,
                COUNT_COLOR,
            );
        }

        for det in detections
            .iter()
            .filter(|d| d.class_id == self.person_class_id)
        {
            let bbox = &det.bbox;
            let width = bbox.width().round().max(1.0) as u32;
            let height = bbox.height().round().max(1.0) as u32;
            let rect = Rect::at(bbox.x1.round() as i32, bbox.y1.round() as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(&mut canvas, rect, PERSON_COLOR);
            self.draw_label(
                &mut canvas,
                &self.caption,
                f64::from(bbox.x1),
                f64::from(bbox.y1 - CAPTION_GAP),
                PERSON_COLOR,
            );
        }

        canvas
    }

    fn draw_label(&self, canvas: &mut RgbImage, text: &str, x: f64, y: f64, color: Rgb<u8>) {
        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                color,
                x.round() as i32,
                y.round() as i32,
                self.scale,
                font,
                text,
            );
        }
    }
}

fn draw_polygon_outline(canvas: &mut RgbImage, zone: &Zone, color: Rgb<u8>) {
    let vertices = zone.vertices();
    for (i, a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        draw_line_segment_mut(
            canvas,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::zones::Vertex;

    fn shapes_only() -> FrameAnnotator {
        FrameAnnotator::new(None)
    }

    fn blank() -> RgbImage {
        RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]))
    }

    fn zones() -> ZoneSet {
        let zone = Zone::new(
            "Table1",
            vec![
                Vertex::new(5, 5),
                Vertex::new(30, 5),
                Vertex::new(30, 30),
                Vertex::new(5, 30),
            ],
        )
        .unwrap();
        [zone].into_iter().collect()
    }

    #[test]
    fn empty_inputs_leave_frame_unchanged() {
        let frame = blank();
        let out = shapes_only().annotate(&frame, &[], &ZoneSet::new(), &BTreeMap::new());
        assert_eq!(out, frame);
    }

    #[test]
    fn zone_outline_is_green() {
        let frame = blank();
        let out = shapes_only().annotate(&frame, &[], &zones(), &BTreeMap::new());
        assert_eq!(*out.get_pixel(5, 5), ZONE_COLOR);
        assert_eq!(*out.get_pixel(17, 30), ZONE_COLOR);
        // Interior untouched, input untouched.
        assert_eq!(*out.get_pixel(17, 17), Rgb([255, 255, 255]));
        assert_eq!(*frame.get_pixel(5, 5), Rgb([255, 255, 255]));
    }

    #[test]
    fn person_boxes_are_blue_and_other_classes_skipped() {
        let frame = blank();
        let person = Detection::person(BoundingBox::new(40.0, 10.0, 50.0, 40.0).unwrap(), 0.9);
        let cup = Detection::new(41, 0.9, BoundingBox::new(2.0, 40.0, 10.0, 46.0).unwrap());
        let out = shapes_only().annotate(&frame, &[person, cup], &ZoneSet::new(), &BTreeMap::new());
        assert_eq!(*out.get_pixel(40, 10), PERSON_COLOR);
        assert_eq!(*out.get_pixel(2, 40), Rgb([255, 255, 255]));
    }

    #[test]
    fn boxes_outside_the_frame_do_not_panic() {
        let frame = blank();
        let far = Detection::person(BoundingBox::new(500.0, 500.0, 600.0, 700.0).unwrap(), 0.5);
        let edge = Detection::person(BoundingBox::new(-10.0, -10.0, 0.5, 0.5).unwrap(), 0.5);
        let out = shapes_only().annotate(&frame, &[far, edge], &zones(), &BTreeMap::new());
        assert_eq!(out.dimensions(), frame.dimensions());
    }

    #[test]
    fn degenerate_zone_draws_outline_only() {
        let line = Zone::new(
            "Line",
            vec![Vertex::new(0, 0), Vertex::new(10, 10), Vertex::new(20, 20)],
        )
        .unwrap();
        let set: ZoneSet = [line].into_iter().collect();
        let out = shapes_only().annotate(&blank(), &[], &set, &BTreeMap::new());
        assert_eq!(*out.get_pixel(10, 10), ZONE_COLOR);
    }

    // Some pixel in the region is saturated in `channel` and clearly not white.
    fn has_tint(
        image: &RgbImage,
        xs: std::ops::Range<u32>,
        ys: std::ops::Range<u32>,
        channel: usize,
    ) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y))).any(|(x, y)| {
            let p = image.get_pixel(x, y).0;
            p[channel] == 255 && p.iter().enumerate().any(|(c, &v)| c != channel && v < 200)
        })
    }

    #[test]
    fn default_annotator_draws_names_and_counts() {
        let annotator = FrameAnnotator::default();
        assert!(annotator.has_font());

        let frame = RgbImage::from_pixel(200, 150, Rgb([255, 255, 255]));
        let zone = Zone::new(
            "Table1",
            vec![
                Vertex::new(40, 40),
                Vertex::new(160, 40),
                Vertex::new(160, 120),
                Vertex::new(40, 120),
            ],
        )
        .unwrap();
        let set: ZoneSet = [zone].into_iter().collect();
        let counts: BTreeMap<String, u32> = [("Table1".to_string(), 3)].into_iter().collect();

        let plain = shapes_only().annotate(&frame, &[], &set, &counts);
        let out = annotator.annotate(&frame, &[], &set, &counts);
        // Centroid (100, 80): name from (80, 60), count from (90, 90).
        assert!(has_tint(&out, 80..140, 60..80, 1));
        assert!(has_tint(&out, 88..112, 88..112, 0));
        assert!(!has_tint(&plain, 80..140, 60..80, 1));
        assert!(!has_tint(&plain, 88..112, 88..112, 0));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(FrameAnnotator::with_font_file("/nonexistent/font.ttf").is_err());
    }
}
