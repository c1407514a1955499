use image::RgbImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;
use imageproc::point::Point as ContourPoint;

use crate::detect::backend::{ensure_non_empty, Detector};
use crate::detect::result::{BoundingBox, Detection, PERSON_CLASS_ID};
use crate::error::DetectionError;

pub const DEFAULT_THRESHOLD: u8 = 60;
pub const DEFAULT_MIN_CONTOUR_AREA: f64 = 500.0;

/// Sigma equivalent to a 7x7 Gaussian kernel.
const BLUR_SIGMA: f32 = 1.4;

/// CPU contour heuristic for people counting without a model.
///
/// Dark regions on a lighter background are treated as people: the frame is
/// converted to grayscale, blurred, inverse-thresholded, and every outer
/// contour whose enclosed area exceeds `min_contour_area` is reported as one
/// person with its bounding rectangle.
pub struct ContourBackend {
    threshold: u8,
    min_contour_area: f64,
    class_id: u32,
}

impl Default for ContourBackend {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_MIN_CONTOUR_AREA)
    }
}

impl ContourBackend {
    pub fn new(threshold: u8, min_contour_area: f64) -> Self {
        Self {
            threshold,
            min_contour_area,
            class_id: PERSON_CLASS_ID,
        }
    }

    /// Class id attached to reported blobs.
    pub fn with_class_id(mut self, class_id: u32) -> Self {
        self.class_id = class_id;
        self
    }
}

impl Detector for ContourBackend {
    fn name(&self) -> &'static str {
        "contour"
    }

    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, DetectionError> {
        ensure_non_empty(frame)?;

        let gray = image::imageops::grayscale(frame);
        let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
        let binary = threshold(&blurred, self.threshold, ThresholdType::BinaryInverted);

        let detections = find_contours::<i32>(&binary)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| polygon_area(&c.points) > self.min_contour_area)
            .filter_map(|c| bounding_rect(&c.points))
            .map(|bbox| Detection::new(self.class_id, 1.0, bbox))
            .collect::<Vec<_>>();

        log::debug!(
            "contour backend: {} blobs above area {}",
            detections.len(),
            self.min_contour_area
        );
        Ok(detections)
    }
}

fn polygon_area(points: &[ContourPoint<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0i64;
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (sum as f64 / 2.0).abs()
}

fn bounding_rect(points: &[ContourPoint<i32>]) -> Option<BoundingBox> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    // Contour points are pixel centres; the rectangle covers whole pixels.
    BoundingBox::new(
        min_x as f32,
        min_y as f32,
        (max_x + 1) as f32,
        (max_y + 1) as f32,
    )
}
