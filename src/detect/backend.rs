use image::RgbImage;

use crate::detect::result::Detection;
use crate::error::DetectionError;

/// Detector boundary.
///
/// A detector turns one RGB frame into a list of detections. It is
/// class-agnostic: filtering to the person class is the caller's job.
///
/// Calls are synchronous and never retried. A session owns its detector
/// exclusively and calls it for one frame at a time; implementations need not
/// be safe for concurrent use.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, DetectionError>;

    /// Optional warm-up hook, called once when a session starts.
    fn warm_up(&mut self) -> Result<(), DetectionError> {
        Ok(())
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, DetectionError> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<(), DetectionError> {
        (**self).warm_up()
    }
}

pub(crate) fn ensure_non_empty(frame: &RgbImage) -> Result<(), DetectionError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(DetectionError::InvalidFrame(format!(
            "frame has zero extent ({}x{})",
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}
