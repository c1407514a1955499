mod backend;
mod backends;
mod result;

use anyhow::Result;

pub use backend::Detector;
pub use backends::{ContourBackend, ScriptedBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BoundingBox, Detection, PERSON_CLASS_ID};

use crate::config::{DetectorKind, DetectorSettings};

/// Build the configured detector. Model files are loaded here, once per session.
pub fn open_backend(settings: &DetectorSettings) -> Result<Box<dyn Detector>> {
    let backend: Box<dyn Detector> = match settings.kind {
        DetectorKind::Contour => Box::new(
            ContourBackend::new(settings.threshold, settings.min_contour_area)
                .with_class_id(settings.person_class_id),
        ),
        DetectorKind::Stub => Box::new(ScriptedBackend::empty()),
        DetectorKind::Tract => open_tract(settings)?,
    };
    log::info!("detector backend '{}' ready", backend.name());
    Ok(backend)
}

#[cfg(feature = "backend-tract")]
fn open_tract(settings: &DetectorSettings) -> Result<Box<dyn Detector>> {
    let model_path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("tract detector requires a model path"))?;
    let backend = TractBackend::new(model_path, settings.input_width, settings.input_height)?
        .with_thresholds(settings.confidence_threshold, settings.iou_threshold);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(_settings: &DetectorSettings) -> Result<Box<dyn Detector>> {
    anyhow::bail!("tract detector requires the backend-tract feature")
}
