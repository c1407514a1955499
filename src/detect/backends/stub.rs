use image::RgbImage;
use std::collections::BTreeSet;

use crate::detect::backend::{ensure_non_empty, Detector};
use crate::detect::result::Detection;
use crate::error::DetectionError;

/// Scripted backend for tests and synthetic runs.
///
/// Each call returns the next entry of the script, cycling when the script is
/// exhausted. An empty script always returns no detections. Selected calls
/// (0-based) can be made to fail with a backend error.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    script: Vec<Vec<Detection>>,
    fail_on: BTreeSet<u64>,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script,
            fail_on: BTreeSet::new(),
            calls: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the same detections on every call.
    pub fn constant(detections: Vec<Detection>) -> Self {
        Self::new(vec![detections])
    }

    pub fn failing_on(mut self, calls: impl IntoIterator<Item = u64>) -> Self {
        self.fail_on.extend(calls);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Detector for ScriptedBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, DetectionError> {
        ensure_non_empty(frame)?;
        let call = self.calls;
        self.calls += 1;

        if self.fail_on.contains(&call) {
            return Err(DetectionError::backend(
                "stub",
                format!("scripted failure on call {}", call),
            ));
        }
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let idx = (call % self.script.len() as u64) as usize;
        Ok(self.script[idx].clone())
    }
}
