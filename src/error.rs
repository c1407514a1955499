//! Error taxonomy for the occupancy pipeline.
//!
//! Each error class maps to one recovery policy:
//! - `ConfigError`: zone configuration unreadable. `ZoneStore::load` degrades to an
//!   empty zone set and logs the diagnostic.
//! - `DetectionError`: the detector failed on one frame. The frame is skipped and
//!   the session continues.
//! - `SourceError`: the frame source failed irrecoverably. The session ends in the
//!   `Failed` state with its partial history.
//!
//! Source exhaustion is not an error: sources return `Ok(None)`.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    InvalidZone { name: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "zone config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "zone config {} is malformed: {}", path.display(), message)
            }
            ConfigError::InvalidZone { name, reason } => {
                write!(f, "invalid zone '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum DetectionError {
    /// The frame could not be handed to the detector (empty, wrong size, ...).
    InvalidFrame(String),
    /// The detector backend itself failed.
    Backend { backend: &'static str, message: String },
}

impl DetectionError {
    pub fn backend(backend: &'static str, err: impl fmt::Display) -> Self {
        DetectionError::Backend {
            backend,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionError::InvalidFrame(reason) => write!(f, "invalid frame: {}", reason),
            DetectionError::Backend { backend, message } => {
                write!(f, "detector '{}' failed: {}", backend, message)
            }
        }
    }
}

impl std::error::Error for DetectionError {}

#[derive(Debug)]
pub enum SourceError {
    /// Unrecoverable read/decode failure. Ends the session.
    Failure(String),
}

impl SourceError {
    pub fn failure(err: impl fmt::Display) -> Self {
        SourceError::Failure(err.to_string())
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Failure(reason) => write!(f, "frame source failed: {}", reason),
        }
    }
}

impl std::error::Error for SourceError {}
