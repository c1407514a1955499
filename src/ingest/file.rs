//! Local file frame source.
//!
//! This module provides `FileSource` for batch analysis of local video files.
//! The file source is responsible for:
//! - Reading frames from a local video file (no network access)
//! - Decoding video frames in-memory to RGB
//! - Assigning strictly increasing frame indices
//! - Reporting the stream's frame count when the container knows it
//!
//! `stub://` paths select a finite synthetic scene instead of a decoder.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::{FrameSource, SyntheticSource};
use crate::error::SourceError;
use crate::frame::Frame;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "/srv/uploads/lunch_rush.mp4") or `stub://<name>`.
    pub path: String,
    /// Frame size for synthetic scenes.
    pub width: u32,
    pub height: u32,
    /// Length of synthetic scenes.
    pub synthetic_frames: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            width: 640,
            height: 480,
            synthetic_frames: 600,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
    path: String,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        let path = config.path.clone();
        if config.path.starts_with("stub://") {
            log::info!("FileSource: opened {} (synthetic)", config.path);
            let source = SyntheticSource::new(config.width, config.height)
                .with_frame_limit(config.synthetic_frames);
            Ok(Self {
                backend: FileBackend::Synthetic(source),
                path,
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::open(&config.path)?),
                    path,
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "file ingestion requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        let frames_read = match &self.backend {
            FileBackend::Synthetic(source) => source.frames_generated(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frames_decoded(),
        };
        FileStats {
            frames_read,
            path: self.path.clone(),
        }
    }
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn len_hint(&self) -> Option<u64> {
        match &self.backend {
            FileBackend::Synthetic(source) => source.len_hint(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.len_hint(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_read: u64,
    pub path: String,
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_remote_urls() {
        let err = FileSource::open(FileConfig {
            path: "https://example.com/video.mp4".to_string(),
            ..FileConfig::default()
        });
        assert!(err.is_err());
        assert!(FileSource::open(FileConfig::default()).is_err());
    }

    #[test]
    fn stub_path_yields_finite_synthetic_frames() {
        let mut source = FileSource::open(FileConfig {
            path: "stub://dining_room".to_string(),
            width: 160,
            height: 120,
            synthetic_frames: 4,
        })
        .unwrap();
        assert_eq!(source.len_hint(), Some(4));
        let mut count = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.width(), 160);
            count += 1;
        }
        assert_eq!(count, 4);
        assert_eq!(source.stats().frames_read, 4);
    }
}
