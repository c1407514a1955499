//! Local file frame source using FFmpeg.
//!
//! Frames are decoded in-memory and converted to RGB24. At end of stream the
//! decoder is flushed so trailing frames are not lost; after that the source
//! reports exhaustion.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;

use crate::error::SourceError;
use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_hint: Option<u64>,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let frame_hint = u64::try_from(input_stream.frames()).ok().filter(|n| *n > 0);
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "FileSource: opened {} (ffmpeg, {}x{}, {} frames)",
            path,
            decoder.width(),
            decoder.height(),
            frame_hint.map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            frame_hint,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn frames_decoded(&self) -> u64 {
        self.frame_count
    }

    pub(crate) fn len_hint(&self) -> Option<u64> {
        self.frame_hint
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if let Some(frame) = self.receive()? {
            return Ok(Some(frame));
        }
        if self.eof_sent {
            return Ok(None);
        }

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .map_err(|e| SourceError::failure(format!("{}: send packet: {}", self.path, e)))?;
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
        }

        self.decoder
            .send_eof()
            .map_err(|e| SourceError::failure(format!("{}: flush decoder: {}", self.path, e)))?;
        self.eof_sent = true;
        self.receive()
    }

    fn receive(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| SourceError::failure(format!("scale frame to RGB: {}", e)))?;
        let image = frame_to_image(&rgb_frame).map_err(SourceError::failure)?;

        let frame = Frame::new(self.frame_count, image);
        self.frame_count += 1;
        Ok(Some(frame))
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    RgbImage::from_raw(width, height, pixels).context("decoded frame size mismatch")
}
