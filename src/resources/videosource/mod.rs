//! Video sources.
//!
//! A [`VideoSource`] is the playable media handle the uploader copies from.
//! It is owned by the world as a `NonSend` [`VideoSourceRes`] and read once
//! per fixed step through [`VideoSource::current_frame`].
//!
//! Implementations:
//! - [`testpattern::TestPatternSource`] – synthetic moving colour bars
//! - `remote::GstVideoSource` – decodes a remote URL with GStreamer (feature `video`)

#[cfg(feature = "video")]
pub mod remote;
pub mod testpattern;

use thiserror::Error;

/// Errors raised by a video source.
#[derive(Error, Debug)]
pub enum VideoSourceError {
    #[error("failed to initialize video source: {0}")]
    Init(String),
    #[error("video pipeline error: {0}")]
    Pipeline(String),
    #[error("video source disconnected")]
    Disconnected,
}

/// One decoded frame as packed RGB8, rows top to bottom, no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Create a frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * Self::BYTES_PER_PIXEL)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Number of bytes a frame of this size must carry.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * Self::BYTES_PER_PIXEL
    }
}

/// Playback parameters handed to a source at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoSourceSettings {
    /// Remote media URL.
    pub url: String,
    /// Start playing as soon as the source is created.
    pub autoplay: bool,
    /// Show native playback controls, when the source has any.
    pub controls: bool,
    /// Cross-origin mode sent with remote requests ("anonymous", "use-credentials" or empty).
    pub cross_origin: String,
    /// Intrinsic display size; decoded frames are scaled to it.
    pub width: u32,
    pub height: u32,
}

/// Notices a source reports to the ECS world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceNotice {
    /// The first frame has been decoded and can be uploaded.
    Ready { width: u32, height: u32 },
    /// Playback reached the end of the stream.
    EndOfStream,
    /// The pipeline failed; no further frames will arrive.
    Failed(String),
}

/// A playable media handle with a readable current frame.
pub trait VideoSource {
    fn settings(&self) -> &VideoSourceSettings;

    /// Start playback. Calling it on a playing source does nothing.
    fn play(&mut self) -> Result<(), VideoSourceError>;

    /// Drain notices produced since the last call. Never blocks.
    fn poll(&mut self) -> Vec<SourceNotice>;

    /// The most recently decoded frame, or `None` before the first decode.
    fn current_frame(&mut self) -> Option<&VideoFrame>;

    /// True once at least one frame has been decoded.
    fn is_ready(&self) -> bool;
}

/// Non-send world resource owning the active video source.
pub struct VideoSourceRes(pub Box<dyn VideoSource>);

impl VideoSourceRes {
    pub fn new(source: impl VideoSource + 'static) -> Self {
        Self(Box::new(source))
    }
}

impl std::ops::Deref for VideoSourceRes {
    type Target = dyn VideoSource;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl std::ops::DerefMut for VideoSourceRes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_frame_has_expected_len() {
        let frame = VideoFrame::solid(4, 2, [1, 2, 3]);
        assert_eq!(frame.pixels.len(), frame.expected_len());
        assert_eq!(&frame.pixels[..6], &[1, 2, 3, 1, 2, 3]);
    }
}
