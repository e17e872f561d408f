//! Synthetic video source.
//!
//! Produces vertical colour bars that scroll one bar-width every
//! [`TestPatternSource::FRAMES_PER_CYCLE`] frames. Useful without network
//! access, for headless runs, and in tests.

use log::info;

use super::{SourceNotice, VideoFrame, VideoSource, VideoSourceError, VideoSourceSettings};

const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

pub struct TestPatternSource {
    settings: VideoSourceSettings,
    playing: bool,
    announced: bool,
    tick: u64,
    frame: VideoFrame,
}

impl TestPatternSource {
    pub const FRAMES_PER_CYCLE: u64 = 60;

    /// Create the source; starts immediately when `settings.autoplay` is set.
    pub fn new(settings: VideoSourceSettings) -> Self {
        let frame = VideoFrame::solid(settings.width, settings.height, [0, 0, 0]);
        let playing = settings.autoplay;
        Self {
            settings,
            playing,
            announced: false,
            tick: 0,
            frame,
        }
    }

    /// Frames produced so far.
    pub fn frames_produced(&self) -> u64 {
        self.tick
    }

    fn render(&mut self) {
        let width = self.frame.width as usize;
        let height = self.frame.height as usize;
        if width == 0 || height == 0 {
            return;
        }
        let bar_width = width.div_ceil(BARS.len()).max(1);
        let shift = ((self.tick % Self::FRAMES_PER_CYCLE) as usize * bar_width)
            / Self::FRAMES_PER_CYCLE as usize;

        let row_len = width * VideoFrame::BYTES_PER_PIXEL;
        let (first_row, rest) = self.frame.pixels.split_at_mut(row_len);
        for (x, px) in first_row
            .chunks_exact_mut(VideoFrame::BYTES_PER_PIXEL)
            .enumerate()
        {
            let bar = ((x + shift) / bar_width) % BARS.len();
            px.copy_from_slice(&BARS[bar]);
        }
        for row in rest.chunks_exact_mut(row_len) {
            row.copy_from_slice(first_row);
        }
    }
}

impl VideoSource for TestPatternSource {
    fn settings(&self) -> &VideoSourceSettings {
        &self.settings
    }

    fn play(&mut self) -> Result<(), VideoSourceError> {
        if !self.playing {
            info!("Test pattern playing at {}x{}", self.frame.width, self.frame.height);
            self.playing = true;
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<SourceNotice> {
        if self.playing && !self.announced {
            self.announced = true;
            return vec![SourceNotice::Ready {
                width: self.frame.width,
                height: self.frame.height,
            }];
        }
        Vec::new()
    }

    fn current_frame(&mut self) -> Option<&VideoFrame> {
        if !self.playing {
            return None;
        }
        self.render();
        self.tick += 1;
        Some(&self.frame)
    }

    fn is_ready(&self) -> bool {
        self.playing
    }
}
