//! Remote video source backed by GStreamer.
//!
//! Pipeline: `uridecodebin → videoconvert → videoscale → appsink (RGB)`
//!
//! Decoding runs on GStreamer's streaming threads. The appsink callback
//! converts each sample to a tightly packed [`VideoFrame`] and hands it to
//! the main thread over a small bounded channel; when the main thread falls
//! behind, new frames are dropped rather than queued. Bus messages (errors,
//! end of stream) are popped without blocking in [`VideoSource::poll`].

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use log::{debug, error, info, warn};

use super::{SourceNotice, VideoFrame, VideoSource, VideoSourceError, VideoSourceSettings};

const FRAME_QUEUE: usize = 2;

pub struct GstVideoSource {
    settings: VideoSourceSettings,
    pipeline: gst::Pipeline,
    rx_frame: Receiver<VideoFrame>,
    frame: Option<VideoFrame>,
    playing: bool,
    announced: bool,
    failed: bool,
}

impl GstVideoSource {
    /// Build the decoding pipeline for `settings.url`. Playback starts right
    /// away when `settings.autoplay` is set.
    pub fn open(settings: VideoSourceSettings) -> Result<Self, VideoSourceError> {
        gst::init().map_err(|e| VideoSourceError::Init(format!("GStreamer init failed: {}", e)))?;
        info!("GStreamer initialized: version {}", gst::version_string());

        if settings.controls {
            debug!("Playback controls requested; GStreamer source has none");
        }
        if !settings.cross_origin.is_empty() {
            debug!(
                "cross_origin='{}' has no effect on GStreamer requests",
                settings.cross_origin
            );
        }

        let (tx_frame, rx_frame) = bounded::<VideoFrame>(FRAME_QUEUE);
        let pipeline = build_pipeline(&settings, tx_frame)?;

        let mut source = Self {
            settings,
            pipeline,
            rx_frame,
            frame: None,
            playing: false,
            announced: false,
            failed: false,
        };
        if source.settings.autoplay {
            source.play()?;
        }
        Ok(source)
    }

    fn drain_frames(&mut self) {
        if let Some(frame) = self.rx_frame.try_iter().last() {
            self.frame = Some(frame);
        }
    }
}

fn make_element(factory: &str) -> Result<gst::Element, VideoSourceError> {
    gst::ElementFactory::make(factory)
        .build()
        .map_err(|e| VideoSourceError::Init(format!("Failed to create {}: {}", factory, e)))
}

fn build_pipeline(
    settings: &VideoSourceSettings,
    tx_frame: Sender<VideoFrame>,
) -> Result<gst::Pipeline, VideoSourceError> {
    let pipeline = gst::Pipeline::new();

    let decode = gst::ElementFactory::make("uridecodebin")
        .property("uri", settings.url.as_str())
        .build()
        .map_err(|e| VideoSourceError::Init(format!("Failed to create uridecodebin: {}", e)))?;
    let convert = make_element("videoconvert")?;
    let scale = make_element("videoscale")?;

    let appsink = gst_app::AppSink::builder()
        .caps(
            &gst_video::VideoCapsBuilder::new()
                .format(gst_video::VideoFormat::Rgb)
                .width(settings.width as i32)
                .height(settings.height as i32)
                .build(),
        )
        .max_buffers(1)
        .drop(true)
        .build();

    pipeline
        .add_many([&decode, &convert, &scale, appsink.upcast_ref()])
        .map_err(|e| VideoSourceError::Init(format!("Failed to add elements: {}", e)))?;
    gst::Element::link_many([&convert, &scale, appsink.upcast_ref()])
        .map_err(|e| VideoSourceError::Init(format!("Failed to link convert→sink: {}", e)))?;

    // uridecodebin exposes pads once the stream is typed: video goes to the
    // converter, anything else is parked on a fakesink so it never blocks.
    let convert_weak = convert.downgrade();
    let pipeline_weak = pipeline.downgrade();
    decode.connect_pad_added(move |_decode, src_pad| {
        let caps = src_pad
            .current_caps()
            .unwrap_or_else(|| src_pad.query_caps(None));
        let is_video = caps
            .structure(0)
            .is_some_and(|s| s.name().starts_with("video/"));

        if is_video {
            let Some(convert) = convert_weak.upgrade() else {
                return;
            };
            let Some(sink_pad) = convert.static_pad("sink") else {
                return;
            };
            if sink_pad.is_linked() {
                return;
            }
            match src_pad.link(&sink_pad) {
                Ok(_) => info!("uridecodebin linked to videoconvert"),
                Err(e) => error!("Failed to link uridecodebin video pad: {:?}", e),
            }
            return;
        }

        let Some(pipeline) = pipeline_weak.upgrade() else {
            return;
        };
        let Ok(fakesink) = gst::ElementFactory::make("fakesink").build() else {
            warn!("fakesink unavailable; leaving non-video pad unlinked");
            return;
        };
        if pipeline.add(&fakesink).is_err() {
            return;
        }
        let _ = fakesink.sync_state_with_parent();
        if let Some(sink_pad) = fakesink.static_pad("sink") {
            let _ = src_pad.link(&sink_pad);
        }
    });

    appsink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                match sample_to_frame(&sample) {
                    Ok(frame) => match tx_frame.try_send(frame) {
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Disconnected(_)) => return Err(gst::FlowError::Eos),
                    },
                    Err(e) => warn!("Dropping undecodable sample: {}", e),
                }
                Ok(gst::FlowSuccess::Ok)
            })
            .build(),
    );

    Ok(pipeline)
}

/// Copy a sample into a packed RGB8 frame, removing row padding.
fn sample_to_frame(sample: &gst::Sample) -> Result<VideoFrame, VideoSourceError> {
    let buffer = sample
        .buffer()
        .ok_or_else(|| VideoSourceError::Pipeline("No buffer in sample".into()))?;
    let caps = sample
        .caps()
        .ok_or_else(|| VideoSourceError::Pipeline("No caps in sample".into()))?;
    let info = gst_video::VideoInfo::from_caps(caps)
        .map_err(|e| VideoSourceError::Pipeline(format!("Invalid video caps: {}", e)))?;
    let frame = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info)
        .map_err(|e| VideoSourceError::Pipeline(format!("Failed to map frame: {}", e)))?;

    let width = frame.width();
    let height = frame.height();
    let stride = frame.plane_stride()[0] as usize;
    let data = frame
        .plane_data(0)
        .map_err(|e| VideoSourceError::Pipeline(format!("Failed to read plane: {}", e)))?;

    let row_len = width as usize * VideoFrame::BYTES_PER_PIXEL;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_len]);
    }

    Ok(VideoFrame {
        width,
        height,
        pixels,
    })
}

impl VideoSource for GstVideoSource {
    fn settings(&self) -> &VideoSourceSettings {
        &self.settings
    }

    fn play(&mut self) -> Result<(), VideoSourceError> {
        if self.playing {
            return Ok(());
        }
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| VideoSourceError::Pipeline(format!("Failed to start pipeline: {:?}", e)))?;
        info!("Playing {}", self.settings.url);
        self.playing = true;
        Ok(())
    }

    fn poll(&mut self) -> Vec<SourceNotice> {
        let mut notices = Vec::new();

        if let Some(bus) = self.pipeline.bus() {
            while let Some(msg) = bus.pop() {
                match msg.view() {
                    gst::MessageView::Eos(..) => notices.push(SourceNotice::EndOfStream),
                    gst::MessageView::Error(err) => {
                        self.failed = true;
                        notices.push(SourceNotice::Failed(format!(
                            "{} ({})",
                            err.error(),
                            err.debug().unwrap_or_default()
                        )));
                    }
                    gst::MessageView::Warning(w) => {
                        warn!(
                            "GStreamer warning: {} ({})",
                            w.error(),
                            w.debug().unwrap_or_default()
                        );
                    }
                    _ => {}
                }
            }
        }

        self.drain_frames();
        if !self.announced {
            if let Some(frame) = &self.frame {
                self.announced = true;
                notices.push(SourceNotice::Ready {
                    width: frame.width,
                    height: frame.height,
                });
            }
        }
        notices
    }

    fn current_frame(&mut self) -> Option<&VideoFrame> {
        if self.failed {
            return None;
        }
        self.drain_frames();
        self.frame.as_ref()
    }

    fn is_ready(&self) -> bool {
        self.frame.is_some()
    }
}

impl Drop for GstVideoSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
