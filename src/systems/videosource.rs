//! Video source polling.
//!
//! Drains the source's notices once per frame. A `Ready` notice triggers
//! [`VideoReadyEvent`] when the ready trigger is automatic; end of stream
//! and failures are only logged. When streaming starts the source is told
//! to play, which matters for sources created without autoplay. With the
//! automatic trigger the source is told to play on the first poll, since
//! its `Ready` notice only comes once it plays.
use bevy_ecs::prelude::*;
use log::{error, info};

use crate::events::videoready::VideoReadyEvent;
use crate::resources::playerconfig::{PlayerConfig, ReadyTrigger};
use crate::resources::streamstate::StreamState;
use crate::resources::videosource::{SourceNotice, VideoSourceRes};

pub fn poll_video_source(
    mut source: NonSendMut<VideoSourceRes>,
    config: Res<PlayerConfig>,
    state: Res<StreamState>,
    mut primed: Local<bool>,
    mut commands: Commands,
) {
    let auto = config.ready_trigger == ReadyTrigger::Auto;
    if auto && !*primed {
        *primed = true;
        if let Err(e) = source.play() {
            error!("Failed to start playback: {}", e);
        }
    }

    if state.is_changed() && state.is_streaming() {
        if let Err(e) = source.play() {
            error!("Failed to start playback: {}", e);
        }
    }

    for notice in source.poll() {
        match notice {
            SourceNotice::Ready { width, height } => {
                info!("Video source ready: {}x{}", width, height);
                if auto {
                    commands.trigger(VideoReadyEvent {});
                }
            }
            SourceNotice::EndOfStream => info!("Video reached end of stream"),
            SourceNotice::Failed(message) => error!("Video source failed: {}", message),
        }
    }
}
