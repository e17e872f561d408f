//! Readiness event and observer.
//!
//! A [`VideoReadyEvent`] is the only way out of
//! [`StreamState::Idle`](crate::resources::streamstate::StreamState::Idle).
//! It is fired by the video polling system when the source decodes its
//! first frame, or by the start key when the ready trigger is manual.
use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::{debug, info};

use crate::resources::streamstate::StreamState;

/// Event used to start streaming.
///
/// This carries no data; firing it while already streaming does nothing.
#[derive(Event, Debug, Clone, Copy)]
pub struct VideoReadyEvent {}

/// Observer that moves [`StreamState`] to `Streaming`.
pub fn video_ready_observer(_trigger: On<VideoReadyEvent>, mut state: ResMut<StreamState>) {
    if state.start() {
        info!("Video ready, streaming started");
    } else {
        debug!("VideoReadyEvent ignored, already streaming");
    }
}
