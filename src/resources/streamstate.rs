//! Streaming state resource.
//!
//! The uploader only runs while [`StreamState::Streaming`]. The state starts
//! [`StreamState::Idle`] and moves to `Streaming` once, when a
//! [`VideoReadyEvent`](crate::events::videoready::VideoReadyEvent) arrives.
//! There is no way back to `Idle`.

use bevy_ecs::prelude::Resource;

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, StreamState::Streaming)
    }

    /// Enter `Streaming`. Returns `true` if this call made the transition.
    pub fn start(&mut self) -> bool {
        let was_idle = *self == StreamState::Idle;
        *self = StreamState::Streaming;
        was_idle
    }
}
