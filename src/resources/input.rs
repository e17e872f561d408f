//! Per-frame keyboard input resource.
//!
//! Captures the few keys the player reacts to and exposes them to systems via
//! the [`InputState`] resource. `Space` starts streaming when the ready
//! trigger is manual; `F11` toggles the debug overlay.
use bevy_ecs::prelude::*;
use raylib::prelude::*;

#[derive(Debug, Clone, Copy)]
/// Boolean key state with an associated keyboard binding.
pub struct BoolState {
    /// Whether the key is currently active/pressed this frame.
    pub active: bool,
    /// Whether the key was just pressed this frame.
    pub just_pressed: bool,
    /// Whether the key was just released this frame.
    pub just_released: bool,

    /// The key bound to this action.
    pub key_binding: KeyboardKey,
}

impl BoolState {
    fn bound_to(key_binding: KeyboardKey) -> Self {
        Self {
            key_binding,
            ..Self::default()
        }
    }
}

/// Resource capturing the per-frame keyboard state relevant to playback.
#[derive(Resource, Debug, Clone)]
pub struct InputState {
    pub start_stream: BoolState,
    pub mode_debug: BoolState,
}

impl Default for BoolState {
    fn default() -> Self {
        Self {
            active: false,
            just_pressed: false,
            just_released: false,
            key_binding: KeyboardKey::KEY_NULL,
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            start_stream: BoolState::bound_to(KeyboardKey::KEY_SPACE),
            mode_debug: BoolState::bound_to(KeyboardKey::KEY_F11),
        }
    }
}
