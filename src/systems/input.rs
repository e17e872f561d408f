//! Input systems.
//!
//! - [`update_input_state`] reads hardware input from Raylib each frame and
//!   writes the results into [`crate::resources::input::InputState`].
//! - Key presses are turned into events: the start key fires
//!   [`VideoReadyEvent`] and the debug key fires [`SwitchDebugEvent`].
use bevy_ecs::prelude::*;
use raylib::ffi::KeyboardKey;

use crate::events::switchdebug::SwitchDebugEvent;
use crate::events::videoready::VideoReadyEvent;
use crate::resources::input::{BoolState, InputState};

/// Poll Raylib for keyboard input and update the `InputState` resource.
pub fn update_input_state(
    mut input: ResMut<InputState>,
    rl: NonSendMut<raylib::RaylibHandle>,
    mut commands: Commands,
) {
    let read = |state: &mut BoolState| {
        let key: KeyboardKey = state.key_binding;
        state.active = rl.is_key_down(key);
        state.just_pressed = rl.is_key_pressed(key);
        state.just_released = rl.is_key_released(key);
    };
    read(&mut input.start_stream);
    read(&mut input.mode_debug);

    if input.start_stream.just_pressed {
        commands.trigger(VideoReadyEvent {});
    }
    if input.mode_debug.just_pressed {
        commands.trigger(SwitchDebugEvent {});
    }
}
