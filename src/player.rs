//! Player setup.
//!
//! Wires the resources, observers and systems of the upload loop into a
//! `World`. The binary and the integration tests share these helpers, so
//! a test world runs the same schedule as the window, minus input and
//! window rendering.
use bevy_ecs::observer::Observer;
use bevy_ecs::prelude::*;
use log::info;

use crate::components::mapposition::MapPosition;
use crate::components::videodisplay::VideoDisplay;
use crate::events::switchdebug::switch_debug_observer;
use crate::events::uploadsummary::upload_summary_observer;
use crate::events::videoready::video_ready_observer;
use crate::resources::playerconfig::PlayerConfig;
use crate::resources::rendercontext::RenderContext;
use crate::resources::streamstate::StreamState;
use crate::resources::videosource::VideoSourceRes;
use crate::resources::worldtime::WorldTime;
use crate::systems::fixedstep::fixed_step_upload;
use crate::systems::videosource::poll_video_source;

/// Insert every resource the upload loop needs and spawn the display entity.
///
/// `ctx` should already be initialized; uploads before that fail with
/// `NotInitialized` and are only logged.
pub fn setup_world(
    world: &mut World,
    config: PlayerConfig,
    ctx: RenderContext,
    source: VideoSourceRes,
) {
    world.insert_resource(WorldTime::default().with_time_scale(1.0));
    world.insert_resource(config.fixed_step_clock());
    world.insert_resource(config.upload_stats());
    world.insert_resource(StreamState::default());
    let display = VideoDisplay::new(config.video_width, config.video_height);
    match config.display_position {
        Some((x, y)) => world.spawn((display, MapPosition::new(x, y))),
        None => world.spawn(display),
    };
    info!(
        "Player set up: ceiling {}, {} Hz, ready trigger {:?}",
        config.upload_ceiling, config.step_hz, config.ready_trigger
    );
    world.insert_resource(config);
    world.insert_non_send_resource(ctx);
    world.insert_non_send_resource(source);
}

/// Spawn the observers for readiness, the upload summary and debug mode.
pub fn register_observers(world: &mut World) {
    world.spawn(Observer::new(video_ready_observer));
    world.spawn(Observer::new(upload_summary_observer));
    world.spawn(Observer::new(switch_debug_observer));
    // Ensure the observers are registered before any system triggers events.
    world.flush();
}

/// Schedule with the window-independent systems: readiness polling, then
/// the fixed-step uploader.
pub fn build_update_schedule() -> Schedule {
    let mut update = Schedule::default();
    update.add_systems(poll_video_source);
    update.add_systems(fixed_step_upload.after(poll_video_source));
    update
}
