//! Window render system.
//!
//! Draws the offscreen surface, which holds the last uploaded frame, as a
//! sprite for every [`VideoDisplay`] entity, plus the upload overlay while
//! [`DebugMode`] is present.
use bevy_ecs::prelude::*;
use log::error;
use raylib::prelude::*;

use crate::components::mapposition::MapPosition;
use crate::components::videodisplay::VideoDisplay;
use crate::resources::debugmode::DebugMode;
use crate::resources::fixedstep::FixedStepClock;
use crate::resources::rendercontext::RenderContext;
use crate::resources::streamstate::StreamState;
use crate::resources::uploadstats::UploadStats;

#[allow(clippy::too_many_arguments)]
pub fn render_system(
    mut rl: NonSendMut<RaylibHandle>,
    th: NonSend<RaylibThread>,
    mut ctx: NonSendMut<RenderContext>,
    displays: Query<(&VideoDisplay, Option<&MapPosition>)>,
    state: Res<StreamState>,
    stats: Res<UploadStats>,
    clock: Res<FixedStepClock>,
    debug: Option<Res<DebugMode>>,
) {
    let (window_w, window_h) = (rl.get_screen_width(), rl.get_screen_height());
    let mut d = rl.begin_drawing(&th);
    d.clear_background(Color::DARKGRAY);

    for (display, position) in displays.iter() {
        let dest = match position {
            Some(p) => display.rect_at(p.x, p.y),
            None => display.centred_in(window_w, window_h),
        };
        if let Err(e) = ctx.present(dest) {
            error!("Failed to present video surface: {}", e);
        }
    }

    if !state.is_streaming() {
        d.draw_text(
            "Waiting for video (press SPACE to start)",
            10,
            window_h - 20,
            10,
            Color::RAYWHITE,
        );
    }

    if debug.is_some() {
        let fps = d.get_fps();
        let text = format!("DEBUG MODE (press F11 to toggle) | FPS: {}", fps);
        d.draw_text(&text, 10, 10, 10, Color::RAYWHITE);

        let summary = stats.summary();
        let text = format!(
            "{:?} | uploads {}/{} | total {:.1} ms | avg {:.3} ms",
            *state,
            summary.count,
            stats.ceiling(),
            summary.total.as_secs_f64() * 1000.0,
            summary.average.as_secs_f64() * 1000.0
        );
        d.draw_text(&text, 10, 30, 10, Color::RAYWHITE);

        let text = format!(
            "steps {} (last {}) | backlog {:.1} ms | backend {}",
            clock.total_steps(),
            clock.steps_last_update(),
            clock.accumulator() * 1000.0,
            ctx.backend_name()
        );
        d.draw_text(&text, 10, 50, 10, Color::RAYWHITE);
    }
}
