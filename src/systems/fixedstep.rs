//! Fixed-step upload driver.
//!
//! Feeds the frame delta into the [`FixedStepClock`] on every update and
//! runs one [`upload_frame`] per step while streaming. The clock keeps
//! ticking while idle, so the first step after readiness fires as soon as a
//! quantum is banked.
use bevy_ecs::prelude::*;
use log::error;

use crate::events::uploadsummary::UploadSummaryEvent;
use crate::resources::fixedstep::FixedStepClock;
use crate::resources::rendercontext::RenderContext;
use crate::resources::streamstate::StreamState;
use crate::resources::uploadstats::UploadStats;
use crate::resources::videosource::VideoSourceRes;
use crate::resources::worldtime::WorldTime;
use crate::systems::upload::{UploadOutcome, upload_frame};

/// Advance the clock and upload once per due step.
///
/// Upload errors are logged and do not stop later steps. The step that
/// exhausts the ceiling triggers the one [`UploadSummaryEvent`].
pub fn fixed_step_upload(
    time: Res<WorldTime>,
    mut clock: ResMut<FixedStepClock>,
    state: Res<StreamState>,
    mut stats: ResMut<UploadStats>,
    mut ctx: NonSendMut<RenderContext>,
    mut source: NonSendMut<VideoSourceRes>,
    mut commands: Commands,
) {
    let steps = clock.advance(time.delta);
    if !state.is_streaming() {
        return;
    }

    for _ in 0..steps {
        let outcome = upload_frame(&mut stats, &mut ctx, &mut **source);

        if let Some(summary) = stats.take_summary() {
            commands.trigger(UploadSummaryEvent {
                summary,
                backend: ctx.backend_name(),
            });
        }

        match outcome {
            Ok(UploadOutcome::Exhausted) => break,
            Ok(_) => {}
            Err(e) => error!("Frame upload failed: {}", e),
        }
    }
}
