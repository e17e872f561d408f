//! One frame upload.
//!
//! [`upload_frame`] is the body of a fixed step: copy the video's current
//! frame into the texture, draw the quad and account for the time spent.
use std::time::Duration;

use log::trace;

use crate::resources::rendercontext::{RenderContext, RenderError};
use crate::resources::uploadstats::UploadStats;
use crate::resources::videosource::VideoSource;

/// What a single upload invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The frame was uploaded and drawn.
    Uploaded { cost: Duration },
    /// The source has no decoded frame yet; nothing was uploaded or counted.
    FrameNotReady,
    /// The ceiling was reached earlier; nothing was done.
    Exhausted,
}

/// Upload the source's current frame and draw it, unless the ceiling is hit.
///
/// A failed upload is not counted.
pub fn upload_frame(
    stats: &mut UploadStats,
    ctx: &mut RenderContext,
    source: &mut dyn VideoSource,
) -> Result<UploadOutcome, RenderError> {
    if stats.is_exhausted() {
        return Ok(UploadOutcome::Exhausted);
    }
    let Some(frame) = source.current_frame() else {
        return Ok(UploadOutcome::FrameNotReady);
    };

    let cost = ctx.upload_and_draw(frame)?;
    stats.record(cost);
    trace!(
        "Upload {}/{} took {:?}",
        stats.count(),
        stats.ceiling(),
        cost
    );
    Ok(UploadOutcome::Uploaded { cost })
}
