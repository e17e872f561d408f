//! Upload summary event and observer.
//!
//! Triggered exactly once, by the fixed-step uploader, on the step that
//! reaches the upload ceiling.
use bevy_ecs::observer::On;
use bevy_ecs::prelude::*;
use log::info;

use crate::resources::uploadstats::UploadSummary;

/// Final upload totals, tagged with the GPU backend that produced them.
#[derive(Event, Debug, Clone, Copy)]
pub struct UploadSummaryEvent {
    pub summary: UploadSummary,
    pub backend: &'static str,
}

/// Observer that writes the summary to the log as one JSON line.
pub fn upload_summary_observer(trigger: On<UploadSummaryEvent>) {
    let event = trigger.event();
    info!("{}", event.summary.to_json(event.backend));
}
