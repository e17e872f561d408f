//! Simulation time resource.
//!
//! Written once per main-loop iteration by
//! [`update_world_time`](crate::systems::time::update_world_time) and read by
//! the fixed-step driver.
use bevy_ecs::prelude::Resource;

#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    /// Scaled seconds since start.
    pub elapsed: f32,
    /// Scaled seconds since the previous update.
    pub delta: f32,
    pub time_scale: f32,
    /// Number of updates seen.
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }
}
