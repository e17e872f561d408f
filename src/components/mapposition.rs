//! Window-space position component.
//!
//! The [`MapPosition`] component stores the top-left corner, in window
//! pixels, where an entity is drawn.

use bevy_ecs::prelude::Component;

#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct MapPosition {
    pub x: f32,
    pub y: f32,
}

impl MapPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
