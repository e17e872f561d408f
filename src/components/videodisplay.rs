//! Video display component.
//!
//! Marks the entity that shows the uploaded video. The render system draws
//! the offscreen surface as a sprite of `width` x `height` pixels at the
//! entity's [`MapPosition`](super::mapposition::MapPosition), or centred in
//! the window when the entity has none.

use bevy_ecs::prelude::Component;

use crate::resources::gpu::DisplayRect;

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct VideoDisplay {
    pub width: f32,
    pub height: f32,
}

impl VideoDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    /// Destination rectangle with the top-left corner at `(x, y)`.
    pub fn rect_at(&self, x: f32, y: f32) -> DisplayRect {
        DisplayRect {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    /// Destination rectangle centred in a `window_w` x `window_h` window.
    pub fn centred_in(&self, window_w: i32, window_h: i32) -> DisplayRect {
        self.rect_at(
            (window_w as f32 - self.width) * 0.5,
            (window_h as f32 - self.height) * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_rect_splits_the_margin() {
        let display = VideoDisplay::new(320, 180);
        let rect = display.centred_in(1280, 720);
        assert_eq!(rect.x, 480.0);
        assert_eq!(rect.y, 270.0);
        assert_eq!((rect.width, rect.height), (320.0, 180.0));
    }
}
