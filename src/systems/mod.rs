//! Player systems.
//!
//! This module groups all ECS systems that advance time, drive uploads,
//! read input, and render.
//!
//! Submodules overview
//! - [`fixedstep`] – advance the fixed-step clock and upload once per step
//! - [`input`] – read hardware input and update [`crate::resources::input::InputState`]
//! - [`render`] – draw the video surface and the upload overlay using Raylib
//! - [`time`] – update simulation time and delta
//! - [`upload`] – a single frame upload and draw
//! - [`videosource`] – poll the video source and fire readiness

pub mod fixedstep;
pub mod input;
pub mod render;
pub mod time;
pub mod upload;
pub mod videosource;
