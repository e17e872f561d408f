//! ECS components for entities.
//!
//! Submodules overview:
//! - [`mapposition`] – window-space position for an entity
//! - [`videodisplay`] – display size of the entity showing the video

pub mod mapposition;
pub mod videodisplay;
