//! ECS resources made available to systems.
//!
//! This module groups the long-lived data injected into the ECS world and
//! accessed by systems during execution: configuration, timing, playback
//! state, GPU handles and the video source. Each submodule documents the
//! semantics and intended usage of its resource(s).
//!
//! Overview
//! - `debugmode` – presence toggles the upload overlay
//! - `fixedstep` – fixed-step accumulator driving the uploader
//! - `gpu` – GPU backend trait, handles and the raylib/headless backends
//! - `input` – per-frame keyboard state of keys relevant to the player
//! - `playerconfig` – INI-backed player configuration
//! - `rendercontext` – owner of the surface, shader program, quad and texture
//! - `streamstate` – idle/streaming gate for the uploader
//! - `uploadstats` – upload counter, cost accumulator and ceiling
//! - `videosource` – playable media handles exposing the current frame
//! - `worldtime` – simulation time and delta
pub mod debugmode;
pub mod fixedstep;
pub mod gpu;
pub mod input;
pub mod playerconfig;
pub mod rendercontext;
pub mod streamstate;
pub mod uploadstats;
pub mod videosource;
pub mod worldtime;
