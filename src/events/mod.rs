//! Event types and observers used by the player.
//!
//! Events provide a decoupled way for systems to communicate without direct
//! dependencies.
//!
//! Submodules:
//! - [`switchdebug`] – toggle the upload overlay on/off
//! - [`uploadsummary`] – one-time report when the upload ceiling is reached
//! - [`videoready`] – move the stream from idle to streaming
pub mod switchdebug;
pub mod uploadsummary;
pub mod videoready;
