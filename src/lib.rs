//! Terminal fireworks.
//!
//! [`engine`] is the simulation: rockets climb, burst into one of three
//! patterns and the particles fall and fade. [`show`] drives it once per
//! frame onto a [`canvas::FrameBuffer`], which [`terminal`] draws with
//! half-blocks. [`wish`] is the optional text service whose colours
//! become the palette.

pub mod canvas;
pub mod cli;
pub mod color;
pub mod config;
pub mod engine;
pub mod frame;
pub mod show;
pub mod terminal;
pub mod wish;
