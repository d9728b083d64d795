//! Core component – motion, measurement, load gating and item sources.
//!
//! Nothing in this module depends on any TUI or rendering crate.  Sizes
//! are plain `f64` pixels; the host decides what a pixel is.

pub mod item;
pub mod load_gate;
pub mod logo_loop;
pub mod loop_config;
pub mod manifest;
pub mod measure;
pub mod motion;
pub mod velocity;
pub mod visibility;
