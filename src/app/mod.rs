//! Application orchestration: state, event loop plumbing and input handling.

pub mod event;
pub mod frames;
pub mod handler;
pub mod image_runtime;
pub mod state;
