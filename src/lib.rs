//! trackscroll Library
//!
//! Pointer-and-keyboard input transformer: low-level hook events are
//! classified per the configured trigger, and inside scroll mode raw pointer
//! motion becomes synthesized wheel scrolling.

pub mod app;
pub mod config;
pub mod inject;
pub mod input;
pub mod ipc;
pub mod platform;
pub mod scroll;
pub mod types;
pub mod utils;

pub use app::{Collaborators, ControlResponse, Core};
pub use config::{ConfigStore, Settings};
