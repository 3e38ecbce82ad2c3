//! Lumen Window - displays grayscale frames in an on-screen window.
//!
//! The viewer runs a winit event loop and renders each frame supplied by a
//! [`FrameFeed`] through a small wgpu pipeline. Escape or closing the
//! window ends the loop; the window and the feed are torn down in that
//! order on every exit path.

mod app;
mod renderer;

pub use app::{FrameFeed, ViewerOptions, run};
pub use renderer::{FramePipeline, RenderError, Renderer, SurfaceState};
