//! Lumen Capture - video sources for the grayscale preview
//!
//! This crate provides the capture half of the preview loop:
//!
//! - Webcams (via nokhwa, requires `webcam` feature)
//! - A deterministic synthetic source for tests and camera-less machines
//! - Fixed BT.601 grayscale conversion
//! - `PreviewSession`, which owns a source and yields one converted frame
//!   per loop iteration after a single warm-up frame
//!
//! ## Example
//!
//! ```ignore
//! use lumen_capture::{PreviewSession, WebcamCapture};
//!
//! let source = WebcamCapture::open(0)?;
//! let mut session = PreviewSession::new(source);
//! let (width, height) = session.warm_up()?;
//! while let Some(gray) = session.tick()? {
//!     // Display frame...
//! }
//! ```

mod frame;
mod session;
mod source;
mod synthetic;

#[cfg(feature = "webcam")]
mod webcam;

pub use frame::{ColorFrame, GrayFrame};
pub use session::PreviewSession;
pub use source::{CaptureError, CaptureSource};
pub use synthetic::SyntheticCapture;

#[cfg(feature = "webcam")]
pub use webcam::WebcamCapture;
