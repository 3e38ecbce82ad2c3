//! Capture source trait and error taxonomy.

use crate::frame::ColorFrame;
use thiserror::Error;

/// Errors that can occur while acquiring a device or retrieving frames.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Failed to start stream: {0}")]
    StreamFailed(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Stream ended")]
    StreamEnded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for sources that provide sequential video frames.
///
/// A source is opened before the first `next_frame` call and released by
/// `stop`. `stop` must be idempotent: releasing an already-stopped source
/// is a no-op, and `next_frame` on a stopped source returns `Ok(None)`.
pub trait CaptureSource {
    /// Get the next frame. `Ok(None)` means the stream ended.
    fn next_frame(&mut self) -> Result<Option<ColorFrame>, CaptureError>;

    /// Get the frame rate, if known.
    fn frame_rate(&self) -> Option<f32>;

    /// Get the source resolution (width, height).
    fn resolution(&self) -> (u32, u32);

    /// Check if the source is still active.
    fn is_active(&self) -> bool;

    /// Release the source. Safe to call more than once.
    fn stop(&mut self);
}
