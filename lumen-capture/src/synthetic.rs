//! Deterministic synthetic source for tests and camera-less machines.

use crate::frame::ColorFrame;
use crate::source::{CaptureError, CaptureSource};
use image::{Rgb, RgbImage};
use tracing::info;

const SYNTHETIC_FPS: f64 = 30.0;

/// A capture source that generates a moving diagonal gradient.
///
/// Pixel values depend only on position and frame number, so tests can
/// predict every frame. The pixel at (0, 0) of frame N has value `N % 256`
/// in all three channels.
pub struct SyntheticCapture {
    width: u32,
    height: u32,
    frame_count: u64,
    budget: Option<u64>,
    active: bool,
}

impl SyntheticCapture {
    /// Create an unbounded synthetic source.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
            budget: None,
            active: true,
        }
    }

    /// Create a source that ends its stream after `frames` frames.
    pub fn with_budget(width: u32, height: u32, frames: u64) -> Self {
        Self {
            budget: Some(frames),
            ..Self::new(width, height)
        }
    }

    /// Number of frames produced so far.
    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn render_pattern(&self) -> RgbImage {
        let shift = self.frame_count;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let value = ((x as u64 + y as u64 + shift) % 256) as u8;
            Rgb([value, value, value])
        })
    }
}

impl CaptureSource for SyntheticCapture {
    fn next_frame(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
        if !self.active {
            return Ok(None);
        }
        if let Some(budget) = self.budget {
            if self.frame_count >= budget {
                return Ok(None);
            }
        }

        self.frame_count += 1;
        let image = self.render_pattern();
        let timestamp = self.frame_count as f64 / SYNTHETIC_FPS;

        Ok(Some(ColorFrame::new(image, timestamp, self.frame_count)))
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(SYNTHETIC_FPS as f32)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        info!(
            "Synthetic capture stopped after {} frames",
            self.frame_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_deterministic() {
        let mut source = SyntheticCapture::new(8, 8);
        let first = source.next_frame().unwrap().unwrap();
        let again = SyntheticCapture::new(8, 8).next_frame().unwrap().unwrap();
        assert_eq!(first.image.as_raw(), again.image.as_raw());
    }

    #[test]
    fn origin_pixel_tracks_frame_number() {
        let mut source = SyntheticCapture::new(4, 4);
        for expected in 1u64..=5 {
            let frame = source.next_frame().unwrap().unwrap();
            assert_eq!(frame.frame_number, expected);
            assert_eq!(frame.image.get_pixel(0, 0).0[0], (expected % 256) as u8);
        }
    }

    #[test]
    fn budget_ends_the_stream() {
        let mut source = SyntheticCapture::with_budget(4, 4, 2);
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        // The stream stays ended.
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut source = SyntheticCapture::new(4, 4);
        source.next_frame().unwrap();
        source.stop();
        source.stop();
        assert!(!source.is_active());
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.frames_captured(), 1);
    }
}
