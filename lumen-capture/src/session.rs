//! Preview session: warm-up plus one converted frame per loop iteration.

use crate::frame::GrayFrame;
use crate::source::{CaptureError, CaptureSource};
use tracing::{debug, info};

/// Owns a capture source and drives the capture half of the preview loop.
///
/// A session starts with a single warm-up frame: it is retrieved and
/// converted before the main loop, proving the source delivers frames and
/// reporting the dimensions the preview window should open with. After
/// that, `tick` yields exactly one grayscale frame per call until the
/// stream ends or retrieval fails.
pub struct PreviewSession<S: CaptureSource> {
    source: S,
    converted: u64,
    warmed_up: bool,
}

impl<S: CaptureSource> PreviewSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            converted: 0,
            warmed_up: false,
        }
    }

    /// Retrieve and convert exactly one frame before the main loop.
    ///
    /// Returns the dimensions of the converted frame. Fails if the source
    /// ends before delivering its first frame.
    pub fn warm_up(&mut self) -> Result<(u32, u32), CaptureError> {
        let frame = self.source.next_frame()?.ok_or(CaptureError::StreamEnded)?;
        let gray = frame.to_gray();
        self.converted += 1;
        self.warmed_up = true;

        let (width, height) = gray.dimensions();
        info!("Warm-up frame converted at {}x{}", width, height);
        Ok((width, height))
    }

    /// Retrieve and convert the next frame. `Ok(None)` means the stream
    /// ended; errors mean retrieval failed and the loop should stop.
    pub fn tick(&mut self) -> Result<Option<GrayFrame>, CaptureError> {
        match self.source.next_frame()? {
            Some(frame) => {
                let gray = frame.to_gray();
                self.converted += 1;
                debug!("Converted frame {}", frame.frame_number);
                Ok(Some(gray))
            }
            None => {
                info!("Capture stream ended after {} frames", self.converted);
                Ok(None)
            }
        }
    }

    /// Total frames converted, warm-up included.
    pub fn frames_converted(&self) -> u64 {
        self.converted
    }

    pub fn warmed_up(&self) -> bool {
        self.warmed_up
    }

    /// Get the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get the underlying source mutably.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ColorFrame;
    use crate::synthetic::SyntheticCapture;
    use image::RgbImage;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Delivers frames, then simulates the device disappearing mid-run.
    struct FailingSource {
        frames_before_failure: u64,
        produced: u64,
    }

    impl CaptureSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
            if self.produced >= self.frames_before_failure {
                return Err(CaptureError::CaptureFailed("device unplugged".into()));
            }
            self.produced += 1;
            let image = RgbImage::new(4, 4);
            Ok(Some(ColorFrame::new(
                image,
                self.produced as f64 / 30.0,
                self.produced,
            )))
        }

        fn frame_rate(&self) -> Option<f32> {
            None
        }

        fn resolution(&self) -> (u32, u32) {
            (4, 4)
        }

        fn is_active(&self) -> bool {
            true
        }

        fn stop(&mut self) {}
    }

    /// Records how many times `stop` ran, mirroring the webcam source's
    /// guarded release (explicit stop or drop, whichever comes first).
    struct CountingSource {
        stops: Rc<Cell<u32>>,
        active: bool,
    }

    impl CaptureSource for CountingSource {
        fn next_frame(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
            Ok(Some(ColorFrame::new(RgbImage::new(2, 2), 0.0, 1)))
        }

        fn frame_rate(&self) -> Option<f32> {
            None
        }

        fn resolution(&self) -> (u32, u32) {
            (2, 2)
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn stop(&mut self) {
            if !self.active {
                return;
            }
            self.active = false;
            self.stops.set(self.stops.get() + 1);
        }
    }

    impl Drop for CountingSource {
        fn drop(&mut self) {
            self.stop();
        }
    }

    #[test]
    fn warm_up_consumes_exactly_one_frame() {
        let mut session = PreviewSession::new(SyntheticCapture::new(64, 48));
        let dims = session.warm_up().unwrap();

        assert_eq!(dims, (64, 48));
        assert!(session.warmed_up());
        assert_eq!(session.frames_converted(), 1);
        assert_eq!(session.source().frames_captured(), 1);
    }

    #[test]
    fn warm_up_fails_on_an_empty_stream() {
        let mut session = PreviewSession::new(SyntheticCapture::with_budget(8, 8, 0));
        assert!(matches!(
            session.warm_up(),
            Err(CaptureError::StreamEnded)
        ));
        assert!(!session.warmed_up());
    }

    #[test]
    fn tick_converts_frames_in_capture_order() {
        let mut session = PreviewSession::new(SyntheticCapture::new(4, 4));
        session.warm_up().unwrap();

        // The synthetic origin pixel equals the frame number, and equal RGB
        // channels survive the luma transform unchanged.
        for expected in 2u8..=6 {
            let gray = session.tick().unwrap().unwrap();
            assert_eq!(gray.data()[0], expected);
        }
        assert_eq!(session.frames_converted(), 6);
    }

    #[test]
    fn session_is_unbounded_without_a_quit_signal() {
        let mut session = PreviewSession::new(SyntheticCapture::new(4, 4));
        session.warm_up().unwrap();

        for _ in 0..1000 {
            assert!(session.tick().unwrap().is_some());
        }
    }

    #[test]
    fn tick_reports_end_of_stream() {
        let mut session = PreviewSession::new(SyntheticCapture::with_budget(4, 4, 2));
        session.warm_up().unwrap();

        assert!(session.tick().unwrap().is_some());
        assert!(session.tick().unwrap().is_none());
        assert!(session.tick().unwrap().is_none());
    }

    #[test]
    fn tick_propagates_retrieval_failure() {
        let mut session = PreviewSession::new(FailingSource {
            frames_before_failure: 2,
            produced: 0,
        });
        session.warm_up().unwrap();

        assert!(session.tick().unwrap().is_some());
        assert!(matches!(
            session.tick(),
            Err(CaptureError::CaptureFailed(_))
        ));
    }

    #[test]
    fn dropping_a_session_releases_the_source_once() {
        let stops = Rc::new(Cell::new(0));
        let session = PreviewSession::new(CountingSource {
            stops: Rc::clone(&stops),
            active: true,
        });
        drop(session);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn explicit_stop_before_drop_still_releases_once() {
        let stops = Rc::new(Cell::new(0));
        let mut session = PreviewSession::new(CountingSource {
            stops: Rc::clone(&stops),
            active: true,
        });
        session.source_mut().stop();
        drop(session);
        assert_eq!(stops.get(), 1);
    }
}
