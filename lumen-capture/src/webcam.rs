//! Webcam capture using nokhwa.

use crate::frame::ColorFrame;
use crate::source::{CaptureError, CaptureSource};
use image::RgbImage;
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Webcam capture source.
///
/// The stream is opened on construction and released exactly once, either
/// by an explicit `stop` or on drop.
pub struct WebcamCapture {
    camera: Camera,
    start_time: Instant,
    frame_count: u64,
    active: bool,
    resolution: (u32, u32),
}

impl WebcamCapture {
    /// Open a webcam by device index at the default resolution.
    pub fn open(index: u32) -> Result<Self, CaptureError> {
        Self::with_resolution(index, 640, 480)
    }

    /// Open a webcam by device index, requesting a specific resolution.
    ///
    /// The camera picks the closest format it supports, so the resolution
    /// of delivered frames may differ from the request.
    pub fn with_resolution(index: u32, width: u32, height: u32) -> Result<Self, CaptureError> {
        info!("Opening webcam {} at {}x{}", index, width, height);

        let camera_index = CameraIndex::Index(index);
        let mut camera = open_with_fallback(&camera_index, width, height)?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::StreamFailed(e.to_string()))?;

        let resolution = camera.resolution();
        info!(
            "Webcam opened: {}x{} @ {:?} fps",
            resolution.width(),
            resolution.height(),
            camera.frame_rate()
        );

        Ok(Self {
            camera,
            start_time: Instant::now(),
            frame_count: 0,
            active: true,
            resolution: (resolution.width(), resolution.height()),
        })
    }

    /// List available webcam devices.
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto)
            .map_err(|e| CaptureError::DeviceNotFound(e.to_string()))?;

        Ok(devices
            .into_iter()
            .map(|info| format!("{}: {}", info.index(), info.human_name()))
            .collect())
    }
}

/// Try format strategies in order of preference: the closest MJPEG match
/// first (widely supported), then whatever the camera offers.
fn open_with_fallback(
    index: &CameraIndex,
    width: u32,
    height: u32,
) -> Result<Camera, CaptureError> {
    let attempts = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::MJPEG,
            30,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = None;
    for requested in attempts {
        match Camera::new(index.clone(), requested) {
            Ok(camera) => return Ok(camera),
            Err(e) => {
                warn!("Webcam format attempt failed: {e}");
                last_error = Some(e);
            }
        }
    }

    // attempts is non-empty, so last_error is set here
    let e = last_error.map(|e| e.to_string()).unwrap_or_default();
    Err(CaptureError::OpenFailed(e))
}

impl CaptureSource for WebcamCapture {
    fn next_frame(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
        if !self.active {
            return Ok(None);
        }

        let frame = self
            .camera
            .frame()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let timestamp = self.start_time.elapsed().as_secs_f64();
        self.frame_count += 1;

        debug!("Captured frame {} at {:.3}s", self.frame_count, timestamp);

        // nokhwa bundles its own image version, so rebuild the buffer as ours
        let (width, height) = (decoded.width(), decoded.height());
        let image = RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CaptureError::Decode("frame buffer size mismatch".to_string()))?;

        Ok(Some(ColorFrame::new(image, timestamp, self.frame_count)))
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.camera.frame_rate() as f32)
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Err(e) = self.camera.stop_stream() {
            debug!("Webcam stop_stream failed: {e}");
        }
        info!("Webcam released after {} frames", self.frame_count);
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
