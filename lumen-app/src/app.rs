//! Wiring: logging, source selection, warm-up, viewer launch.

use crate::Args;
use lumen_capture::{CaptureSource, PreviewSession, SyntheticCapture, WebcamCapture};
use lumen_window::ViewerOptions;
use std::error::Error;
use tracing::info;

/// Largest initial window edge; bigger frames are scaled down to fit.
const MAX_WINDOW_WIDTH: u32 = 1280;

pub fn run(args: Args) -> Result<(), Box<dyn Error>> {
    init_logging();

    if args.list_devices {
        for device in WebcamCapture::list_devices()? {
            println!("{device}");
        }
        return Ok(());
    }

    if args.synthetic {
        info!("Using synthetic source at {}x{}", args.width, args.height);
        preview(SyntheticCapture::new(args.width, args.height))
    } else {
        preview(WebcamCapture::with_resolution(
            args.device,
            args.width,
            args.height,
        )?)
    }
}

/// Warm up the session, size the window from the first frame, and run
/// the viewer until the user quits or the stream fails.
fn preview<S: CaptureSource + 'static>(source: S) -> Result<(), Box<dyn Error>> {
    let mut session = PreviewSession::new(source);
    let (width, height) = session.warm_up()?;
    info!("Preview starting at {width}x{height}");

    let options = ViewerOptions {
        title: "lumen preview".to_string(),
        window_size: window_size_for(width, height),
    };
    lumen_window::run(options, session)
}

/// Open the window at the frame size, scaled down for very large frames.
fn window_size_for(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (640, 480);
    }
    if width <= MAX_WINDOW_WIDTH {
        return (width, height);
    }
    let scaled_height = ((height as u64 * MAX_WINDOW_WIDTH as u64) / width as u64) as u32;
    (MAX_WINDOW_WIDTH, scaled_height.max(1))
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_frames_open_at_native_size() {
        assert_eq!(window_size_for(640, 480), (640, 480));
        assert_eq!(window_size_for(1280, 720), (1280, 720));
    }

    #[test]
    fn oversized_frames_scale_down_preserving_aspect() {
        assert_eq!(window_size_for(2560, 1440), (1280, 720));
        assert_eq!(window_size_for(3840, 2160), (1280, 720));
    }

    #[test]
    fn degenerate_frames_fall_back_to_the_default() {
        assert_eq!(window_size_for(0, 0), (640, 480));
    }
}
