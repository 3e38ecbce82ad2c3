//! Viewer event loop: one frame retrieved, converted, and drawn per
//! iteration, with the event pump servicing input in between.

use crate::renderer::{FramePipeline, Renderer, SurfaceState};
use lumen_capture::{CaptureError, CaptureSource, GrayFrame, PreviewSession};
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Supplies one grayscale frame per loop iteration.
///
/// `Ok(None)` ends the loop cleanly; an error ends it and is reported as
/// the viewer's failure.
pub trait FrameFeed {
    fn next_frame(&mut self) -> Result<Option<GrayFrame>, CaptureError>;
}

impl<S: CaptureSource> FrameFeed for PreviewSession<S> {
    fn next_frame(&mut self) -> Result<Option<GrayFrame>, CaptureError> {
        self.tick()
    }
}

/// Window configuration for the viewer.
pub struct ViewerOptions {
    pub title: String,
    pub window_size: (u32, u32),
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "lumen preview".to_string(),
            window_size: (640, 480),
        }
    }
}

/// Run the viewer until Escape, window close, stream end, or failure.
///
/// The window and GPU state are torn down before the feed is released,
/// on every exit path that acquired them.
pub fn run<F: FrameFeed + 'static>(options: ViewerOptions, feed: F) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new().map_err(|e| format!("Failed to create event loop: {e}"))?;
    let mut app = App::new(options, feed);
    let run_result = event_loop.run_app(&mut app);
    let app_result = app.finish();
    run_result?;
    app_result
}

struct App<F: FrameFeed> {
    options: ViewerOptions,
    feed: Option<F>,
    state: Option<ViewerState<F>>,
    error: Option<String>,
}

impl<F: FrameFeed> App<F> {
    fn new(options: ViewerOptions, feed: F) -> Self {
        Self {
            options,
            feed: Some(feed),
            state: None,
            error: None,
        }
    }

    fn finish(self) -> Result<(), Box<dyn Error>> {
        if let Some(err) = self.error {
            Err(err.into())
        } else {
            Ok(())
        }
    }
}

impl<F: FrameFeed + 'static> ApplicationHandler for App<F> {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.state.is_some() || self.error.is_some() {
            return;
        }

        let feed = self.feed.take().expect("feed already consumed");

        match ViewerState::new(event_loop, &self.options, feed) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                error!("Failed to initialize viewer: {err}");
                self.error = Some(err.to_string());
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                info!("Escape pressed, quitting");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::RedrawRequested => {
                if let Some(err) = state.advance(event_loop) {
                    self.error = Some(err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(state) = self.state.as_ref() {
            state.window.request_redraw();
        }
    }
}

/// Field order matters: the window and GPU objects drop before the feed,
/// so teardown happens before the capture source is released.
struct ViewerState<F: FrameFeed> {
    window: Arc<Window>,
    renderer: Renderer,
    target: SurfaceState,
    pipeline: FramePipeline,
    feed: F,
}

impl<F: FrameFeed> ViewerState<F> {
    fn new(
        event_loop: &winit::event_loop::ActiveEventLoop,
        options: &ViewerOptions,
        feed: F,
    ) -> Result<Self, Box<dyn Error>> {
        let (width, height) = options.window_size;
        let window_attributes = Window::default_attributes()
            .with_title(options.title.as_str())
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let renderer = pollster::block_on(Renderer::new())?;
        let size = window.inner_size();

        let surface = renderer.instance().create_surface(window.clone())?;
        let target = SurfaceState::new(&renderer, surface, size.width, size.height)?;
        let pipeline = FramePipeline::new(renderer.device(), target.format());

        Ok(Self {
            window,
            renderer,
            target,
            pipeline,
            feed,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.target
            .resize(self.renderer.device(), new_size.width, new_size.height);
    }

    /// One loop iteration: retrieve, convert (inside the feed), display.
    /// Returns an error message when the iteration should fail the run.
    fn advance(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) -> Option<String> {
        match self.feed.next_frame() {
            Ok(Some(frame)) => {
                self.pipeline
                    .upload(self.renderer.device(), self.renderer.queue(), &frame);
                self.draw(event_loop)
            }
            Ok(None) => {
                info!("Capture stream ended, quitting");
                event_loop.exit();
                None
            }
            Err(e) => {
                error!("Frame retrieval failed: {e}");
                event_loop.exit();
                Some(format!("frame retrieval failed: {e}"))
            }
        }
    }

    fn draw(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) -> Option<String> {
        match self.render() {
            Ok(()) => None,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                self.resize(size);
                None
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU out of memory, quitting");
                event_loop.exit();
                Some("GPU out of memory".to_string())
            }
            Err(e) => {
                error!("Render error: {e:?}");
                None
            }
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let (width, height) = self.target.size();
        self.pipeline.set_fit(self.renderer.queue(), width, height);

        let surface_texture = self.target.acquire()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.renderer
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });

        self.pipeline.render(&mut encoder, &view);

        self.renderer.queue().submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}
