//! wgpu device setup and the grayscale frame pipeline.

use lumen_capture::GrayFrame;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Request Adapter Error: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("Request Device Error: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Create surface error: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("Surface has no supported configuration")]
    UnsupportedSurface,
}

/// GPU instance, adapter, and device shared by the viewer.
pub struct Renderer {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl Renderer {
    pub async fn new() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::from_env_or_default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Lumen Renderer"),
                ..Default::default()
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Window surface plus its current configuration.
pub struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl SurfaceState {
    pub fn new(
        renderer: &Renderer,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let config = surface
            .get_default_config(&renderer.adapter, width.max(1), height.max(1))
            .ok_or(RenderError::UnsupportedSurface)?;
        surface.configure(&renderer.device, &config);
        Ok(Self { surface, config })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigure for a new window size. Zero-sized windows are ignored.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(device, &self.config);
    }

    pub fn acquire(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}

/// Letterbox scale applied to the quad in the vertex shader.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FitUniform {
    scale: [f32; 2],
    _pad: [f32; 2],
}

/// Renders a grayscale frame into the surface as a letterboxed quad.
///
/// The frame lives in an R8Unorm texture that is recreated whenever the
/// incoming dimensions change and rewritten on every upload.
pub struct FramePipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fit_buffer: wgpu::Buffer,
    texture: Option<wgpu::Texture>,
    texture_size: (u32, u32),
    bind_group: Option<wgpu::BindGroup>,
    upload_staging: Vec<u8>,
}

impl FramePipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Frame Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/frame.wgsl").into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Frame Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let fit_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fit Uniform"),
            size: std::mem::size_of::<FitUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Frame Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Frame Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            sampler,
            fit_buffer,
            texture: None,
            texture_size: (0, 0),
            bind_group: None,
            upload_staging: Vec::new(),
        }
    }

    /// Upload a frame, recreating the texture if the dimensions changed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &GrayFrame) {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        if self.texture.is_none() || self.texture_size != (width, height) {
            self.recreate_texture(device, width, height);
        }

        let texture = self
            .texture
            .as_ref()
            .expect("texture created by recreate_texture");

        let bytes_per_row = padded_bytes_per_row(width);
        let data: &[u8] = if bytes_per_row == width {
            frame.data()
        } else {
            pad_rows(frame.data(), width, height, bytes_per_row, &mut self.upload_staging);
            &self.upload_staging
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn recreate_texture(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.fit_buffer.as_entire_binding(),
                },
            ],
        });

        self.texture = Some(texture);
        self.texture_size = (width, height);
        self.bind_group = Some(bind_group);
    }

    /// Update the letterbox scale for the current surface size.
    pub fn set_fit(&self, queue: &wgpu::Queue, surface_width: u32, surface_height: u32) {
        let uniform = FitUniform {
            scale: fit_scale(self.texture_size, (surface_width, surface_height)),
            _pad: [0.0, 0.0],
        };
        queue.write_buffer(&self.fit_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Record the frame pass. Draws nothing until the first upload.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Frame Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(bind_group) = &self.bind_group {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
    }
}

/// Texture uploads require rows aligned to `COPY_BYTES_PER_ROW_ALIGNMENT`.
fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    width.div_ceil(align) * align
}

/// Copy `width`-byte rows into `out` with `padded` bytes per row, zero
/// filled past the image data.
fn pad_rows(data: &[u8], width: u32, height: u32, padded: u32, out: &mut Vec<u8>) {
    let width = width as usize;
    let padded = padded as usize;
    let height = height as usize;

    out.clear();
    out.resize(padded * height, 0);
    for row in 0..height {
        out[row * padded..row * padded + width]
            .copy_from_slice(&data[row * width..(row + 1) * width]);
    }
}

/// Scale that fits a frame inside a surface while preserving aspect ratio.
fn fit_scale(frame: (u32, u32), surface: (u32, u32)) -> [f32; 2] {
    let (fw, fh) = frame;
    let (sw, sh) = surface;
    if fw == 0 || fh == 0 || sw == 0 || sh == 0 {
        return [1.0, 1.0];
    }

    let frame_aspect = fw as f32 / fh as f32;
    let surface_aspect = sw as f32 / sh as f32;
    if frame_aspect > surface_aspect {
        [1.0, surface_aspect / frame_aspect]
    } else {
        [frame_aspect / surface_aspect, 1.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_up_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(256), 256);
        assert_eq!(padded_bytes_per_row(257), 512);
        assert_eq!(padded_bytes_per_row(640), 768);
    }

    #[test]
    fn pad_rows_preserves_pixels_and_zero_fills() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut out = Vec::new();
        pad_rows(&data, 3, 2, 4, &mut out);

        assert_eq!(out, vec![1, 2, 3, 0, 4, 5, 6, 0]);
    }

    #[test]
    fn pad_rows_reuses_the_staging_buffer() {
        let mut out = vec![9u8; 64];
        pad_rows(&[7, 8], 1, 2, 4, &mut out);
        assert_eq!(out, vec![7, 0, 0, 0, 8, 0, 0, 0]);
    }

    #[test]
    fn wide_frame_in_tall_surface_pads_vertically() {
        let [sx, sy] = fit_scale((1280, 720), (720, 1280));
        assert_eq!(sx, 1.0);
        assert!(sy < 1.0);
    }

    #[test]
    fn tall_frame_in_wide_surface_pads_horizontally() {
        let [sx, sy] = fit_scale((480, 640), (1920, 1080));
        assert_eq!(sy, 1.0);
        assert!(sx < 1.0);
    }

    #[test]
    fn matching_aspect_fills_the_surface() {
        assert_eq!(fit_scale((640, 480), (1280, 960)), [1.0, 1.0]);
    }

    #[test]
    fn degenerate_sizes_fall_back_to_identity() {
        assert_eq!(fit_scale((0, 480), (1280, 960)), [1.0, 1.0]);
        assert_eq!(fit_scale((640, 480), (0, 0)), [1.0, 1.0]);
    }
}
