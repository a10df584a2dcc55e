use std::{cell::Cell, rc::Rc};

use canvas::Viewport;
use log::{debug, warn};
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::window::Window;

use crate::{
    errors::PlayerError,
    renderers::ScalingRenderer,
    texture_upload::GpuTextureMirror,
    transform_generator::TransformGenerator,
};

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.2,
    a: 1.0,
};

pub struct PixelArtDisplayState {
    surface: Surface,
    device: Device,
    queue: Rc<Queue>,
    config: SurfaceConfiguration,

    /// Scales the canvas texture onto the window
    scaling_renderer: ScalingRenderer,
    transform_generator: TransformGenerator,
}

impl PixelArtDisplayState {
    /// Sets up the GPU for a window and a canvas of `canvas_size`. Also
    /// returns the texture mirror the canvas should flush into.
    pub fn new(
        window: &Window,
        canvas_size: (u32, u32),
        needs_redraw: Rc<Cell<bool>>,
    ) -> Result<(Self, GpuTextureMirror), PlayerError> {
        pollster::block_on(Self::async_new(window, canvas_size, needs_redraw))
    }

    async fn async_new(
        window: &Window,
        canvas_size: (u32, u32),
        needs_redraw: Rc<Cell<bool>>,
    ) -> Result<(Self, GpuTextureMirror), PlayerError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = unsafe { instance.create_surface(window) }?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(PlayerError::NoAdapter)?;
        debug!("using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;

        let max = device.limits().max_texture_dimension_2d;
        let (width, height) = canvas_size;
        if width > max || height > max {
            return Err(PlayerError::CanvasTooLarge { width, height, max });
        }

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.describe().srgb)
            .or_else(|| capabilities.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
        let alpha_mode = capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let queue = Rc::new(queue);
        let (mirror, texture_view) =
            GpuTextureMirror::new(&device, queue.clone(), width, height, needs_redraw);

        let scaling_renderer = ScalingRenderer::new(
            &device,
            &texture_view,
            canvas_size,
            format,
            BACKGROUND,
            wgpu::BlendState::ALPHA_BLENDING,
        );

        let state = Self {
            surface,
            device,
            queue,
            transform_generator: TransformGenerator::new(config.width, config.height),
            config,
            scaling_renderer,
        };

        Ok((state, mirror))
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.transform_generator.window_size()
    }

    pub fn render(&mut self, viewport: &Viewport) -> Result<(), PlayerError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture()?
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out waiting for a frame, skipping it");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.scaling_renderer.update_transform_matrix(
            &self.queue,
            self.transform_generator.get_transform_matrix(viewport),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.scaling_renderer.render(&mut encoder, &view);
        self.queue.submit(Some(encoder.finish()));

        frame.present();
        Ok(())
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.transform_generator.on_window_resize(width, height);
    }
}
