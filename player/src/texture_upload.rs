use std::{cell::Cell, num::NonZeroU32, rc::Rc};

use canvas::{DirtyRegion, TextureMirror};
use image::RgbaImage;

pub const CANVAS_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Keeps a GPU texture in step with the canvas buffer.
///
/// Uploads go straight through the queue; the redraw request is a flag the
/// host loop checks before drawing a frame.
pub struct GpuTextureMirror {
    queue: Rc<wgpu::Queue>,
    texture: wgpu::Texture,
    needs_redraw: Rc<Cell<bool>>,
}

impl GpuTextureMirror {
    /// Creates a texture the size of the canvas. Returns the mirror and a
    /// view for sampling it.
    pub fn new(
        device: &wgpu::Device,
        queue: Rc<wgpu::Queue>,
        width: u32,
        height: u32,
        needs_redraw: Rc<Cell<bool>>,
    ) -> (Self, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("canvas texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CANVAS_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        (
            Self {
                queue,
                texture,
                needs_redraw,
            },
            view,
        )
    }
}

/// Where `region` sits in the raw bytes of a canvas `canvas_width` pixels
/// wide, and where it lands in the texture.
///
/// Rows are read straight out of the full image, so the layout is that of the
/// whole canvas with an offset to the region's corner.
fn upload_layout(
    canvas_width: u32,
    region: DirtyRegion,
) -> (wgpu::ImageDataLayout, wgpu::Origin3d, wgpu::Extent3d) {
    let row_bytes = 4 * canvas_width;
    let offset = region.y as u64 * row_bytes as u64 + region.x as u64 * 4;

    (
        wgpu::ImageDataLayout {
            offset,
            bytes_per_row: NonZeroU32::new(row_bytes),
            rows_per_image: None,
        },
        wgpu::Origin3d {
            x: region.x,
            y: region.y,
            z: 0,
        },
        wgpu::Extent3d {
            width: region.width,
            height: region.height,
            depth_or_array_layers: 1,
        },
    )
}

impl TextureMirror for GpuTextureMirror {
    fn upload(&mut self, canvas: &RgbaImage, region: DirtyRegion) {
        if region.area() == 0 {
            return;
        }

        let (layout, origin, extent) = upload_layout(canvas.width(), region);

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin,
                aspect: wgpu::TextureAspect::All,
            },
            canvas.as_raw(),
            layout,
            extent,
        );
    }

    fn request_redraw(&mut self) {
        self.needs_redraw.set(true);
    }
}
