use image::RgbaImage;
use log::{debug, trace};
use structures::Rgba;

use crate::errors::CanvasError;

/// Rectangle of the canvas that changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DirtyRegion {
    pub fn pixel(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            width: 1,
            height: 1,
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Grows the region to cover `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        let right = (self.x + self.width).max(x + 1);
        let bottom = (self.y + self.height).max(y + 1);
        self.x = self.x.min(x);
        self.y = self.y.min(y);
        self.width = right - self.x;
        self.height = bottom - self.y;
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// The display-side copy of a canvas, typically a GPU texture.
///
/// A mirror only ever receives pixels through [`CanvasSurface::flush`], so it
/// lags behind the buffer between flushes.
pub trait TextureMirror {
    /// Copies `region` of `canvas` into the mirror.
    fn upload(&mut self, canvas: &RgbaImage, region: DirtyRegion);

    /// Asks the host to draw the mirror again.
    fn request_redraw(&mut self);
}

/// Mirror for canvases that are never displayed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl TextureMirror for Headless {
    fn upload(&mut self, _canvas: &RgbaImage, _region: DirtyRegion) {}

    fn request_redraw(&mut self) {}
}

/// The full map image plus its texture mirror.
///
/// The buffer is the source of truth for every read; the mirror is only
/// brought up to date by [`CanvasSurface::flush`].
pub struct CanvasSurface<M: TextureMirror> {
    image: RgbaImage,
    mirror: M,
    dirty: Option<DirtyRegion>,
}

impl<M: TextureMirror> CanvasSurface<M> {
    /// Decodes a base image (PNG or anything else `image` recognizes) and
    /// sizes the canvas after it.
    pub fn load_base_image(bytes: &[u8], mirror: M) -> Result<Self, CanvasError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        debug!("loaded {}x{} base image", image.width(), image.height());

        Ok(Self::from_image(image, mirror))
    }

    pub fn from_image(image: RgbaImage, mirror: M) -> Self {
        let dirty = Some(DirtyRegion::full(image.width(), image.height()))
            .filter(|region| region.area() > 0);

        Self {
            image,
            mirror,
            dirty,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.image.width() && y < self.image.height()
    }

    fn check_bounds(&self, x: u32, y: u32) -> Result<(), CanvasError> {
        if self.contains(x, y) {
            Ok(())
        } else {
            Err(CanvasError::OutOfBounds {
                x,
                y,
                width: self.image.width(),
                height: self.image.height(),
            })
        }
    }

    /// Writes one pixel into the buffer. Nothing reaches the mirror until the
    /// next flush.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) -> Result<(), CanvasError> {
        self.check_bounds(x, y)?;
        self.image.put_pixel(x, y, image::Rgba(color));

        match &mut self.dirty {
            Some(region) => region.include(x, y),
            None => self.dirty = Some(DirtyRegion::pixel(x, y)),
        }

        Ok(())
    }

    pub fn get_color(&self, x: u32, y: u32) -> Result<Rgba, CanvasError> {
        self.check_bounds(x, y)?;
        Ok(self.image.get_pixel(x, y).0)
    }

    /// Uploads everything changed since the last flush and requests one
    /// redraw.
    pub fn flush(&mut self) {
        if let Some(region) = self.dirty.take() {
            trace!("uploading {:?}", region);
            self.mirror.upload(&self.image, region);
        }

        self.mirror.request_redraw();
    }

    pub fn has_pending_changes(&self) -> bool {
        self.dirty.is_some()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}
