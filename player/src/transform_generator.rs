use canvas::Viewport;
use ultraviolet::{Mat4, Vec4};

/// Builds the matrix that takes canvas pixels to clip space for the current
/// viewport and window size.
pub struct TransformGenerator {
    window_size: (u32, u32),
}

impl TransformGenerator {
    pub fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_size: (window_width, window_height),
        }
    }

    pub fn on_window_resize(&mut self, new_width: u32, new_height: u32) {
        self.window_size = (new_width, new_height);
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    pub fn get_transform_matrix(&self, viewport: &Viewport) -> Mat4 {
        let width = self.window_size.0.max(1) as f32;
        let height = self.window_size.1.max(1) as f32;
        let zoom = viewport.zoom() as f32;
        let (pan_x, pan_y) = (viewport.pan_x as f32, viewport.pan_y as f32);

        // screen = canvas * zoom + pan, then flip y into clip space.
        Mat4::new(
            Vec4::new(2.0 * zoom / width, 0.0, 0.0, 0.0),
            Vec4::new(0.0, -2.0 * zoom / height, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(2.0 * pan_x / width - 1.0, 1.0 - 2.0 * pan_y / height, 0.0, 1.0),
        )
    }
}
