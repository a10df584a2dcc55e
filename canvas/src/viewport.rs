/// Pan and zoom of the canvas inside the window.
///
/// `screen = canvas * zoom + pan`, with both points in physical pixels of the
/// window. Nothing here redraws; callers do that once they are done moving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    zoom: f64,
}

pub const MIN_ZOOM: f64 = 0.01;

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Convert screen coordinates to canvas coordinates.
    pub fn screen_to_canvas(&self, (sx, sy): (f64, f64)) -> (f64, f64) {
        ((sx - self.pan_x) / self.zoom, (sy - self.pan_y) / self.zoom)
    }

    /// Convert canvas coordinates to screen coordinates.
    pub fn canvas_to_screen(&self, (cx, cy): (f64, f64)) -> (f64, f64) {
        (cx * self.zoom + self.pan_x, cy * self.zoom + self.pan_y)
    }

    /// The canvas pixel under a screen point, if it lies on a
    /// `width`x`height` canvas.
    pub fn pixel_at(&self, screen: (f64, f64), width: u32, height: u32) -> Option<(u32, u32)> {
        let (cx, cy) = self.screen_to_canvas(screen);
        let (px, py) = (cx.floor(), cy.floor());

        if px >= 0.0 && py >= 0.0 && px < width as f64 && py < height as f64 {
            Some((px as u32, py as u32))
        } else {
            None
        }
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = if zoom.is_finite() {
            zoom.max(MIN_ZOOM)
        } else {
            MIN_ZOOM
        };
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    /// Zoom by `factor` while keeping the canvas point under `screen` fixed.
    pub fn zoom_at(&mut self, factor: f64, (sx, sy): (f64, f64)) {
        let anchor = self.screen_to_canvas((sx, sy));
        self.zoom_by(factor);
        self.pan_x = sx - anchor.0 * self.zoom;
        self.pan_y = sy - anchor.1 * self.zoom;
    }

    /// Center a `width`x`height` canvas in a screen of the given size,
    /// keeping the current zoom.
    pub fn center(&mut self, width: u32, height: u32, screen_width: f64, screen_height: f64) {
        self.pan_x = (screen_width - width as f64 * self.zoom) / 2.0;
        self.pan_y = (screen_height - height as f64 * self.zoom) / 2.0;
    }

    /// Largest zoom at which the whole canvas fits on screen.
    pub fn fit(&mut self, width: u32, height: u32, screen_width: f64, screen_height: f64) {
        if width == 0 || height == 0 || screen_width <= 0.0 || screen_height <= 0.0 {
            return;
        }

        self.set_zoom((screen_width / width as f64).min(screen_height / height as f64));
        self.center(width, height, screen_width, screen_height);
    }
}
