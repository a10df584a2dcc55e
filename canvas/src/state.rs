use structures::PixelRecord;

use crate::{
    attribution::AttributionIndex,
    errors::CanvasError,
    highlight::Highlight,
    surface::{CanvasSurface, TextureMirror},
};

/// Everything a placement touches. Replay and live updates both go through
/// [`CanvasState::apply`], so a record renders the same either way.
pub struct CanvasState<M: TextureMirror> {
    surface: CanvasSurface<M>,
    attribution: AttributionIndex,
    highlight: Highlight,
}

impl<M: TextureMirror> CanvasState<M> {
    pub fn new(surface: CanvasSurface<M>, highlight: Highlight) -> Self {
        Self {
            surface,
            attribution: AttributionIndex::new(),
            highlight,
        }
    }

    /// Paints one record and attributes it. A record outside the canvas
    /// changes nothing.
    pub fn apply(&mut self, record: &PixelRecord) -> Result<(), CanvasError> {
        let color = self.highlight.decide_color(record.player_index, record.color);
        self.surface.set_pixel(record.x, record.y, color)?;
        self.attribution.record(record.x, record.y, record.player_index);

        Ok(())
    }

    pub fn flush(&mut self) {
        self.surface.flush();
    }

    pub fn surface(&self) -> &CanvasSurface<M> {
        &self.surface
    }

    pub fn attribution(&self) -> &AttributionIndex {
        &self.attribution
    }

    pub fn highlight(&self) -> &Highlight {
        &self.highlight
    }

    pub fn into_surface(self) -> CanvasSurface<M> {
        self.surface
    }
}
