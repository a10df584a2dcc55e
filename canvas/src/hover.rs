use std::time::{Duration, Instant};

use crate::attribution::AttributionIndex;

/// How long the pointer has to rest before its pixel is looked up.
pub const HOVER_DELAY: Duration = Duration::from_millis(10);

/// Result of a hover lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hover {
    Player(u32),
    /// Off the canvas, or over a pixel nobody placed.
    Nobody,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    pixel: Option<(u32, u32)>,
    since: Instant,
}

/// Resolves only the last pointer position, once it has been still for the
/// delay. Every move restarts the wait.
#[derive(Debug, Clone)]
pub struct HoverDebounce {
    delay: Duration,
    pending: Option<Pending>,
}

impl Default for HoverDebounce {
    fn default() -> Self {
        Self::new(HOVER_DELAY)
    }
}

impl HoverDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// `pixel` is the canvas pixel under the pointer, `None` off canvas.
    pub fn pointer_moved(&mut self, pixel: Option<(u32, u32)>, now: Instant) {
        self.pending = Some(Pending { pixel, since: now });
    }

    /// Returns a lookup once the delay has passed since the last move, then
    /// nothing until the pointer moves again.
    pub fn poll(&mut self, now: Instant, attribution: &AttributionIndex) -> Option<Hover> {
        let pending = self.pending?;
        if now.saturating_duration_since(pending.since) < self.delay {
            return None;
        }

        self.pending = None;
        Some(
            pending
                .pixel
                .and_then(|(x, y)| attribution.lookup(x, y))
                .map_or(Hover::Nobody, Hover::Player),
        )
    }
}
