pub mod attribution;
mod errors;
pub mod highlight;
pub mod hover;
pub mod live;
pub mod scheduler;
mod state;
pub mod surface;
pub mod viewport;

pub use crate::attribution::AttributionIndex;
pub use crate::errors::{CanvasError, LiveError};
pub use crate::highlight::{GrayMix, Highlight};
pub use crate::hover::{Hover, HoverDebounce, HOVER_DELAY};
pub use crate::live::{
    apply_live, record_from_update, LiveFeed, PlacementOutbox, PlayerKeys, ANONYMOUS_PLAYER,
    LOCAL_PLAYER,
};
pub use crate::scheduler::{ReplayConfig, ReplayCursor, ReplayPhase, ReplayScheduler, Step};
pub use crate::state::CanvasState;
pub use crate::surface::{CanvasSurface, DirtyRegion, Headless, TextureMirror};
pub use crate::viewport::Viewport;
