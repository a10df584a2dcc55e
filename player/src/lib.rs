use std::{
    cell::Cell,
    io::Stdout,
    rc::Rc,
    time::{Duration, Instant},
};

use archive::{HistoryReader, Roster};
use canvas::{
    AttributionIndex, CanvasState, CanvasSurface, Highlight, Hover, HoverDebounce, LiveFeed,
    PlacementOutbox, ReplayConfig, ReplayCursor, ReplayScheduler, Viewport, ANONYMOUS_PLAYER,
    LOCAL_PLAYER,
};
use game_loop::{game_loop, Time, TimeTrait};
use image::RgbaImage;
use log::{error, info, warn};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{Event, VirtualKeyCode, WindowEvent},
    event_loop::EventLoop,
    window::WindowBuilder,
};
use winit_input_helper::WinitInputHelper;

mod errors;
mod pixel_art_display_state;
mod renderers;
mod texture_upload;
mod transform_generator;

pub use crate::errors::PlayerError;
pub use crate::texture_upload::GpuTextureMirror;
pub use crate::transform_generator::TransformGenerator;

use crate::pixel_art_display_state::PixelArtDisplayState;

pub const FPS: u32 = 60;
pub const TIME_STEP: Duration = Duration::from_nanos(1_000_000_000 / FPS as u64);

const TITLE: &str = "Pixel War";
const WHEEL_ZOOM: f64 = 1.05;
const KEY_ZOOM: f64 = 1.2;
/// Pointer travel, in physical pixels, below which a press and release is a
/// click rather than a drag.
const CLICK_SLOP: f64 = 4.0;

pub struct PlayOptions {
    pub replay: ReplayConfig,
    pub highlight: Highlight,
    /// Names shown when hovering a pixel.
    pub roster: Roster,
    /// Host loop ticks per second; every tick steps the replay once.
    pub updates_per_second: u32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            replay: ReplayConfig::default(),
            highlight: Highlight::none(),
            roster: Roster::default(),
            updates_per_second: FPS,
        }
    }
}

enum Feed {
    Replay(ReplayScheduler),
    Live(LiveFeed, Option<PlacementOutbox<Stdout>>),
}

/// Name shown for a hovered player, with how many visible pixels they own.
fn player_label(roster: &Roster, attribution: &AttributionIndex, index: u32) -> String {
    let name = match index {
        ANONYMOUS_PLAYER => "anonymous".to_string(),
        LOCAL_PLAYER => "you".to_string(),
        _ => roster
            .display_name(index)
            .unwrap_or_else(|| format!("player #{}", index)),
    };

    format!("{} ({} px)", name, attribution.pixels_owned_by(index))
}

fn format_title(cursor: Option<ReplayCursor>, feed_closed: bool, hovered: Option<&str>) -> String {
    let mut title = TITLE.to_string();

    if let Some(cursor) = cursor {
        title.push_str(&format!(" [{}/{}]", cursor.position, cursor.total_records));
        if cursor.paused {
            title.push_str(" paused");
        }
    }
    if feed_closed {
        title.push_str(" [feed closed]");
    }
    if let Some(name) = hovered {
        title.push_str(" - ");
        title.push_str(name);
    }

    title
}

struct Player {
    feed: Feed,
    canvas: CanvasState<GpuTextureMirror>,
    display: PixelArtDisplayState,
    viewport: Viewport,
    hover: HoverDebounce,
    hovered: Option<String>,
    /// Where the left button went down and how far it has travelled since.
    press: Option<((f64, f64), f64)>,
    roster: Roster,
    title: String,
    needs_redraw: Rc<Cell<bool>>,
}

impl Player {
    fn new(
        feed: Feed,
        canvas: CanvasState<GpuTextureMirror>,
        display: PixelArtDisplayState,
        roster: Roster,
        needs_redraw: Rc<Cell<bool>>,
    ) -> Self {
        let (width, height) = canvas.surface().dimensions();
        let (screen_width, screen_height) = display.window_size();
        let mut viewport = Viewport::default();
        viewport.fit(width, height, screen_width as f64, screen_height as f64);

        let mut player = Self {
            feed,
            canvas,
            display,
            viewport,
            hover: HoverDebounce::default(),
            hovered: None,
            press: None,
            roster,
            title: String::new(),
            needs_redraw,
        };
        player.title = player.compose_title();
        player
    }

    /// One host tick: advance the feed, then resolve a pending hover.
    /// Returns the new window title when it changed.
    pub fn update(&mut self, now: Instant) -> Option<String> {
        match &mut self.feed {
            Feed::Replay(scheduler) => {
                scheduler.step(&mut self.canvas);
            }
            Feed::Live(feed, _) => {
                feed.drain_into(&mut self.canvas);
            }
        }

        if let Some(hover) = self.hover.poll(now, self.canvas.attribution()) {
            self.hovered = match hover {
                Hover::Player(index) => {
                    Some(player_label(&self.roster, self.canvas.attribution(), index))
                }
                Hover::Nobody => None,
            };
        }

        let title = self.compose_title();
        if title == self.title {
            return None;
        }
        self.title = title;
        Some(self.title.clone())
    }

    fn compose_title(&self) -> String {
        let (cursor, feed_closed) = match &self.feed {
            Feed::Replay(scheduler) => (Some(scheduler.cursor()), false),
            Feed::Live(feed, _) => (None, feed.is_closed()),
        };

        format_title(cursor, feed_closed, self.hovered.as_deref())
    }

    /// Sends a placement for the pixel under a click, when this is a live
    /// window that can place.
    fn place_at(&mut self, screen: (f64, f64)) {
        let Feed::Live(_, Some(outbox)) = &mut self.feed else {
            return;
        };

        match outbox.place(&mut self.canvas, &self.viewport, screen) {
            Ok(Some(inner)) => info!("placement #{} sent, nonce {}", outbox.sent(), inner.nonce),
            Ok(None) => {}
            Err(err) => warn!("could not place pixel: {}", err),
        }
    }

    pub fn draw(&mut self) -> Result<(), PlayerError> {
        if !self.needs_redraw.replace(false) {
            return Ok(());
        }

        self.display.render(&self.viewport)
    }

    pub fn handle_input(&mut self, input: &WinitInputHelper, now: Instant) {
        let before = self.viewport;
        let (screen_width, screen_height) = self.display.window_size();
        let center = (screen_width as f64 / 2.0, screen_height as f64 / 2.0);
        let pointer = input.mouse().map(|(x, y)| (x as f64, y as f64));

        let scrolled = input.scroll_diff();
        if scrolled != 0.0 {
            let factor = if scrolled > 0.0 {
                WHEEL_ZOOM
            } else {
                1.0 / WHEEL_ZOOM
            };
            self.viewport.zoom_at(factor, pointer.unwrap_or(center));
        }

        if input.mouse_pressed(0) {
            self.press = pointer.map(|point| (point, 0.0));
        }
        if input.mouse_held(0) {
            let (x, y) = input.mouse_diff();
            self.viewport.pan(x as f64, y as f64);
            if let Some((_, travelled)) = &mut self.press {
                *travelled += (x as f64).abs() + (y as f64).abs();
            }
        }
        if input.mouse_released(0) {
            // Panning keeps the pressed pixel under the pointer.
            if let Some((origin, travelled)) = self.press.take() {
                if travelled < CLICK_SLOP {
                    self.place_at(pointer.unwrap_or(origin));
                }
            }
        }

        if input.key_pressed(VirtualKeyCode::Plus)
            || input.key_pressed(VirtualKeyCode::Equals)
            || input.key_pressed(VirtualKeyCode::NumpadAdd)
        {
            self.viewport.zoom_at(KEY_ZOOM, center);
        }
        if input.key_pressed(VirtualKeyCode::Minus)
            || input.key_pressed(VirtualKeyCode::NumpadSubtract)
        {
            self.viewport.zoom_at(1.0 / KEY_ZOOM, center);
        }

        if input.key_pressed(VirtualKeyCode::Space) {
            if let Feed::Replay(scheduler) = &mut self.feed {
                scheduler.toggle_pause();
                info!("replay {:?} at {:?}", scheduler.phase(), scheduler.cursor());
            }
        }

        let moved = input.mouse_diff() != (0.0, 0.0);
        if self.viewport != before {
            self.needs_redraw.set(true);
        }
        if moved || self.viewport != before {
            let (width, height) = self.canvas.surface().dimensions();
            let pixel = pointer.and_then(|point| self.viewport.pixel_at(point, width, height));
            self.hover.pointer_moved(pixel, now);
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.display.resize_surface(size.width, size.height);
        self.needs_redraw.set(true);
    }
}

/// Opens a window showing `base` and replays `history` onto it.
pub fn play(
    base: RgbaImage,
    history: HistoryReader,
    options: PlayOptions,
) -> Result<(), PlayerError> {
    let mut scheduler = ReplayScheduler::new(history, options.replay);
    scheduler.start();

    run(base, Feed::Replay(scheduler), options)
}

/// Opens a window showing `base` and applies live records as they arrive.
/// With an outbox, clicking the canvas places a pixel.
pub fn live(
    base: RgbaImage,
    feed: LiveFeed,
    outbox: Option<PlacementOutbox<Stdout>>,
    options: PlayOptions,
) -> Result<(), PlayerError> {
    run(base, Feed::Live(feed, outbox), options)
}

fn run(base: RgbaImage, feed: Feed, options: PlayOptions) -> Result<(), PlayerError> {
    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();

    let (width, height) = base.dimensions();
    let window = {
        let size = LogicalSize::new(width.clamp(400, 1200) as f64, height.clamp(400, 900) as f64);
        WindowBuilder::new()
            .with_title(TITLE)
            .with_inner_size(size)
            .build(&event_loop)?
    };

    let needs_redraw = Rc::new(Cell::new(true));
    let (display, mirror) =
        PixelArtDisplayState::new(&window, (width, height), needs_redraw.clone())?;

    let mut canvas = CanvasState::new(CanvasSurface::from_image(base, mirror), options.highlight);
    canvas.flush();

    let player = Player::new(feed, canvas, display, options.roster, needs_redraw);
    let updates_per_second = options.updates_per_second.max(1);
    info!("window open, {} updates per second", updates_per_second);

    game_loop(
        event_loop,
        window.into(),
        player,
        updates_per_second,
        0.1,
        move |g| {
            if let Some(title) = g.game.update(Instant::now()) {
                g.window.set_title(&title);
            }
        },
        move |g| {
            if let Err(err) = g.game.draw() {
                error!("{}", err);
                g.exit();
            }

            let dt = TIME_STEP.as_secs_f64() - Time::now().sub(&g.current_instant());
            if dt > 0.0 {
                std::thread::sleep(Duration::from_secs_f64(dt));
            }
        },
        move |g, event| {
            if input.update(event) {
                g.game.handle_input(&input, Instant::now());
            }

            if let Event::WindowEvent { event, .. } = event {
                match event {
                    WindowEvent::CloseRequested => g.exit(),
                    WindowEvent::Resized(physical_size) => {
                        g.game.resize(*physical_size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        g.game.resize(**new_inner_size);
                    }
                    _ => (),
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_players_and_count_their_pixels() {
        let mut roster = Roster::from_addresses("tz1a\ntz1b\n");
        roster.read_handles("alice,tz1a\n".as_bytes()).unwrap();
        let mut attribution = AttributionIndex::new();
        attribution.record(0, 0, 0);
        attribution.record(1, 0, 0);
        attribution.record(2, 0, LOCAL_PLAYER);

        assert_eq!(player_label(&roster, &attribution, 0), "@alice as tz1a (2 px)");
        assert_eq!(player_label(&roster, &attribution, 1), "anon as tz1b (0 px)");
        assert_eq!(player_label(&roster, &attribution, 7), "player #7 (0 px)");
        assert_eq!(player_label(&roster, &attribution, LOCAL_PLAYER), "you (1 px)");
        assert_eq!(
            player_label(&roster, &attribution, ANONYMOUS_PLAYER),
            "anonymous (0 px)"
        );
    }

    #[test]
    fn title_shows_progress_and_feed_state() {
        let cursor = ReplayCursor {
            position: 20,
            total_records: 35,
            paused: true,
        };

        assert_eq!(format_title(None, false, None), "Pixel War");
        assert_eq!(
            format_title(Some(cursor), false, Some("you (1 px)")),
            "Pixel War [20/35] paused - you (1 px)"
        );
        assert_eq!(format_title(None, true, None), "Pixel War [feed closed]");
    }
}
