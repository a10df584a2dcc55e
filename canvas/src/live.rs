use std::{
    collections::HashMap,
    io::Write,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
};

use log::{debug, info, warn};
use structures::{
    messages::{Inner, PixelUpdate, PlacePixel},
    PixelRecord,
};

use crate::{errors::LiveError, state::CanvasState, surface::TextureMirror, viewport::Viewport};

/// Player index given to frames that carry no public key.
pub const ANONYMOUS_PLAYER: u32 = u32::MAX;

/// Player index of placements made from this client.
pub const LOCAL_PLAYER: u32 = u32::MAX - 1;

/// Applies a single live record and flushes right away.
pub fn apply_live<M: TextureMirror>(
    canvas: &mut CanvasState<M>,
    record: &PixelRecord,
) -> Result<(), LiveError> {
    canvas.apply(record)?;
    canvas.flush();
    Ok(())
}

/// Hands out player indices to public keys in the order they first show up.
#[derive(Debug, Default, Clone)]
pub struct PlayerKeys {
    first_index: u32,
    keys: Vec<String>,
    indices: HashMap<String, u32>,
}

impl PlayerKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers new keys from `first_index` on, e.g. after the players of a
    /// roster.
    pub fn starting_at(first_index: u32) -> Self {
        Self {
            first_index,
            ..Self::default()
        }
    }

    pub fn index_of(&mut self, key: &str) -> u32 {
        if let Some(index) = self.indices.get(key) {
            return *index;
        }

        let index = self.first_index + self.keys.len() as u32;
        self.keys.push(key.to_string());
        self.indices.insert(key.to_string(), index);
        index
    }

    pub fn key(&self, index: u32) -> Option<&str> {
        index
            .checked_sub(self.first_index)
            .and_then(|offset| self.keys.get(offset as usize))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Turns an inbound frame into a record.
pub fn record_from_update(
    update: &PixelUpdate,
    players: &mut PlayerKeys,
) -> Result<PixelRecord, LiveError> {
    let pixel = update.place_pixel();
    let color = pixel
        .rgba()
        .ok_or(LiveError::BadColor(pixel.color.len()))?;
    let player_index = match &update.pkey {
        Some(key) => players.index_of(key.as_str()),
        None => ANONYMOUS_PLAYER,
    };

    Ok(PixelRecord::new(pixel.x, pixel.y, color, player_index))
}

/// Receiving end of a stream of live records.
pub struct LiveFeed {
    receiver: Receiver<PixelRecord>,
    applied: usize,
    rejected: usize,
    closed: bool,
}

impl LiveFeed {
    pub fn new(receiver: Receiver<PixelRecord>) -> Self {
        Self {
            receiver,
            applied: 0,
            rejected: 0,
            closed: false,
        }
    }

    /// A feed together with the sender that drives it.
    pub fn channel() -> (Sender<PixelRecord>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self::new(receiver))
    }

    /// Applies every record that has arrived since the last call, each with
    /// its own flush. Returns how many were applied. Never blocks.
    pub fn drain_into<M: TextureMirror>(&mut self, canvas: &mut CanvasState<M>) -> usize {
        let mut applied = 0;

        loop {
            match self.receiver.try_recv() {
                Ok(record) => match apply_live(canvas, &record) {
                    Ok(()) => applied += 1,
                    Err(err) => {
                        warn!("dropping live placement: {}", err);
                        self.rejected += 1;
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        info!("live feed closed after {} placements", self.applied + applied);
                        self.closed = true;
                    }
                    break;
                }
            }
        }

        if applied > 0 {
            debug!("applied {} live placements", applied);
        }
        self.applied += applied;
        applied
    }

    /// True once every sender is gone and the backlog has been drained.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Sends placements made by clicking the canvas and paints them right away.
///
/// Every placement is written to `out` as one line holding the signing
/// payload of its `inner` body. Signing it and wrapping it into a frame is
/// up to whoever reads that line.
pub struct PlacementOutbox<W: Write> {
    out: W,
    color: [u8; 3],
    next_nonce: u64,
    sent: usize,
}

impl<W: Write> PlacementOutbox<W> {
    pub fn new(out: W, color: [u8; 3]) -> Self {
        Self {
            out,
            color,
            next_nonce: 0,
            sent: 0,
        }
    }

    /// Numbers placements from `nonce` on.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.next_nonce = nonce;
        self
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Places a pixel at the canvas point under `screen`. Returns the body
    /// that was sent, or `None` when the point is off the canvas.
    pub fn place<M: TextureMirror>(
        &mut self,
        canvas: &mut CanvasState<M>,
        viewport: &Viewport,
        screen: (f64, f64),
    ) -> Result<Option<Inner>, LiveError> {
        let (x, y) = viewport.screen_to_canvas(screen);
        let Some(pixel) = PlacePixel::from_canvas_point(x, y, &self.color) else {
            return Ok(None);
        };
        if !canvas.surface().contains(pixel.x, pixel.y) {
            return Ok(None);
        }

        let [r, g, b] = self.color;
        let record = PixelRecord::new(pixel.x, pixel.y, [r, g, b, 0xff], LOCAL_PLAYER);
        let inner = Inner::place_pixel(self.next_nonce, pixel);

        writeln!(self.out, "{}", inner.signing_payload()?)?;
        self.out.flush()?;
        self.next_nonce += 1;
        self.sent += 1;
        debug!("sent placement at ({}, {})", record.x, record.y);

        apply_live(canvas, &record)?;
        Ok(Some(inner))
    }
}
