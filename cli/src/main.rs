use std::{
    collections::HashSet,
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::mpsc::Sender,
    thread,
};

use anyhow::{Context, Result};
use archive::{HistoryReader, Roster, RECORD_WIDTH};
use byte_unit::Byte;
use canvas::{
    record_from_update, CanvasState, CanvasSurface, GrayMix, Headless, Highlight, LiveFeed,
    PlacementOutbox, PlayerKeys, ReplayConfig, ReplayScheduler,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use player::PlayOptions;
use structures::{messages::PixelUpdate, PixelRecord};

mod inputs;
mod pack;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a history in a window
    Play {
        history: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, default_value_t = 10)]
        batch_size: usize,
        #[arg(long, default_value_t = 10)]
        batches_per_yield: usize,
        /// Host loop ticks per second, one replay step each
        #[arg(long, default_value_t = player::FPS)]
        ups: u32,
    },
    /// Render placements read from stdin, one JSON frame per line
    Live {
        #[command(flatten)]
        view: ViewArgs,
        /// Click to place pixels of this color; each placement is printed to
        /// stdout as one JSON line for the transport to sign
        #[arg(long)]
        color: Option<String>,
    },
    /// Render history to an image
    Render {
        history: PathBuf,
        out_file: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
        /// Stop after this many records; all of them if not set
        #[arg(long)]
        up_to: Option<usize>,
    },
    /// Repack a CSV placement log into a history and a players file
    Pack {
        in_file: PathBuf,
        out_file: PathBuf,
        players_file: PathBuf,
    },
    /// Summarize a history
    Info { history: PathBuf },
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// PNG file, or a file with the PNG as base64 text
    #[arg(long)]
    base_image: PathBuf,
    /// Highlight this player and gray out everyone else
    #[arg(long)]
    address: Option<String>,
    /// Newline-delimited player addresses, in player index order
    #[arg(long)]
    players: Option<PathBuf>,
    /// `handle,address` CSV of display names
    #[arg(long)]
    handles: Option<PathBuf>,
    /// Weight R, G, B in channel order when graying out
    #[arg(long)]
    standard_gray: bool,
}

impl ViewArgs {
    fn gray_mix(&self) -> GrayMix {
        if self.standard_gray {
            GrayMix::Standard
        } else {
            GrayMix::Legacy
        }
    }

    fn roster(&self) -> Result<Roster> {
        inputs::load_roster(self.players.as_deref(), self.handles.as_deref())
    }

    fn play_options(&self, replay: ReplayConfig, updates_per_second: u32) -> Result<PlayOptions> {
        let roster = self.roster()?;
        let highlight = inputs::highlight_for(self.address.as_deref(), &roster, self.gray_mix());

        Ok(PlayOptions {
            replay,
            highlight,
            roster,
            updates_per_second,
        })
    }

    /// Live keys are numbered after the roster, so a roster address cannot
    /// name a live player and `--address` is ignored.
    fn live_options(&self) -> Result<PlayOptions> {
        if let Some(address) = &self.address {
            warn!("--address {} has no effect on a live feed", address);
        }

        Ok(PlayOptions {
            replay: ReplayConfig::default(),
            highlight: Highlight::none().with_mix(self.gray_mix()),
            roster: self.roster()?,
            updates_per_second: player::FPS,
        })
    }
}

/// Reads a history file of raw records, or of records written as base64 text.
fn open_history(path: &Path) -> Result<HistoryReader> {
    let mut bytes = fs::read(path).with_context(|| format!("read history '{}'", path.display()))?;

    if bytes.len() % RECORD_WIDTH != 0 {
        if let Ok(decoded) = inputs::decode_base64(&bytes) {
            if decoded.len() % RECORD_WIDTH == 0 {
                info!("{} holds base64 text, decoded it", path.display());
                bytes = decoded;
            }
        }
    }

    HistoryReader::new(bytes).with_context(|| format!("decode history '{}'", path.display()))
}

fn render(history: &Path, out_file: &Path, view: &ViewArgs, up_to: Option<usize>) -> Result<()> {
    let base = inputs::load_base_image(&view.base_image)?;
    let history = open_history(history)?;
    let roster = view.roster()?;
    let highlight = inputs::highlight_for(view.address.as_deref(), &roster, view.gray_mix());

    let mut canvas = CanvasState::new(CanvasSurface::from_image(base, Headless), highlight);
    let mut scheduler = ReplayScheduler::new(history, ReplayConfig::default());
    if let Some(limit) = up_to {
        scheduler = scheduler.limit_to(limit);
    }
    scheduler.run_to_end(&mut canvas);

    canvas
        .into_surface()
        .into_image()
        .save(out_file)
        .with_context(|| format!("write image '{}'", out_file.display()))?;
    info!("wrote {}", out_file.display());

    Ok(())
}

/// Parses frames from `input` until it ends or the receiver goes away.
fn forward_frames(input: impl BufRead, sender: Sender<PixelRecord>, first_player: u32) {
    let mut players = PlayerKeys::starting_at(first_player);

    for (line_number, line) in input.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("stopped reading frames: {}", err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let record = PixelUpdate::from_json(&line)
            .map_err(anyhow::Error::from)
            .and_then(|update| Ok(record_from_update(&update, &mut players)?));
        match record {
            Ok(record) => {
                if sender.send(record).is_err() {
                    break;
                }
            }
            Err(err) => warn!("ignoring frame on line {}: {:#}", line_number + 1, err),
        }
    }
}

fn live(view: &ViewArgs, color: Option<&str>) -> Result<()> {
    let base = inputs::load_base_image(&view.base_image)?;
    let options = view.live_options()?;
    let outbox = match color {
        Some(text) => {
            let [r, g, b, _] = pack::parse_color(text)?;
            let nonce = chrono::Utc::now().timestamp_millis().max(0) as u64;
            info!("placing #{:02x}{:02x}{:02x} on click", r, g, b);
            Some(PlacementOutbox::new(io::stdout(), [r, g, b]).with_nonce(nonce))
        }
        None => None,
    };

    // Keys seen live get indices after the known players.
    let first_player = options.roster.len() as u32;
    let (sender, feed) = LiveFeed::channel();
    thread::spawn(move || forward_frames(io::stdin().lock(), sender, first_player));

    player::live(base, feed, outbox, options)?;
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let history = open_history(path)?;

    let mut players = HashSet::new();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for record in &history {
        players.insert(record.player_index);
        bounds = Some(match bounds {
            None => (record.x, record.y, record.x, record.y),
            Some((min_x, min_y, max_x, max_y)) => (
                min_x.min(record.x),
                min_y.min(record.y),
                max_x.max(record.x),
                max_y.max(record.y),
            ),
        });
    }

    println!("records: {}", history.len());
    println!(
        "size: {}",
        Byte::from_bytes(history.byte_len() as u128).get_appropriate_unit(true)
    );
    println!("players: {}", players.len());
    match bounds {
        Some((min_x, min_y, max_x, max_y)) => {
            println!("bounds: ({}, {}) to ({}, {})", min_x, min_y, max_x, max_y)
        }
        None => println!("bounds: empty"),
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            history,
            view,
            batch_size,
            batches_per_yield,
            ups,
        } => {
            let base = inputs::load_base_image(&view.base_image)?;
            let history = open_history(&history)?;
            let options = view.play_options(
                ReplayConfig {
                    batch_size,
                    batches_per_yield,
                },
                ups,
            )?;

            player::play(base, history, options)?;
        }
        Commands::Live { view, color } => live(&view, color.as_deref())?,
        Commands::Render {
            history,
            out_file,
            view,
            up_to,
        } => render(&history, &out_file, &view, up_to)?,
        Commands::Pack {
            in_file,
            out_file,
            players_file,
        } => pack::pack(&in_file, &out_file, &players_file)?,
        Commands::Info { history } => info(&history)?,
    }

    Ok(())
}
