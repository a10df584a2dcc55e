use archive::HistoryReader;
use log::{info, warn};

use crate::{state::CanvasState, surface::TextureMirror};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Records applied between two flushes.
    pub batch_size: usize,
    /// Batches applied before control goes back to the host loop.
    pub batches_per_yield: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batches_per_yield: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayPhase {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCursor {
    pub position: usize,
    pub total_records: usize,
    pub paused: bool,
}

/// Why [`ReplayScheduler::step`] handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `start` has not been called yet.
    Idle,
    /// A yield point was reached; more records remain.
    Yielded,
    /// Paused; nothing was consumed.
    Paused,
    /// Every record has been applied.
    Finished,
}

/// Plays a history back onto a canvas a few batches at a time.
///
/// The host loop calls [`step`](Self::step) once per tick. Each call applies
/// up to `batches_per_yield` batches, flushing the canvas once per batch, and
/// then returns so input can be handled between steps.
pub struct ReplayScheduler {
    history: HistoryReader,
    config: ReplayConfig,
    phase: ReplayPhase,
    position: usize,
    total: usize,
    skipped: usize,
}

impl ReplayScheduler {
    pub fn new(history: HistoryReader, config: ReplayConfig) -> Self {
        let total = history.len();
        Self {
            history,
            config: ReplayConfig {
                batch_size: config.batch_size.max(1),
                batches_per_yield: config.batches_per_yield.max(1),
            },
            phase: ReplayPhase::Idle,
            position: 0,
            total,
            skipped: 0,
        }
    }

    /// Only replay the first `records` records.
    pub fn limit_to(mut self, records: usize) -> Self {
        self.total = records.min(self.history.len());
        self
    }

    pub fn start(&mut self) {
        if self.phase == ReplayPhase::Idle {
            info!(
                "replaying {} records in batches of {}",
                self.total, self.config.batch_size
            );
            self.phase = ReplayPhase::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.phase == ReplayPhase::Running {
            self.phase = ReplayPhase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == ReplayPhase::Paused {
            self.phase = ReplayPhase::Running;
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.phase {
            ReplayPhase::Running => self.pause(),
            ReplayPhase::Paused => self.resume(),
            _ => {}
        }
    }

    pub fn phase(&self) -> ReplayPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ReplayPhase::Finished
    }

    pub fn cursor(&self) -> ReplayCursor {
        ReplayCursor {
            position: self.position,
            total_records: self.total,
            paused: self.phase == ReplayPhase::Paused,
        }
    }

    pub fn config(&self) -> ReplayConfig {
        self.config
    }

    /// Records rejected so far because they fell outside the canvas.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Runs until the next yield point.
    pub fn step<M: TextureMirror>(&mut self, canvas: &mut CanvasState<M>) -> Step {
        match self.phase {
            ReplayPhase::Idle => return Step::Idle,
            ReplayPhase::Paused => return Step::Paused,
            ReplayPhase::Finished => return Step::Finished,
            ReplayPhase::Running => {}
        }

        for _ in 0..self.config.batches_per_yield {
            if self.position >= self.total {
                break;
            }
            self.apply_batch(canvas);
        }

        if self.position >= self.total {
            self.finish();
            Step::Finished
        } else {
            Step::Yielded
        }
    }

    fn apply_batch<M: TextureMirror>(&mut self, canvas: &mut CanvasState<M>) {
        let end = (self.position + self.config.batch_size).min(self.total);

        for (index, record) in self
            .history
            .iter_from(self.position)
            .take(end - self.position)
            .enumerate()
        {
            if let Err(err) = canvas.apply(&record) {
                warn!("skipping record {}: {}", self.position + index, err);
                self.skipped += 1;
            }
        }

        canvas.flush();
        self.position = end;
    }

    fn finish(&mut self) {
        self.phase = ReplayPhase::Finished;
        info!(
            "replay finished after {} records ({} skipped)",
            self.position, self.skipped
        );
    }

    /// Applies every remaining record without yielding to anyone. Resumes a
    /// paused replay first.
    pub fn run_to_end<M: TextureMirror>(&mut self, canvas: &mut CanvasState<M>) {
        self.start();
        self.resume();
        while self.step(canvas) != Step::Finished {}
    }
}

#[cfg(test)]
mod tests {
    use archive::encode_records;
    use image::RgbaImage;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use structures::PixelRecord;

    use super::*;
    use crate::{
        highlight::Highlight,
        surface::{tests::RecordingMirror, CanvasSurface, Headless},
    };

    const SIZE: u32 = 16;

    fn random_records(count: usize, seed: u64) -> Vec<PixelRecord> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                PixelRecord::new(
                    rng.gen_range(0..SIZE),
                    rng.gen_range(0..SIZE),
                    rng.gen(),
                    rng.gen_range(0..5),
                )
            })
            .collect()
    }

    fn history(records: &[PixelRecord]) -> HistoryReader {
        HistoryReader::new(encode_records(records).unwrap()).unwrap()
    }

    fn blank_canvas() -> CanvasState<Headless> {
        CanvasState::new(
            CanvasSurface::from_image(RgbaImage::new(SIZE, SIZE), Headless),
            Highlight::none(),
        )
    }

    fn replay(records: &[PixelRecord], config: ReplayConfig) -> CanvasState<Headless> {
        let mut canvas = blank_canvas();
        let mut scheduler = ReplayScheduler::new(history(records), config);
        scheduler.run_to_end(&mut canvas);
        canvas
    }

    fn assert_same_state(a: &CanvasState<Headless>, b: &CanvasState<Headless>) {
        assert_eq!(a.surface().image(), b.surface().image());
        assert_eq!(a.attribution(), b.attribution());
    }

    #[test]
    fn walks_through_the_phases() {
        let records = random_records(25, 1);
        let mut canvas = blank_canvas();
        let mut scheduler = ReplayScheduler::new(
            history(&records),
            ReplayConfig {
                batch_size: 5,
                batches_per_yield: 2,
            },
        );

        assert_eq!(scheduler.step(&mut canvas), Step::Idle);
        assert_eq!(scheduler.cursor().position, 0);

        scheduler.start();
        assert_eq!(scheduler.step(&mut canvas), Step::Yielded);
        assert_eq!(scheduler.cursor().position, 10);
        assert_eq!(scheduler.step(&mut canvas), Step::Yielded);
        assert_eq!(scheduler.cursor().position, 20);
        assert_eq!(scheduler.step(&mut canvas), Step::Finished);
        assert_eq!(
            scheduler.cursor(),
            ReplayCursor {
                position: 25,
                total_records: 25,
                paused: false
            }
        );

        assert_eq!(scheduler.step(&mut canvas), Step::Finished);
        scheduler.start();
        assert!(scheduler.is_finished());
    }

    #[test]
    fn flushes_once_per_batch() {
        let records = random_records(23, 2);
        let mirror = RecordingMirror::default();
        let log = mirror.log.clone();
        let mut canvas = CanvasState::new(
            CanvasSurface::from_image(RgbaImage::new(SIZE, SIZE), mirror),
            Highlight::none(),
        );
        let mut scheduler = ReplayScheduler::new(history(&records), ReplayConfig::default());

        scheduler.run_to_end(&mut canvas);

        // 10 + 10 + 3 records
        assert_eq!(log.borrow().redraws, 3);
        assert_eq!(log.borrow().texture.as_ref(), Some(canvas.surface().image()));
    }

    #[test]
    fn final_state_matches_the_last_write() {
        let records = random_records(400, 3);
        let canvas = replay(&records, ReplayConfig::default());

        for record in records.iter().rev() {
            let last = records
                .iter()
                .rev()
                .find(|other| (other.x, other.y) == (record.x, record.y))
                .unwrap();
            assert_eq!(
                canvas.surface().get_color(record.x, record.y).unwrap(),
                last.color
            );
            assert_eq!(
                canvas.attribution().lookup(record.x, record.y),
                Some(last.player_index)
            );
        }
    }

    #[test]
    fn batching_does_not_change_the_result() {
        let records = random_records(137, 4);
        let reference = replay(
            &records,
            ReplayConfig {
                batch_size: 1,
                batches_per_yield: 1,
            },
        );

        for batch_size in [2, 7, 10, 136, 500] {
            let batched = replay(
                &records,
                ReplayConfig {
                    batch_size,
                    batches_per_yield: 3,
                },
            );
            assert_same_state(&reference, &batched);
        }
    }

    #[test]
    fn split_replays_match_a_single_pass() {
        let records = random_records(60, 5);
        let reference = replay(&records, ReplayConfig::default());

        for split in [1, 17, 59] {
            let mut canvas = blank_canvas();
            ReplayScheduler::new(history(&records[..split]), ReplayConfig::default())
                .run_to_end(&mut canvas);
            ReplayScheduler::new(history(&records[split..]), ReplayConfig::default())
                .run_to_end(&mut canvas);
            assert_same_state(&reference, &canvas);
        }
    }

    #[test]
    fn pausing_consumes_nothing() {
        let records = random_records(300, 6);
        let reference = replay(&records, ReplayConfig::default());

        let mut canvas = blank_canvas();
        let mut scheduler = ReplayScheduler::new(history(&records), ReplayConfig::default());
        scheduler.start();
        assert_eq!(scheduler.step(&mut canvas), Step::Yielded);

        scheduler.toggle_pause();
        let paused_at = scheduler.cursor();
        assert!(paused_at.paused);
        for _ in 0..5 {
            assert_eq!(scheduler.step(&mut canvas), Step::Paused);
        }
        assert_eq!(scheduler.cursor(), paused_at);

        scheduler.toggle_pause();
        assert_eq!(scheduler.phase(), ReplayPhase::Running);
        while scheduler.step(&mut canvas) != Step::Finished {}

        assert_same_state(&reference, &canvas);
    }

    #[test]
    fn out_of_bounds_records_are_skipped() {
        env_logger::try_init().ok();

        let records = vec![
            PixelRecord::new(0, 0, [1, 1, 1, 255], 0),
            PixelRecord::new(SIZE, 0, [2, 2, 2, 255], 1),
            PixelRecord::new(1, 1, [3, 3, 3, 255], 2),
        ];
        let mut canvas = blank_canvas();
        let mut scheduler = ReplayScheduler::new(history(&records), ReplayConfig::default());

        scheduler.run_to_end(&mut canvas);

        assert!(scheduler.is_finished());
        assert_eq!(scheduler.skipped(), 1);
        assert_eq!(canvas.surface().get_color(1, 1).unwrap(), [3, 3, 3, 255]);
        assert_eq!(canvas.attribution().len(), 2);
    }

    #[test]
    fn limit_stops_early() {
        let records = random_records(50, 7);
        let mut canvas = blank_canvas();
        let mut scheduler =
            ReplayScheduler::new(history(&records), ReplayConfig::default()).limit_to(12);

        scheduler.run_to_end(&mut canvas);

        assert_eq!(scheduler.cursor().position, 12);
        assert_same_state(&replay(&records[..12], ReplayConfig::default()), &canvas);
    }

    #[test]
    fn empty_history_finishes_immediately() {
        let mut canvas = blank_canvas();
        let mut scheduler = ReplayScheduler::new(history(&[]), ReplayConfig::default());
        scheduler.start();

        assert_eq!(scheduler.step(&mut canvas), Step::Finished);
    }
}
