//! Top-level double-buffered pipeline controller.
//!
//! ```text
//!  Idle ─start─▶ Prefill ─▶ Flip ─▶ LoadMeta ─▶ Run ─┬─▶ Flip   (more tiles)
//!   ▲                                                 └─▶ Done   (last tile)
//!   └──────────────────── start low ───────────────────────┘
//! ```
//!
//! Decoding stays one tile ahead of compute: while tile `t` streams out of
//! the consume bank, tile `t + 1` is decoded into the produce bank. The last
//! tile has no successor to wait for and instead waits out a fixed drain
//! countdown.
//!
//! Each tick the controller first acts on the status its components
//! registered on the previous tick, then advances the decoder bank, both
//! loaders and the staging read ports.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ricepipe_core::{
    ComputeArray, DecodeStats, DecodeTask, Error, MetaRecord, PipelineConfig, Result,
};
use ricepipe_rice::StreamImage;

use crate::decoder::{DecoderBank, LaneFault};
use crate::loader::{MetadataLoader, ScaleTable, WeightLoader};
use crate::staging::StagingBuffers;

/// Controller state, exposed as a debug code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccelState {
    Idle,
    Prefill,
    Flip,
    LoadMeta,
    Run,
    Done,
}

impl AccelState {
    /// Debug code driven on the state output.
    pub const fn code(self) -> u8 {
        match self {
            AccelState::Idle => 0,
            AccelState::Prefill => 1,
            AccelState::Flip => 2,
            AccelState::LoadMeta => 3,
            AccelState::Run => 4,
            AccelState::Done => 5,
        }
    }

    /// Get state name as string.
    pub const fn name(self) -> &'static str {
        match self {
            AccelState::Idle => "idle",
            AccelState::Prefill => "prefill",
            AccelState::Flip => "flip",
            AccelState::LoadMeta => "load_meta",
            AccelState::Run => "run",
            AccelState::Done => "done",
        }
    }
}

impl std::fmt::Display for AccelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of [`Accelerator::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Ticks from start to done.
    pub ticks: u64,
    /// Tiles computed.
    pub tiles: u32,
    /// Bank statistics accumulated over the run.
    pub stats: DecodeStats,
    /// Groups truncated by codec errors during the run.
    pub faults: Vec<LaneFault>,
}

/// The full pipeline: decoder bank, staging, loaders and compute array.
#[derive(Debug)]
pub struct Accelerator<A: ComputeArray> {
    config: PipelineConfig,
    bank: DecoderBank,
    staging: StagingBuffers,
    weight_loader: WeightLoader,
    meta_loader: MetadataLoader,
    scales: ScaleTable,
    array: A,

    state: AccelState,
    start_level: bool,
    start_pulse: bool,
    total_tiles: u32,
    /// Tile the consume bank holds; also the number of flips so far minus one.
    tile: u32,
    flips: u32,
    drain: u32,
    ticks: u64,
}

impl<A: ComputeArray> Accelerator<A> {
    /// Build a pipeline around `array`; the configuration is validated first.
    pub fn new(config: PipelineConfig, array: A) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bank: DecoderBank::new(config.decoder.clone())?,
            staging: StagingBuffers::new(&config),
            weight_loader: WeightLoader::new(&config),
            meta_loader: MetadataLoader::new(&config),
            scales: ScaleTable::new(config.array_dim),
            array,
            state: AccelState::Idle,
            start_level: false,
            start_pulse: false,
            total_tiles: 0,
            tile: 0,
            flips: 0,
            drain: 0,
            ticks: 0,
            config,
        })
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Bulk-load one stream byte.
    pub fn load_stream_byte(&mut self, addr: usize, byte: u8) -> Result<()> {
        self.bank.load_stream_byte(addr, byte)
    }

    /// Bulk-load the metadata record of `group`.
    pub fn load_metadata(&mut self, group: u32, record: MetaRecord) -> Result<()> {
        self.bank.load_metadata(group, record)
    }

    /// Bulk-load scale entry `index` (0..N).
    ///
    /// The metadata loader pairs entry `index` with array column `index`.
    pub fn load_scale(&mut self, index: usize, scale: f32) -> Result<()> {
        self.scales.load(index, scale)
    }

    /// Bulk-load an encoded stream and its metadata records.
    pub fn load_image(&mut self, image: &StreamImage) -> Result<()> {
        self.bank.load_image(image)
    }

    /// Drive the start level. The tile count is taken from
    /// [`set_total_tiles`](Self::set_total_tiles).
    pub fn set_start(&mut self, level: bool) {
        self.start_level = level;
    }

    /// Set the number of tiles the next start processes.
    pub fn set_total_tiles(&mut self, total_tiles: u32) {
        self.total_tiles = total_tiles;
    }

    /// Pulse start for `total_tiles` tiles.
    pub fn start(&mut self, total_tiles: u32) {
        self.total_tiles = total_tiles;
        self.start_pulse = true;
    }

    /// Completion level.
    pub fn done(&self) -> bool {
        self.state == AccelState::Done
    }

    /// Controller state code.
    pub fn debug_state(&self) -> u8 {
        self.state.code()
    }

    /// Controller state.
    pub fn state(&self) -> AccelState {
        self.state
    }

    /// Ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Tile flips since the last start.
    pub fn flips(&self) -> u32 {
        self.flips
    }

    /// The compute array.
    pub fn array(&self) -> &A {
        &self.array
    }

    /// Take back the compute array.
    pub fn into_array(self) -> A {
        self.array
    }

    /// Decoder bank statistics.
    pub fn stats(&self) -> &DecodeStats {
        self.bank.stats()
    }

    /// The decoder bank.
    pub fn bank(&self) -> &DecoderBank {
        &self.bank
    }

    /// The staging buffers.
    pub fn staging(&self) -> &StagingBuffers {
        &self.staging
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> Result<()> {
        self.ticks += 1;
        self.step_controller()?;

        self.bank.tick(&mut self.staging);
        self.meta_loader.tick(&mut self.staging, &self.scales);
        self.weight_loader.tick(&mut self.staging, &mut self.array);
        self.staging.tick();
        Ok(())
    }

    /// Abandon any run in flight and return the controller to Idle.
    ///
    /// The decoder bank drops its task, loaders and read ports are cleared
    /// and the role flag returns to its initial assignment. Loaded streams,
    /// metadata, scales, statistics and the compute array are kept.
    pub fn reset(&mut self) {
        if self.state != AccelState::Idle {
            debug!("Accelerator reset from {}", self.state);
        }
        self.bank.reset();
        self.staging.reset();
        self.weight_loader.reset();
        self.meta_loader.reset();
        self.state = AccelState::Idle;
        self.start_level = false;
        self.start_pulse = false;
        self.tile = 0;
        self.flips = 0;
        self.drain = 0;
    }

    /// Process `total_tiles` tiles, ticking until done.
    ///
    /// Returns [`Error::Stalled`] if the run is not done within `max_ticks`.
    /// A run that fails part way is reset, leaving the controller Idle.
    pub fn run(&mut self, total_tiles: u32, max_ticks: u64) -> Result<RunReport> {
        if self.state == AccelState::Done {
            self.start_level = false;
            self.start_pulse = false;
            self.tick()?;
        }
        if self.state != AccelState::Idle {
            return Err(Error::invalid_state("idle", self.state.name()));
        }

        self.check_capacity(total_tiles)?;

        let before = self.bank.stats().clone();
        let faults_before = self.bank.lane_faults().len();
        let started = self.ticks;
        self.start(total_tiles);

        while !self.done() {
            let elapsed = self.ticks - started;
            if elapsed >= max_ticks {
                let state = self.state.name();
                warn!(ticks = elapsed, state, "Pipeline run stalled, resetting");
                self.reset();
                return Err(Error::Stalled {
                    ticks: elapsed,
                    state,
                });
            }
            if let Err(error) = self.tick() {
                self.reset();
                return Err(error);
            }
        }

        let ticks = self.ticks - started;
        let stats = stats_since(&before, self.bank.stats());
        info!(
            "Pipeline run complete: {} tiles in {} ticks ({} symbols, {} faults)",
            total_tiles, ticks, stats.symbols, stats.codec_faults
        );

        Ok(RunReport {
            ticks,
            tiles: total_tiles,
            stats,
            faults: self.bank.lane_faults()[faults_before..].to_vec(),
        })
    }

    fn step_controller(&mut self) -> Result<()> {
        let last_tile = self.tile + 1 >= self.total_tiles;
        if matches!(self.state, AccelState::LoadMeta | AccelState::Run) && last_tile {
            self.drain = self.drain.saturating_sub(1);
        }

        let next = match self.state {
            AccelState::Idle => {
                if self.start_level || self.start_pulse {
                    self.start_pulse = false;
                    self.check_capacity(self.total_tiles)?;
                    self.tile = 0;
                    self.flips = 0;
                    if self.total_tiles == 0 {
                        AccelState::Done
                    } else {
                        self.bank.start_task(self.tile_task(0))?;
                        AccelState::Prefill
                    }
                } else {
                    AccelState::Idle
                }
            }

            AccelState::Prefill => {
                if self.bank.is_finished() {
                    AccelState::Flip
                } else {
                    AccelState::Prefill
                }
            }

            AccelState::Flip => {
                // Issue the next task before flipping: a rejected task must
                // leave the role as it was.
                let next_tile = self.flips + 1;
                if next_tile < self.total_tiles {
                    self.bank.start_task(self.tile_task(next_tile))?;
                } else {
                    self.drain = self.config.drain_ticks;
                }
                self.staging.flip();
                self.tile = self.flips;
                self.flips += 1;
                debug!(
                    "Flipped staging: tile {} now {:?}, produce {:?}",
                    self.tile,
                    self.staging.role().consume(),
                    self.staging.role().produce()
                );
                self.meta_loader.start();
                AccelState::LoadMeta
            }

            AccelState::LoadMeta => {
                if self.meta_loader.is_done() {
                    self.array.load_meta(self.meta_loader.meta());
                    self.weight_loader.start();
                    AccelState::Run
                } else {
                    AccelState::LoadMeta
                }
            }

            AccelState::Run => {
                let decode_done = if last_tile {
                    self.drain == 0
                } else {
                    self.bank.is_finished()
                };
                if self.weight_loader.is_done() && decode_done {
                    self.array.tile_complete(self.tile);
                    if last_tile {
                        AccelState::Done
                    } else {
                        AccelState::Flip
                    }
                } else {
                    AccelState::Run
                }
            }

            AccelState::Done => {
                if self.start_level || self.start_pulse {
                    AccelState::Done
                } else {
                    AccelState::Idle
                }
            }
        };

        if next != self.state {
            debug!("Accelerator {} -> {}", self.state, next);
            self.state = next;
        }
        Ok(())
    }

    /// Check that `total_tiles` tiles fit in the metadata table.
    fn check_capacity(&self, total_tiles: u32) -> Result<()> {
        let groups = total_tiles as u64 * self.config.array_dim as u64;
        let depth = self.config.decoder.meta_depth;
        if groups > depth as u64 {
            return Err(Error::out_of_range(
                "meta table",
                (groups - 1) as usize,
                depth,
            ));
        }
        Ok(())
    }

    fn tile_task(&self, tile: u32) -> DecodeTask {
        DecodeTask::for_tile(tile, self.config.array_dim)
    }
}

/// Counter deltas between two snapshots of the same bank.
fn stats_since(before: &DecodeStats, now: &DecodeStats) -> DecodeStats {
    DecodeStats {
        symbols: now.symbols - before.symbols,
        fast_path: now.fast_path - before.fast_path,
        slow_path: now.slow_path - before.slow_path,
        raw_symbols: now.raw_symbols - before.raw_symbols,
        groups_completed: now.groups_completed - before.groups_completed,
        codec_faults: now.codec_faults - before.codec_faults,
        meta_conflicts: now.meta_conflicts - before.meta_conflicts,
        stream_conflicts: now.stream_conflicts - before.stream_conflicts,
        busy_ticks: now.busy_ticks - before.busy_ticks,
        tasks: now.tasks - before.tasks,
    }
}
