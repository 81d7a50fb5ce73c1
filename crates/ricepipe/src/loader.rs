//! Burst loaders draining the consume bank into the compute array.
//!
//! Both loaders keep several staging reads in flight: a read is issued
//! whenever the in-flight counter is below its bound, the counter goes up on
//! issue and down on response. Responses arrive in issue order, so the
//! response count alone tells where each one belongs.

use ricepipe_core::{ComputeArray, Error, PipelineConfig, Result, TileMeta};
use tracing::trace;

use crate::staging::StagingBuffers;

/// Per-column scale values, loaded once through the bulk-load port.
///
/// Entry `i` is paired with the zero point of group `i` of a tile, which is
/// array column `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTable {
    scales: Vec<f32>,
}

impl ScaleTable {
    /// A table of `dim` zero scales.
    pub fn new(dim: usize) -> Self {
        Self {
            scales: vec![0.0; dim],
        }
    }

    /// Bulk-load the scale of column `column`.
    pub fn load(&mut self, column: usize, scale: f32) -> Result<()> {
        let size = self.scales.len();
        let cell = self
            .scales
            .get_mut(column)
            .ok_or_else(|| Error::out_of_range("scale table", column, size))?;
        *cell = scale;
        Ok(())
    }

    /// Scale of column `column`, zero past the end.
    pub fn get(&self, column: usize) -> f32 {
        self.scales.get(column).copied().unwrap_or(0.0)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

/// Reassembles tile rows from P-wide staging reads.
#[derive(Debug, Clone)]
pub struct WeightLoader {
    dim: usize,
    lanes: usize,
    waves: usize,
    max_inflight: u32,
    in_flight: u32,
    issued: usize,
    received: usize,
    row: Vec<u8>,
    active: bool,
    done: bool,
}

impl WeightLoader {
    /// Loader for one tile of `config`.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            dim: config.array_dim,
            lanes: config.decoder.lanes,
            waves: config.waves(),
            max_inflight: config.loader_inflight,
            in_flight: 0,
            issued: 0,
            received: 0,
            row: vec![0; config.array_dim],
            active: false,
            done: false,
        }
    }

    /// Begin loading a tile from the consume bank.
    pub fn start(&mut self) {
        self.issued = 0;
        self.received = 0;
        self.active = true;
        self.done = false;
    }

    /// Stop loading and forget all progress.
    pub fn reset(&mut self) {
        self.in_flight = 0;
        self.issued = 0;
        self.received = 0;
        self.active = false;
        self.done = false;
    }

    /// Whether every row of the last started tile has been loaded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Whether a tile is being loaded.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Reads issued but not answered.
    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    /// Rows pulsed into the array so far.
    pub fn rows_loaded(&self) -> usize {
        self.received / self.waves.max(1)
    }

    /// Advance one tick.
    pub fn tick<A: ComputeArray + ?Sized>(&mut self, staging: &mut StagingBuffers, array: &mut A) {
        if let Some(word) = staging.poll_weights() {
            self.in_flight = self.in_flight.saturating_sub(1);
            let wave = self.received % self.waves;
            let row = self.received / self.waves;
            let columns = wave * self.lanes..(wave + 1) * self.lanes;
            self.row[columns].copy_from_slice(&word[..self.lanes]);
            self.received += 1;

            if wave + 1 == self.waves {
                array.load_row(row, &self.row);
                if row + 1 == self.dim {
                    trace!("Loaded {} rows", self.dim);
                    self.active = false;
                    self.done = true;
                }
            }
        }

        let total = self.dim * self.waves;
        if self.active && self.issued < total && self.in_flight < self.max_inflight {
            let row = self.issued / self.waves;
            let wave = self.issued % self.waves;
            staging.issue_weight_read(wave * self.dim + row);
            self.in_flight += 1;
            self.issued += 1;
        }
    }
}

/// Serially gathers a tile's zero points and pairs them with scales.
#[derive(Debug, Clone)]
pub struct MetadataLoader {
    dim: usize,
    max_inflight: u32,
    in_flight: u32,
    issued: usize,
    received: usize,
    meta: TileMeta,
    active: bool,
    done: bool,
}

impl MetadataLoader {
    /// Loader for one tile of `config`.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            dim: config.array_dim,
            max_inflight: config.loader_inflight,
            in_flight: 0,
            issued: 0,
            received: 0,
            meta: TileMeta::zeroed(config.array_dim),
            active: false,
            done: false,
        }
    }

    /// Begin gathering metadata from the consume bank.
    pub fn start(&mut self) {
        self.issued = 0;
        self.received = 0;
        self.active = true;
        self.done = false;
    }

    /// Stop gathering and forget all progress.
    pub fn reset(&mut self) {
        self.in_flight = 0;
        self.issued = 0;
        self.received = 0;
        self.active = false;
        self.done = false;
    }

    /// Whether all N entries of the last started tile have arrived.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Assembled metadata; complete once [`is_done`](Self::is_done).
    pub fn meta(&self) -> &TileMeta {
        &self.meta
    }

    /// Advance one tick.
    pub fn tick(&mut self, staging: &mut StagingBuffers, scales: &ScaleTable) {
        if let Some(zero_point) = staging.poll_meta() {
            self.in_flight = self.in_flight.saturating_sub(1);
            let index = self.received;
            if index < self.dim {
                self.meta.zero_points[index] = zero_point;
                self.meta.scales[index] = scales.get(index);
            }
            self.received += 1;
            if self.received == self.dim {
                self.active = false;
                self.done = true;
            }
        }

        if self.active && self.issued < self.dim && self.in_flight < self.max_inflight {
            staging.issue_meta_read(self.issued);
            self.in_flight += 1;
            self.issued += 1;
        }
    }
}
