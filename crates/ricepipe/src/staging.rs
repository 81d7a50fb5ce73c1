//! Double-buffered staging between the decoder bank and the loaders.
//!
//! Each staging memory has two full-capacity banks. The decoder writes only
//! the produce bank and the loaders read only the consume bank; one shared
//! [`BankRole`] decides which physical bank is which, so the two sides can
//! never touch the same bank.
//!
//! Weight layout per bank: one column per lane, addressed by
//! `wave * group_size + offset`. A tile-row `r` is therefore spread over
//! `N / P` addresses `w * N + r`, each returning P adjacent columns
//! `w * P .. (w + 1) * P`.

use smallvec::SmallVec;
use tracing::warn;

use ricepipe_core::{BankRole, DecodeSink, LatencyPipe, PipelineConfig, StagingBank};

/// One P-wide staging read.
pub type LaneWord = SmallVec<[u8; 16]>;

/// Lane-column weight staging, two banks.
#[derive(Debug, Clone)]
pub struct WeightStaging {
    lanes: usize,
    group_size: usize,
    depth: usize,
    /// `[bank][lane][addr]`
    banks: [Vec<Vec<u8>>; 2],
    reads: LatencyPipe<LaneWord>,
}

impl WeightStaging {
    /// Staging for `lanes` columns of `waves` groups each.
    pub fn new(lanes: usize, group_size: usize, waves: usize, latency: u32) -> Self {
        let depth = waves * group_size;
        let bank = || vec![vec![0u8; depth]; lanes];
        Self {
            lanes,
            group_size,
            depth,
            banks: [bank(), bank()],
            reads: LatencyPipe::new(latency),
        }
    }

    /// Words per lane column.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Store one weight.
    pub fn write(&mut self, bank: StagingBank, lane: usize, wave: u32, offset: usize, weight: u8) {
        let addr = wave as usize * self.group_size + offset;
        match self.banks[bank.index()]
            .get_mut(lane)
            .and_then(|column| column.get_mut(addr))
        {
            Some(cell) => *cell = weight,
            None => warn!(lane, wave, offset, "weight write outside staging, dropped"),
        }
    }

    /// Read one cell immediately.
    pub fn get(&self, bank: StagingBank, lane: usize, addr: usize) -> Option<u8> {
        self.banks[bank.index()].get(lane)?.get(addr).copied()
    }

    /// Issue a P-wide read of `addr` across all lane columns.
    pub fn issue(&mut self, bank: StagingBank, addr: usize) {
        let word = self.banks[bank.index()]
            .iter()
            .map(|column| column.get(addr).copied().unwrap_or(0))
            .collect();
        self.reads.push(word);
    }

    /// Take the read due this tick.
    pub fn poll(&mut self) -> Option<LaneWord> {
        self.reads.pop()
    }

    /// Number of lane columns.
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    fn tick(&mut self) {
        self.reads.tick();
    }
}

/// Per-column zero-point staging, two banks.
#[derive(Debug, Clone)]
pub struct MetaStaging {
    banks: [Vec<u8>; 2],
    reads: LatencyPipe<u8>,
}

impl MetaStaging {
    /// Staging for `entries` zero points per bank.
    pub fn new(entries: usize, latency: u32) -> Self {
        Self {
            banks: [vec![0; entries], vec![0; entries]],
            reads: LatencyPipe::new(latency),
        }
    }

    /// Store one zero point.
    pub fn write(&mut self, bank: StagingBank, index: usize, zero_point: u8) {
        match self.banks[bank.index()].get_mut(index) {
            Some(cell) => *cell = zero_point,
            None => warn!(index, "zero point write outside staging, dropped"),
        }
    }

    /// Read one entry immediately.
    pub fn get(&self, bank: StagingBank, index: usize) -> Option<u8> {
        self.banks[bank.index()].get(index).copied()
    }

    /// Issue a serial read of `index`.
    pub fn issue(&mut self, bank: StagingBank, index: usize) {
        let value = self.get(bank, index).unwrap_or(0);
        self.reads.push(value);
    }

    /// Take the read due this tick.
    pub fn poll(&mut self) -> Option<u8> {
        self.reads.pop()
    }

    fn tick(&mut self) {
        self.reads.tick();
    }
}

/// Both staging memories under one role flag.
#[derive(Debug, Clone)]
pub struct StagingBuffers {
    role: BankRole,
    lanes: usize,
    weights: WeightStaging,
    meta: MetaStaging,
}

impl StagingBuffers {
    /// Staging sized for one tile of `config`.
    pub fn new(config: &PipelineConfig) -> Self {
        let lanes = config.decoder.lanes;
        Self {
            role: BankRole::new(),
            lanes,
            weights: WeightStaging::new(
                lanes,
                config.decoder.group_size,
                config.waves(),
                config.staging_latency,
            ),
            meta: MetaStaging::new(config.array_dim, config.staging_latency),
        }
    }

    /// Current role assignment.
    pub fn role(&self) -> BankRole {
        self.role
    }

    /// Swap produce and consume banks of both memories.
    pub fn flip(&mut self) {
        self.role.flip();
    }

    /// Weight staging.
    pub fn weights(&self) -> &WeightStaging {
        &self.weights
    }

    /// Zero-point staging.
    pub fn meta(&self) -> &MetaStaging {
        &self.meta
    }

    /// Issue a weight read against the consume bank.
    pub fn issue_weight_read(&mut self, addr: usize) {
        self.weights.issue(self.role.consume(), addr);
    }

    /// Weight read due this tick.
    pub fn poll_weights(&mut self) -> Option<LaneWord> {
        self.weights.poll()
    }

    /// Issue a zero-point read against the consume bank.
    pub fn issue_meta_read(&mut self, index: usize) {
        self.meta.issue(self.role.consume(), index);
    }

    /// Zero-point read due this tick.
    pub fn poll_meta(&mut self) -> Option<u8> {
        self.meta.poll()
    }

    /// Advance both read ports.
    pub fn tick(&mut self) {
        self.weights.tick();
        self.meta.tick();
    }

    /// Restore the initial role and drop undelivered reads.
    pub fn reset(&mut self) {
        self.role = BankRole::new();
        self.weights.reads.clear();
        self.meta.reads.clear();
    }
}

impl DecodeSink for StagingBuffers {
    fn write_weight(&mut self, lane: usize, wave: u32, offset: usize, weight: u8) {
        self.weights
            .write(self.role.produce(), lane, wave, offset, weight);
    }

    fn write_zero_point(&mut self, lane: usize, wave: u32, zero_point: u8) {
        let index = wave as usize * self.lanes + lane;
        self.meta.write(self.role.produce(), index, zero_point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staging() -> StagingBuffers {
        StagingBuffers::new(&PipelineConfig::with_dims(8, 4))
    }

    #[test]
    fn test_writes_land_in_produce_bank() {
        let mut s = staging();
        s.write_weight(1, 1, 3, 9);
        s.write_zero_point(1, 1, 6);

        let produce = s.role().produce();
        assert_eq!(s.weights().get(produce, 1, 8 + 3), Some(9));
        assert_eq!(s.weights().get(produce.other(), 1, 8 + 3), Some(0));
        // Column 1 * 4 + 1.
        assert_eq!(s.meta().get(produce, 5), Some(6));
    }

    #[test]
    fn test_reads_target_consume_bank() {
        let mut s = staging();
        s.write_weight(2, 0, 0, 4);
        s.issue_weight_read(0);
        s.tick();
        assert_eq!(s.poll_weights().unwrap().as_slice(), &[0, 0, 0, 0]);

        s.flip();
        s.issue_weight_read(0);
        s.tick();
        assert_eq!(s.poll_weights().unwrap().as_slice(), &[0, 0, 4, 0]);
    }

    #[test]
    fn test_read_latency() {
        let mut s = staging();
        s.flip();
        s.issue_meta_read(0);
        assert_eq!(s.poll_meta(), None);
        s.tick();
        assert_eq!(s.poll_meta(), Some(0));
    }

    #[test]
    fn test_flip_twice_restores() {
        let mut s = staging();
        let original = s.role();
        s.flip();
        assert_ne!(s.role(), original);
        s.flip();
        assert_eq!(s.role(), original);
    }

    #[test]
    fn test_out_of_range_write_dropped() {
        let mut s = staging();
        s.write_weight(0, 2, 0, 1);
        s.write_weight(9, 0, 0, 1);
        s.write_zero_point(0, 2, 1);
        let produce = s.role().produce();
        assert_eq!(s.weights().get(produce, 0, 16), None);
    }

    #[test]
    fn test_reset_restores_role_and_drops_reads() {
        let mut s = staging();
        s.flip();
        s.issue_weight_read(0);
        s.issue_meta_read(0);
        s.reset();
        s.tick();
        assert_eq!(s.role(), BankRole::new());
        assert!(s.poll_weights().is_none());
        assert!(s.poll_meta().is_none());
    }
}
