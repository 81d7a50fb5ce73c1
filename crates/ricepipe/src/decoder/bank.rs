//! P-lane decoder bank with shared metadata table and byte cache.
//!
//! ## Tick order
//!
//! 1. Collect lane-tagged responses due this tick from both memories.
//! 2. Arbitrate each memory: one grant per tick, losers keep requesting.
//! 3. Dispatch: idle lanes take their first group; finished lanes are
//!    acknowledged and, if their share is not exhausted, handed the next
//!    group in the same tick.
//! 4. Step every lane and forward its writes to the [`DecodeSink`].
//! 5. Advance both memories and check for task completion.
//!
//! Groups are striped across lanes: lane `l`'s `w`-th group of task
//! `{base, count}` is `base + w * P + l`.

use smallvec::SmallVec;
use tracing::{debug, warn};

use ricepipe_core::{
    DecodeSink, DecodeStats, DecodeTask, DecoderConfig, Error, MetaRecord, Result,
    RoundRobinArbiter, SyncMemory, WEIGHT_LEVELS,
};
use ricepipe_rice::{StreamImage, SymbolCodec};

use super::cache::ByteCache;
use super::lane::{GroupDecoder, LaneFault, LaneInputs, LaneStart};

/// Inline capacity for per-lane scratch vectors.
const INLINE_LANES: usize = 16;

/// Progress of one lane through its share of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LaneProgress {
    share: u32,
    issued: u32,
    completed: u32,
}

#[derive(Debug, Clone)]
struct TaskProgress {
    task: DecodeTask,
    lanes: Vec<LaneProgress>,
}

impl TaskProgress {
    fn is_complete(&self) -> bool {
        self.lanes.iter().all(|p| p.completed == p.share)
    }
}

/// The parallel decoder bank.
#[derive(Debug, Clone)]
pub struct DecoderBank {
    config: DecoderConfig,
    codec: SymbolCodec,
    lanes: Vec<GroupDecoder>,
    meta: SyncMemory<MetaRecord>,
    cache: ByteCache,
    meta_arbiter: RoundRobinArbiter,
    cache_arbiter: RoundRobinArbiter,
    task: Option<TaskProgress>,
    finished: bool,
    faults: Vec<LaneFault>,
    stats: DecodeStats,
}

impl DecoderBank {
    /// Create a bank; the configuration is validated first.
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        let lanes = (0..config.lanes)
            .map(|lane| GroupDecoder::new(lane, &config))
            .collect();

        Ok(Self {
            codec: SymbolCodec::new(config.max_quotient),
            lanes,
            meta: SyncMemory::new("meta table", config.meta_depth, config.meta_latency),
            cache: ByteCache::new(config.cache_bytes, config.chunk_bytes, config.cache_latency),
            meta_arbiter: RoundRobinArbiter::new(config.lanes),
            cache_arbiter: RoundRobinArbiter::new(config.lanes),
            task: None,
            finished: false,
            faults: Vec::new(),
            stats: DecodeStats::new(),
            config,
        })
    }

    /// Bank configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// The lanes, for inspection.
    pub fn lanes(&self) -> &[GroupDecoder] {
        &self.lanes
    }

    /// Bulk-load one stream byte.
    pub fn load_stream_byte(&mut self, addr: usize, byte: u8) -> Result<()> {
        self.cache.load_byte(addr, byte)
    }

    /// Bulk-load a run of stream bytes at `base`.
    pub fn load_stream(&mut self, base: usize, bytes: &[u8]) -> Result<()> {
        self.cache.load(base, bytes)
    }

    /// Bulk-load the metadata record of `group`.
    pub fn load_metadata(&mut self, group: u32, record: MetaRecord) -> Result<()> {
        if record.zero_point >= WEIGHT_LEVELS {
            return Err(Error::value_out_of_range(
                "zero point",
                record.zero_point as u64,
                (WEIGHT_LEVELS - 1) as u64,
            ));
        }
        self.meta.write(group as usize, record)
    }

    /// Bulk-load an encoded stream: bytes at address 0, records from group 0.
    pub fn load_image(&mut self, image: &StreamImage) -> Result<()> {
        self.load_stream(0, &image.bytes)?;
        for (group, record) in image.records.iter().enumerate() {
            self.load_metadata(group as u32, *record)?;
        }
        Ok(())
    }

    /// Begin decoding `task`.
    ///
    /// Fails if a task is still in flight or the group range runs past the
    /// metadata table.
    pub fn start_task(&mut self, task: DecodeTask) -> Result<()> {
        if self.task.is_some() {
            return Err(Error::invalid_state("idle bank", "task in flight"));
        }
        let end = task.base as u64 + task.count as u64;
        if end > self.meta.depth() as u64 {
            return Err(Error::out_of_range(
                self.meta.name(),
                end.saturating_sub(1) as usize,
                self.meta.depth(),
            ));
        }

        let lanes = self
            .lane_shares(&task)
            .into_iter()
            .map(|share| LaneProgress {
                share,
                ..Default::default()
            })
            .collect();
        debug!("Starting decode task: groups {}..{}", task.base, end);

        self.task = Some(TaskProgress { task, lanes });
        self.finished = false;
        Ok(())
    }

    /// Abandon any task in flight and return every lane to Idle.
    ///
    /// Loaded stream bytes, metadata, statistics and recorded faults are
    /// kept; undelivered memory reads are dropped.
    pub fn reset(&mut self) {
        if let Some(progress) = self.task.take() {
            debug!(
                "Abandoning decode task: groups {}..{}",
                progress.task.base,
                progress.task.base + progress.task.count
            );
        }
        for lane in &mut self.lanes {
            lane.reset();
        }
        self.meta.cancel_reads();
        self.cache.cancel_reads();
        self.meta_arbiter.reset();
        self.cache_arbiter.reset();
        self.finished = false;
    }

    /// Groups each lane decodes for `task`.
    pub fn lane_shares(&self, task: &DecodeTask) -> Vec<u32> {
        (0..self.lanes.len())
            .map(|lane| task.share(lane, self.lanes.len()))
            .collect()
    }

    /// Whether the last started task has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether a task is in flight.
    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    /// Groups truncated by codec errors, oldest first.
    pub fn lane_faults(&self) -> &[LaneFault] {
        &self.faults
    }

    /// Decode statistics.
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Advance one tick, writing decoded output into `sink`.
    pub fn tick<S: DecodeSink + ?Sized>(&mut self, sink: &mut S) {
        let width = self.lanes.len();
        let mut inputs: SmallVec<[LaneInputs; INLINE_LANES]> =
            SmallVec::from_elem(LaneInputs::default(), width);

        // 1. responses
        while let Some((lane, record)) = self.meta.poll() {
            inputs[lane].meta_data = Some(record);
        }
        while let Some((lane, word)) = self.cache.poll() {
            inputs[lane].stream_data = Some(word);
        }

        // 2. arbitration
        self.arbitrate_meta(&mut inputs);
        self.arbitrate_cache(&mut inputs);

        // 3. dispatch
        if let Some(progress) = self.task.as_mut() {
            self.stats.busy_ticks += 1;
            let task = progress.task;
            let lanes = self.lanes.iter().zip(progress.lanes.iter_mut());
            for (lane, (decoder, p)) in lanes.enumerate() {
                let next = LaneStart {
                    group: task.group_for(lane, p.issued, width),
                    wave: p.issued,
                };
                if decoder.is_finished() {
                    inputs[lane].ack = true;
                    p.completed += 1;
                    self.stats.groups_completed += 1;
                    if p.issued < p.share {
                        inputs[lane].start = Some(next);
                        p.issued += 1;
                    }
                } else if decoder.is_idle() && p.issued < p.share {
                    inputs[lane].start = Some(next);
                    p.issued += 1;
                }
            }
        }

        // 4. lanes
        for (lane, (decoder, input)) in self.lanes.iter_mut().zip(inputs.iter()).enumerate() {
            let out = decoder.step(input, &self.codec);
            if let Some((wave, zero_point)) = out.zero_point {
                sink.write_zero_point(lane, wave, zero_point);
            }
            if let Some(write) = out.weight {
                sink.write_weight(lane, write.wave, write.offset, write.weight);
                self.stats.record_symbol(write.path);
            }
            if out.fault {
                self.stats.codec_faults += 1;
                if let Some(fault) = decoder.fault() {
                    self.faults.push(fault.clone());
                }
            }
        }

        // 5. memories and completion
        self.meta.tick();
        self.cache.tick();

        if self.task.as_ref().is_some_and(TaskProgress::is_complete) {
            if let Some(done) = self.task.take() {
                debug!(
                    "Decode task complete: groups {}..{}",
                    done.task.base,
                    done.task.base + done.task.count
                );
            }
            self.stats.tasks += 1;
            self.finished = true;
        }
    }

    fn arbitrate_meta(&mut self, inputs: &mut [LaneInputs]) {
        let requests: SmallVec<[Option<u32>; INLINE_LANES]> =
            self.lanes.iter().map(GroupDecoder::meta_request).collect();
        let wants: SmallVec<[bool; INLINE_LANES]> = requests.iter().map(Option::is_some).collect();

        if let Some(winner) = self.meta_arbiter.arbitrate(&wants) {
            self.stats.meta_conflicts += wants.iter().filter(|&&w| w).count() as u64 - 1;
            let group = requests[winner].unwrap_or_default();
            match self.meta.issue(group as usize, winner) {
                Ok(()) => inputs[winner].meta_grant = true,
                Err(error) => warn!(lane = winner, group, %error, "metadata read rejected"),
            }
        }
    }

    fn arbitrate_cache(&mut self, inputs: &mut [LaneInputs]) {
        let requests: SmallVec<[Option<u32>; INLINE_LANES]> =
            self.lanes.iter().map(GroupDecoder::stream_request).collect();
        let wants: SmallVec<[bool; INLINE_LANES]> = requests.iter().map(Option::is_some).collect();

        if let Some(winner) = self.cache_arbiter.arbitrate(&wants) {
            self.stats.stream_conflicts += wants.iter().filter(|&&w| w).count() as u64 - 1;
            self.cache.issue(requests[winner].unwrap_or_default(), winner);
            inputs[winner].stream_grant = true;
        }
    }
}
