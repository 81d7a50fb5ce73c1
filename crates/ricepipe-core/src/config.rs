//! Configuration for the decoder bank and the double-buffered pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{RiceK, MODE_FLAG_BITS};

/// Width of a lane's bit accumulator.
pub const ACCUMULATOR_BITS: u32 = 64;

/// Largest quotient the fast lookup path recognizes.
pub const FAST_MAX_QUOTIENT: u32 = 4;

/// Default maximum quotient before a code is rejected.
pub const DEFAULT_MAX_QUOTIENT: u32 = 15;

/// How a lane schedules decode and write-back of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DecodeTiming {
    /// Decode and write back in the same tick.
    #[default]
    SingleCycle,
    /// Decode in one tick, write back in the next.
    Split,
}

/// Configuration for the decoder bank and its lanes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Number of parallel decode lanes (P).
    pub lanes: usize,
    /// Symbols per group.
    pub group_size: usize,
    /// Largest accepted Golomb-Rice quotient.
    pub max_quotient: u32,
    /// Bytes fetched from the byte cache per request.
    pub chunk_bytes: usize,
    /// Metadata table read latency in ticks.
    pub meta_latency: u32,
    /// Byte cache read latency in ticks.
    pub cache_latency: u32,
    /// Byte cache capacity.
    pub cache_bytes: usize,
    /// Metadata table depth (number of groups).
    pub meta_depth: usize,
    /// Decode/write-back scheduling.
    pub timing: DecodeTiming,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            lanes: 8,
            group_size: 64,
            max_quotient: DEFAULT_MAX_QUOTIENT,
            chunk_bytes: 4,
            meta_latency: 1,
            cache_latency: 2,
            cache_bytes: 64 * 1024,
            meta_depth: 4096,
            timing: DecodeTiming::SingleCycle,
        }
    }
}

impl DecoderConfig {
    /// Width in bits of the longest symbol a lane may need to decode.
    pub fn max_symbol_bits(&self) -> u32 {
        self.max_quotient + 1 + RiceK::K2.bits()
    }

    /// Width in bits of one cache chunk.
    pub fn chunk_bits(&self) -> u32 {
        self.chunk_bytes as u32 * 8
    }

    /// Set the lane count.
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes;
        self
    }

    /// Set the group size.
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    /// Set the decode timing variant.
    pub fn with_timing(mut self, timing: DecodeTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Check that the configuration describes a buildable bank.
    pub fn validate(&self) -> Result<()> {
        if self.lanes == 0 {
            return Err(Error::config("lanes must be at least 1"));
        }
        if self.group_size == 0 {
            return Err(Error::config("group_size must be at least 1"));
        }
        if self.max_quotient < FAST_MAX_QUOTIENT {
            return Err(Error::config(format!(
                "max_quotient {} below fast path quotient {}",
                self.max_quotient, FAST_MAX_QUOTIENT
            )));
        }
        if self.chunk_bytes == 0 || self.chunk_bytes > 8 {
            return Err(Error::config(format!(
                "chunk_bytes {} must be in 1..=8",
                self.chunk_bytes
            )));
        }
        // The accumulator is refilled whenever it holds fewer than
        // max_symbol_bits, so one chunk must always fit behind that.
        let worst_fill = self.max_symbol_bits() - 1 + self.chunk_bits();
        if worst_fill > ACCUMULATOR_BITS {
            return Err(Error::config(format!(
                "max_quotient {} with {}-byte chunks needs {} accumulator bits, have {}",
                self.max_quotient, self.chunk_bytes, worst_fill, ACCUMULATOR_BITS
            )));
        }
        if self.chunk_bits() < MODE_FLAG_BITS {
            return Err(Error::config("chunk too narrow for the mode flag"));
        }
        if self.meta_latency == 0 || self.cache_latency == 0 {
            return Err(Error::config("memory latencies must be at least 1 tick"));
        }
        if self.cache_bytes < self.chunk_bytes {
            return Err(Error::config("byte cache smaller than one chunk"));
        }
        if self.meta_depth == 0 {
            return Err(Error::config("meta_depth must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration for the full double-buffered pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Compute array dimension (N). A tile is N groups of N symbols.
    pub array_dim: usize,
    /// Decoder bank configuration.
    pub decoder: DecoderConfig,
    /// Staging memory read latency in ticks.
    pub staging_latency: u32,
    /// Outstanding staging reads a loader may keep in flight.
    pub loader_inflight: u32,
    /// Ticks the last tile waits in place of a decode-completion signal.
    pub drain_ticks: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_dims(64, 8)
    }
}

impl PipelineConfig {
    /// Pipeline for an `array_dim` × `array_dim` array fed by `lanes` lanes.
    pub fn with_dims(array_dim: usize, lanes: usize) -> Self {
        Self {
            array_dim,
            decoder: DecoderConfig::default()
                .with_lanes(lanes)
                .with_group_size(array_dim),
            staging_latency: 1,
            loader_inflight: 2,
            drain_ticks: 16,
        }
    }

    /// Set the decode timing variant.
    pub fn with_timing(mut self, timing: DecodeTiming) -> Self {
        self.decoder.timing = timing;
        self
    }

    /// Set the last-tile drain delay.
    pub fn with_drain_ticks(mut self, drain_ticks: u32) -> Self {
        self.drain_ticks = drain_ticks;
        self
    }

    /// Number of striping waves per tile (N / P).
    pub fn waves(&self) -> usize {
        self.array_dim / self.decoder.lanes
    }

    /// Check that the configuration describes a buildable pipeline.
    pub fn validate(&self) -> Result<()> {
        self.decoder.validate()?;
        if self.array_dim == 0 {
            return Err(Error::config("array_dim must be at least 1"));
        }
        if self.decoder.group_size != self.array_dim {
            return Err(Error::config(format!(
                "group_size {} must equal array_dim {}",
                self.decoder.group_size, self.array_dim
            )));
        }
        if self.array_dim % self.decoder.lanes != 0 {
            return Err(Error::config(format!(
                "array_dim {} not divisible by {} lanes",
                self.array_dim, self.decoder.lanes
            )));
        }
        if self.staging_latency == 0 {
            return Err(Error::config("staging_latency must be at least 1 tick"));
        }
        if self.loader_inflight == 0 {
            return Err(Error::config("loader_inflight must be at least 1"));
        }
        Ok(())
    }
}
