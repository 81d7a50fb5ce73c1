//! Statistics for decode and pipeline runs.

use serde::{Deserialize, Serialize};

use crate::types::DecodePath;

/// Counters collected by a decoder bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Symbols written to the staging sink.
    pub symbols: u64,
    /// Symbols resolved by the fast lookup.
    pub fast_path: u64,
    /// Symbols resolved by the leading-ones fallback.
    pub slow_path: u64,
    /// Raw 4-bit fields.
    pub raw_symbols: u64,
    /// Groups whose lanes reached Done (including faulted ones).
    pub groups_completed: u64,
    /// Groups truncated by an invalid symbol.
    pub codec_faults: u64,
    /// Metadata requests that lost arbitration.
    pub meta_conflicts: u64,
    /// Byte cache requests that lost arbitration.
    pub stream_conflicts: u64,
    /// Ticks with a task in flight.
    pub busy_ticks: u64,
    /// Tasks completed.
    pub tasks: u64,
}

impl DecodeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one decoded symbol.
    pub fn record_symbol(&mut self, path: DecodePath) {
        self.symbols += 1;
        match path {
            DecodePath::Fast => self.fast_path += 1,
            DecodePath::Slow => self.slow_path += 1,
            DecodePath::Raw => self.raw_symbols += 1,
        }
    }

    /// Fraction of Rice-coded symbols served by the fast path.
    pub fn fast_path_ratio(&self) -> f64 {
        let coded = self.fast_path + self.slow_path;
        if coded == 0 {
            return 0.0;
        }
        self.fast_path as f64 / coded as f64
    }

    /// Average symbols per busy tick.
    pub fn symbols_per_tick(&self) -> f64 {
        if self.busy_ticks == 0 {
            return 0.0;
        }
        self.symbols as f64 / self.busy_ticks as f64
    }

    /// Merge stats from another bank or run.
    pub fn merge(&mut self, other: &DecodeStats) {
        self.symbols += other.symbols;
        self.fast_path += other.fast_path;
        self.slow_path += other.slow_path;
        self.raw_symbols += other.raw_symbols;
        self.groups_completed += other.groups_completed;
        self.codec_faults += other.codec_faults;
        self.meta_conflicts += other.meta_conflicts;
        self.stream_conflicts += other.stream_conflicts;
        self.busy_ticks += other.busy_ticks;
        self.tasks += other.tasks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_symbol() {
        let mut stats = DecodeStats::new();
        stats.record_symbol(DecodePath::Fast);
        stats.record_symbol(DecodePath::Fast);
        stats.record_symbol(DecodePath::Fast);
        stats.record_symbol(DecodePath::Slow);
        stats.record_symbol(DecodePath::Raw);

        assert_eq!(stats.symbols, 5);
        assert_eq!(stats.raw_symbols, 1);
        assert!((stats.fast_path_ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_empty_ratios() {
        let stats = DecodeStats::default();
        assert_eq!(stats.fast_path_ratio(), 0.0);
        assert_eq!(stats.symbols_per_tick(), 0.0);
    }

    #[test]
    fn test_merge() {
        let mut a = DecodeStats {
            symbols: 10,
            busy_ticks: 5,
            tasks: 1,
            ..Default::default()
        };
        let b = DecodeStats {
            symbols: 6,
            busy_ticks: 3,
            codec_faults: 1,
            tasks: 1,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.symbols, 16);
        assert_eq!(a.busy_ticks, 8);
        assert_eq!(a.codec_faults, 1);
        assert_eq!(a.tasks, 2);
        assert!((a.symbols_per_tick() - 2.0).abs() < 1e-9);
    }
}
