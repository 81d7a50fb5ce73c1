//! Seams between the decoder, the staging memories and the compute array.
//!
//! ```text
//! DecoderBank ──DecodeSink──▶ StagingBuffers ──loaders──▶ ComputeArray
//! ```

use crate::types::TileMeta;

/// Receives the decoder bank's writes.
///
/// Writes are addressed by lane and wave index, the same coordinates the
/// bank stripes groups by: lane `l`'s wave `w` of a task with base `b` is
/// group `b + w * lanes + l`.
pub trait DecodeSink {
    /// One decoded weight at `offset` within its group.
    fn write_weight(&mut self, lane: usize, wave: u32, offset: usize, weight: u8);

    /// The zero point latched for a group.
    fn write_zero_point(&mut self, lane: usize, wave: u32, zero_point: u8);
}

/// The weight-stationary compute array fed by the loaders.
///
/// Per-cell arithmetic lives behind this trait; the pipeline only drives the
/// load interface.
pub trait ComputeArray {
    /// Per-column zero points and scales for the tile about to load.
    fn load_meta(&mut self, meta: &TileMeta);

    /// Load-enable pulse carrying one full row of weights.
    fn load_row(&mut self, row: usize, weights: &[u8]);

    /// All rows of `tile` have been loaded.
    fn tile_complete(&mut self, _tile: u32) {}
}

/// Discards all decoder writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DecodeSink for NullSink {
    fn write_weight(&mut self, _lane: usize, _wave: u32, _offset: usize, _weight: u8) {}

    fn write_zero_point(&mut self, _lane: usize, _wave: u32, _zero_point: u8) {}
}

impl<S: DecodeSink + ?Sized> DecodeSink for &mut S {
    fn write_weight(&mut self, lane: usize, wave: u32, offset: usize, weight: u8) {
        (**self).write_weight(lane, wave, offset, weight);
    }

    fn write_zero_point(&mut self, lane: usize, wave: u32, zero_point: u8) {
        (**self).write_zero_point(lane, wave, zero_point);
    }
}
