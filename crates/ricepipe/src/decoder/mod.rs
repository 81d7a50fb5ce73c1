//! Parallel Golomb-Rice group decoding.
//!
//! [`DecoderBank`] owns P [`GroupDecoder`] lanes and the two memories they
//! share: the metadata table and the [`ByteCache`]. Each memory grants one
//! lane per tick through a round-robin arbiter.

mod bank;
mod cache;
mod lane;

pub use bank::DecoderBank;
pub use cache::ByteCache;
pub use lane::{
    GroupDecoder, LaneFault, LaneInputs, LaneOutputs, LaneStart, LaneState, WeightWrite,
};
