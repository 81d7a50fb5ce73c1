//! # Ricepipe Core
//!
//! Core types, clocked primitives and error handling for the ricepipe
//! Golomb-Rice weight decoder.
//!
//! The decoder is modelled as synchronous hardware: each component advances
//! one tick at a time and sees other components' outputs only from the
//! previous tick. This crate holds the pieces every model shares:
//!
//! - [`LatencyPipe`] and [`SyncMemory`] - fixed-latency request/response
//! - [`RoundRobinArbiter`] - single-winner fair arbitration
//! - [`DecodeSink`] and [`ComputeArray`] - seams between pipeline stages
//! - [`DecoderConfig`] / [`PipelineConfig`] - validated configuration
//! - [`Error`] - one error type for the whole workspace

pub mod arbiter;
pub mod clocked;
pub mod config;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use arbiter::RoundRobinArbiter;
pub use clocked::{LatencyPipe, SyncMemory};
pub use config::{
    DecodeTiming, DecoderConfig, PipelineConfig, ACCUMULATOR_BITS, DEFAULT_MAX_QUOTIENT,
    FAST_MAX_QUOTIENT,
};
pub use error::{Error, Result};
pub use stats::DecodeStats;
pub use traits::{ComputeArray, DecodeSink, NullSink};
pub use types::{
    BankRole, CodingMode, DecodePath, DecodeTask, MetaRecord, RiceK, StagingBank, TileMeta,
    MODE_FLAG_BITS, RAW_FIELD_BITS, WEIGHT_LEVELS,
};
