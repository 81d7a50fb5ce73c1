//! # Ricepipe
//!
//! Tick-level model of a Golomb-Rice weight decompression pipeline.
//!
//! 4-bit quantized weights are stored as byte-aligned groups of Rice codes
//! (k=1 or k=2) or raw 4-bit fields. A bank of P decode lanes turns groups
//! back into weights, double-buffered staging memories reshape the lanes'
//! output into rows, and a controller keeps decoding one tile ahead of the
//! compute array.
//!
//! ```text
//!  byte cache ─┐                     ┌─ bank A ─┐
//!              ├─▶ DecoderBank (P) ──┤          ├─▶ loaders ─▶ ComputeArray
//!  meta table ─┘                     └─ bank B ─┘
//!                     produce ◀── BankRole ──▶ consume
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use ricepipe::{Accelerator, ChecksumArray};
//! use ricepipe_core::PipelineConfig;
//! use ricepipe_rice::{GroupEncoder, StreamBuilder};
//!
//! let config = PipelineConfig::with_dims(8, 4);
//! let mut builder = StreamBuilder::new(GroupEncoder::from_config(&config.decoder));
//! for _ in 0..8 {
//!     builder.push_weights(&[7; 8], 8)?;
//! }
//!
//! let mut accel = Accelerator::new(config, ChecksumArray::new(8))?;
//! accel.load_image(&builder.finish())?;
//! let report = accel.run(1, 10_000)?;
//!
//! assert_eq!(report.stats.symbols, 64);
//! assert_eq!(accel.array().tiles()[0].weight_sum, 7 * 64);
//! # Ok::<(), ricepipe_core::Error>(())
//! ```

pub mod accelerator;
pub mod array;
pub mod decoder;
pub mod loader;
pub mod staging;

pub use accelerator::{AccelState, Accelerator, RunReport};
pub use array::{ChecksumArray, TileChecksum};
pub use decoder::{ByteCache, DecoderBank, GroupDecoder, LaneFault, LaneState};
pub use loader::{MetadataLoader, ScaleTable, WeightLoader};
pub use staging::{MetaStaging, StagingBuffers, WeightStaging};

// Re-export the shared crates.
pub use ricepipe_core;
pub use ricepipe_rice;
