//! # Ricepipe Rice
//!
//! Golomb-Rice coding of 4-bit quantized weights.
//!
//! ## Decode side
//!
//! - [`SymbolCodec`] - one code per call from an aligned bit window, through
//!   a cached lookup table for quotients up to 4 and a leading-ones count
//!   for longer codes
//! - [`BitAccumulator`] - the lane-local buffer chunks are appended to
//! - [`weight::reconstruct`] - unsigned delta plus zero point to weight
//!
//! ## Encode side
//!
//! - [`GroupEncoder`] - cheapest of Rice k=1, Rice k=2 and raw per group
//! - [`StreamBuilder`] - byte-aligned groups plus their metadata records
//!
//! ## Example
//!
//! ```rust
//! use ricepipe_core::RiceK;
//! use ricepipe_rice::SymbolCodec;
//!
//! let codec = SymbolCodec::new(15);
//! // "110 1" under k=1: quotient 2, remainder 1.
//! let window = 0b1101u64 << 60;
//! let symbol = codec.decode(window, RiceK::K1).unwrap();
//! assert_eq!(symbol.value(RiceK::K1), 5);
//! assert_eq!(symbol.length, 4);
//! ```

pub mod accumulator;
pub mod encoder;
pub mod symbol;
pub mod table;
pub mod weight;

pub use accumulator::{stream_order, BitAccumulator};
pub use encoder::{BitWriter, EncodedGroup, GroupEncoder, StreamBuilder, StreamImage};
pub use symbol::{CodedValue, DecodedSymbol, SymbolCodec};
pub use table::{cached_fast_table, fast_patterns, FastEntry, FastPattern, FastTable};
pub use weight::{reconstruct, unzigzag, weight_to_value, zigzag};
