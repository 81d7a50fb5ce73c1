//! Golomb-Rice symbol decoding.
//!
//! A symbol is decoded from a left-aligned 64-bit window whose MSB is the
//! next unread stream bit. The codec is a pure function of the window: it
//! has no state and takes no ticks.
//!
//! ```text
//!  window: 1 1 0 r r x x x ...      (k = 2)
//!          └q=2┘ │ └r┘
//!              terminator
//! ```

use ricepipe_core::{
    CodingMode, DecodePath, Error, Result, RiceK, DEFAULT_MAX_QUOTIENT, RAW_FIELD_BITS,
};

use crate::table::cached_fast_table;

/// One decoded Golomb-Rice code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSymbol {
    /// Number of leading ones.
    pub quotient: u32,
    /// The k bits after the terminator.
    pub remainder: u32,
    /// Bits consumed, `quotient + 1 + k`.
    pub length: u32,
    /// Which path resolved the code.
    pub path: DecodePath,
}

impl DecodedSymbol {
    /// The unsigned integer the code represents.
    #[inline]
    pub fn value(&self, k: RiceK) -> u32 {
        (self.quotient << k.bits()) | self.remainder
    }
}

/// An unsigned delta read under a group's coding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodedValue {
    /// Unsigned delta before zero-point remapping.
    pub value: u32,
    /// Bits consumed.
    pub length: u32,
    /// Which path resolved it.
    pub path: DecodePath,
}

/// Stateless Golomb-Rice decoder with a configured maximum quotient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolCodec {
    max_quotient: u32,
}

impl Default for SymbolCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUOTIENT)
    }
}

impl SymbolCodec {
    /// Create a codec rejecting quotients above `max_quotient`.
    pub fn new(max_quotient: u32) -> Self {
        debug_assert!(max_quotient < 63);
        Self { max_quotient }
    }

    /// Configured maximum quotient.
    pub fn max_quotient(&self) -> u32 {
        self.max_quotient
    }

    /// Longest code this codec accepts, in bits.
    pub fn max_symbol_bits(&self) -> u32 {
        self.max_quotient + 1 + RiceK::K2.bits()
    }

    /// Decode one code from `window`, trying the fast table first.
    ///
    /// Only the first `max_symbol_bits()` bits of the window are examined.
    /// Fast hits above the configured maximum quotient are rejected like
    /// any other over-long code.
    #[inline]
    pub fn decode(&self, window: u64, k: RiceK) -> Result<DecodedSymbol> {
        match self.decode_fast(window, k) {
            Some(symbol) if symbol.quotient > self.max_quotient => {
                Err(Error::invalid_symbol(symbol.quotient, self.max_quotient))
            }
            Some(symbol) => Ok(symbol),
            None => self.decode_slow(window, k),
        }
    }

    /// Resolve short codes (quotient at most 4) by table lookup.
    #[inline]
    pub fn decode_fast(&self, window: u64, k: RiceK) -> Option<DecodedSymbol> {
        let top = (window >> 56) as u8;
        cached_fast_table(k).lookup(top).map(|entry| DecodedSymbol {
            quotient: entry.quotient as u32,
            remainder: entry.remainder as u32,
            length: entry.length as u32,
            path: DecodePath::Fast,
        })
    }

    /// Count leading ones over a `max_quotient + 1` bit window.
    ///
    /// The window is inverted so the terminator becomes the first set bit.
    /// A window of all ones has no terminator and is rejected.
    pub fn decode_slow(&self, window: u64, k: RiceK) -> Result<DecodedSymbol> {
        let span = self.max_quotient + 1;
        let head = window >> (64 - span);
        let inverted = !head & low_mask(span);
        if inverted == 0 {
            return Err(Error::invalid_symbol(span, self.max_quotient));
        }

        let quotient = inverted.leading_zeros() - (64 - span);
        let kb = k.bits();
        let remainder = ((window << (quotient + 1)) >> (64 - kb)) as u32;

        Ok(DecodedSymbol {
            quotient,
            remainder,
            length: quotient + 1 + kb,
            path: DecodePath::Slow,
        })
    }

    /// Read one unsigned delta under `mode`.
    #[inline]
    pub fn decode_value(&self, window: u64, mode: CodingMode) -> Result<CodedValue> {
        match mode {
            CodingMode::Rice(k) => {
                let symbol = self.decode(window, k)?;
                Ok(CodedValue {
                    value: symbol.value(k),
                    length: symbol.length,
                    path: symbol.path,
                })
            }
            CodingMode::Raw => Ok(CodedValue {
                value: (window >> (64 - RAW_FIELD_BITS)) as u32,
                length: RAW_FIELD_BITS,
                path: DecodePath::Raw,
            }),
        }
    }
}

#[inline]
fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
