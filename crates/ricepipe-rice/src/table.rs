//! Fast-path lookup tables for short Golomb-Rice codes.
//!
//! Codes with a quotient of at most [`FAST_MAX_QUOTIENT`] are at most
//! `4 + 1 + 2 = 7` bits long, so the top [`FAST_WINDOW_BITS`] bits of the
//! window identify them completely. Each table is built from the explicit
//! list of code patterns for one `k`; construction rejects overlapping
//! patterns, so a window matches at most one of them.

use std::sync::OnceLock;

use ricepipe_core::{Error, Result, RiceK, FAST_MAX_QUOTIENT};

/// Window bits indexed by the fast table.
pub const FAST_WINDOW_BITS: u32 = 8;

const TABLE_SIZE: usize = 1 << FAST_WINDOW_BITS;

/// One short code: `quotient` ones, a zero, then `remainder` in k bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastPattern {
    /// Code bits, right-aligned.
    pub code: u8,
    /// Code length in bits.
    pub length: u8,
    /// Decoded quotient.
    pub quotient: u8,
    /// Decoded remainder.
    pub remainder: u8,
}

impl FastPattern {
    /// Whether the top `FAST_WINDOW_BITS` bits of a window start with this code.
    #[inline]
    pub fn matches(&self, top: u8) -> bool {
        top >> (FAST_WINDOW_BITS - self.length as u32) == self.code
    }
}

/// All fast-path code patterns for `k`, ordered by quotient then remainder.
pub fn fast_patterns(k: RiceK) -> Vec<FastPattern> {
    let kb = k.bits();
    let mut patterns = Vec::with_capacity(((FAST_MAX_QUOTIENT + 1) << kb) as usize);
    for q in 0..=FAST_MAX_QUOTIENT {
        let ones = (1u32 << q) - 1;
        for r in 0..(1u32 << kb) {
            patterns.push(FastPattern {
                code: ((ones << (kb + 1)) | r) as u8,
                length: (q + 1 + kb) as u8,
                quotient: q as u8,
                remainder: r as u8,
            });
        }
    }
    patterns
}

/// A resolved fast-path table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FastEntry {
    pub quotient: u8,
    pub remainder: u8,
    pub length: u8,
}

/// Lookup table over the top window bits for one `k`.
#[derive(Debug, Clone)]
pub struct FastTable {
    entries: [Option<FastEntry>; TABLE_SIZE],
    k: RiceK,
}

impl FastTable {
    /// Build the table from [`fast_patterns`].
    pub fn build(k: RiceK) -> Result<Self> {
        Self::from_patterns(k, &fast_patterns(k))
    }

    /// Build a table from an explicit pattern list.
    ///
    /// Fails if two patterns claim the same window.
    pub fn from_patterns(k: RiceK, patterns: &[FastPattern]) -> Result<Self> {
        let mut entries = [None; TABLE_SIZE];

        for pattern in patterns {
            let length = pattern.length as u32;
            if length == 0 || length > FAST_WINDOW_BITS {
                return Err(Error::config(format!(
                    "fast pattern length {} outside 1..={}",
                    length, FAST_WINDOW_BITS
                )));
            }
            let span = 1usize << (FAST_WINDOW_BITS - length);
            let base = (pattern.code as usize) << (FAST_WINDOW_BITS - length);
            for slot in &mut entries[base..base + span] {
                if slot.is_some() {
                    return Err(Error::config(format!(
                        "fast pattern {:0width$b} overlaps an earlier pattern",
                        pattern.code,
                        width = length as usize
                    )));
                }
                *slot = Some(FastEntry {
                    quotient: pattern.quotient,
                    remainder: pattern.remainder,
                    length: pattern.length,
                });
            }
        }

        Ok(Self { entries, k })
    }

    /// Rice parameter of this table.
    pub fn k(&self) -> RiceK {
        self.k
    }

    /// Look up the top window bits.
    #[inline]
    pub fn lookup(&self, top: u8) -> Option<FastEntry> {
        self.entries[top as usize]
    }

    /// Number of window values the table resolves.
    pub fn coverage(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

static CACHED_K1_TABLE: OnceLock<FastTable> = OnceLock::new();
static CACHED_K2_TABLE: OnceLock<FastTable> = OnceLock::new();

/// Get the cached fast table for `k`.
///
/// The table is built once on first access and cached for subsequent calls.
#[inline]
pub fn cached_fast_table(k: RiceK) -> &'static FastTable {
    match k {
        RiceK::K1 => CACHED_K1_TABLE.get_or_init(|| {
            FastTable::build(RiceK::K1).expect("k=1 fast table construction should never fail")
        }),
        RiceK::K2 => CACHED_K2_TABLE.get_or_init(|| {
            FastTable::build(RiceK::K2).expect("k=2 fast table construction should never fail")
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_counts() {
        assert_eq!(fast_patterns(RiceK::K1).len(), 10);
        assert_eq!(fast_patterns(RiceK::K2).len(), 20);
    }

    #[test]
    fn test_pattern_bits() {
        let patterns = fast_patterns(RiceK::K1);
        // q=0, r=1 -> "01"
        assert_eq!(
            patterns[1],
            FastPattern {
                code: 0b01,
                length: 2,
                quotient: 0,
                remainder: 1
            }
        );
        // q=4, r=0 -> "111100"
        assert_eq!(patterns[8].code, 0b111100);
        assert_eq!(patterns[8].length, 6);

        let patterns = fast_patterns(RiceK::K2);
        // q=2, r=3 -> "11011"
        let p = patterns[2 * 4 + 3];
        assert_eq!((p.code, p.length), (0b11011, 5));
    }

    #[test]
    fn test_patterns_mutually_exclusive() {
        for k in [RiceK::K1, RiceK::K2] {
            let patterns = fast_patterns(k);
            for top in 0..=255u8 {
                let hits = patterns.iter().filter(|p| p.matches(top)).count();
                assert!(hits <= 1, "window {top:08b} matched {hits} patterns");
            }
        }
    }

    #[test]
    fn test_table_exhaustive_for_short_codes() {
        for k in [RiceK::K1, RiceK::K2] {
            let table = FastTable::build(k).unwrap();
            for top in 0..=255u8 {
                let leading_ones = top.leading_ones();
                let entry = table.lookup(top);
                if leading_ones <= FAST_MAX_QUOTIENT {
                    let entry = entry.expect("short code must hit the fast table");
                    assert_eq!(entry.quotient as u32, leading_ones);
                    assert_eq!(entry.length as u32, leading_ones + 1 + k.bits());
                } else {
                    assert!(entry.is_none(), "window {top:08b} should fall back");
                }
            }
        }
    }

    #[test]
    fn test_table_coverage() {
        // Everything except windows starting with five ones.
        let expected = 256 - (256 >> 5);
        assert_eq!(FastTable::build(RiceK::K1).unwrap().coverage(), expected);
        assert_eq!(FastTable::build(RiceK::K2).unwrap().coverage(), expected);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut patterns = fast_patterns(RiceK::K1);
        patterns.push(FastPattern {
            code: 0b0,
            length: 1,
            quotient: 0,
            remainder: 0,
        });
        let err = FastTable::from_patterns(RiceK::K1, &patterns).unwrap_err();
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn test_cached_tables() {
        let a = cached_fast_table(RiceK::K1);
        let b = cached_fast_table(RiceK::K1);
        assert!(std::ptr::eq(a, b));
        assert_eq!(cached_fast_table(RiceK::K2).k(), RiceK::K2);
    }
}
