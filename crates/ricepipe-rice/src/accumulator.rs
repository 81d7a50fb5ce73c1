//! Left-aligned bit accumulator fed by byte-cache chunks.

use ricepipe_core::ACCUMULATOR_BITS;

/// Convert a little-endian cache word to stream bit order.
///
/// The byte cache returns `bytes` bytes packed little-endian (first stream
/// byte in the low bits), while the stream is read big-endian from its head.
/// Swapping bytes puts the first stream byte on top.
#[inline]
pub fn stream_order(word: u64, bytes: usize) -> u64 {
    if bytes == 0 {
        return 0;
    }
    word.swap_bytes() >> (64 - 8 * bytes as u32)
}

/// A 64-bit buffer of pending stream bits.
///
/// Valid bits sit at the top of the word; the MSB is the next bit to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitAccumulator {
    bits: u64,
    len: u32,
}

impl BitAccumulator {
    /// Create an empty accumulator.
    pub const fn new() -> Self {
        Self { bits: 0, len: 0 }
    }

    /// Buffered bits.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no bits are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Room left for more bits.
    #[inline]
    pub fn free_bits(&self) -> u32 {
        ACCUMULATOR_BITS - self.len
    }

    /// Drop all buffered bits.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Append the low `width` bits of `chunk` behind the buffered bits.
    #[inline]
    pub fn push(&mut self, chunk: u64, width: u32) {
        debug_assert!(width <= self.free_bits(), "accumulator overflow");
        if width == 0 {
            return;
        }
        let chunk = if width >= 64 {
            chunk
        } else {
            chunk & ((1u64 << width) - 1)
        };
        self.bits |= chunk << (ACCUMULATOR_BITS - self.len - width);
        self.len += width;
    }

    /// The buffered bits, left-aligned. Bits past `len()` are zero.
    #[inline]
    pub fn window(&self) -> u64 {
        self.bits
    }

    /// The next `n` bits, right-aligned, without consuming them.
    #[inline]
    pub fn peek(&self, n: u32) -> u64 {
        debug_assert!(n >= 1 && n <= 64);
        self.bits >> (64 - n)
    }

    /// Discard the next `n` bits.
    #[inline]
    pub fn consume(&mut self, n: u32) {
        debug_assert!(n <= self.len, "consumed past buffered bits");
        self.bits = if n >= 64 { 0 } else { self.bits << n };
        self.len = self.len.saturating_sub(n);
    }

    /// Read and discard the next `n` bits.
    #[inline]
    pub fn take(&mut self, n: u32) -> u64 {
        let value = self.peek(n);
        self.consume(n);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_order_four_bytes() {
        // Stream bytes AA BB CC DD as read little-endian from the cache.
        let word = u64::from_le_bytes([0xAA, 0xBB, 0xCC, 0xDD, 0, 0, 0, 0]);
        assert_eq!(stream_order(word, 4), 0xAABB_CCDD);
    }

    #[test]
    fn test_stream_order_other_widths() {
        let word = u64::from_le_bytes([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(stream_order(word, 1), 0x01);
        assert_eq!(stream_order(word, 2), 0x0102);
        assert_eq!(stream_order(word, 8), 0x0102_0304_0506_0708);
        assert_eq!(stream_order(word, 0), 0);
    }

    #[test]
    fn test_push_and_take() {
        let mut acc = BitAccumulator::new();
        acc.push(0b101, 3);
        acc.push(0b0110, 4);
        assert_eq!(acc.len(), 7);
        assert_eq!(acc.take(2), 0b10);
        assert_eq!(acc.take(5), 0b10110);
        assert!(acc.is_empty());
        assert_eq!(acc.window(), 0);
    }

    #[test]
    fn test_push_masks_high_bits() {
        let mut acc = BitAccumulator::new();
        acc.push(0xFFFF_FF01, 8);
        assert_eq!(acc.peek(8), 0x01);
        assert_eq!(acc.window(), 0x01 << 56);
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut acc = BitAccumulator::new();
        acc.push(0xDEAD_BEEF, 32);
        acc.push(0x0123_4567, 32);
        assert_eq!(acc.free_bits(), 0);
        assert_eq!(acc.window(), 0xDEAD_BEEF_0123_4567);
        acc.consume(64);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_window_tracks_consumption() {
        let mut acc = BitAccumulator::new();
        acc.push(0b1100_1010, 8);
        acc.consume(2);
        assert_eq!(acc.peek(6), 0b00_1010);
        acc.push(0b11, 2);
        assert_eq!(acc.peek(8), 0b0010_1011);
        acc.clear();
        assert_eq!(acc, BitAccumulator::default());
    }
}
