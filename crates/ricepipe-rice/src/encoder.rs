//! Group encoder and stream image builder.
//!
//! The decoder consumes byte-aligned groups, each laid out as:
//!
//! ```text
//! ┌──────┬────────────────────────────────────┬─────────┐
//! │ flag │ group_size codes (Rice k=1/k=2)    │ padding │
//! │ 2b   │   or group_size raw 4-bit fields   │ to byte │
//! └──────┴────────────────────────────────────┴─────────┘
//! ```
//!
//! [`GroupEncoder`] picks the cheapest mode for each group and
//! [`StreamBuilder`] concatenates groups into a [`StreamImage`] of cache
//! bytes plus one [`MetaRecord`] per group.

use ricepipe_core::{
    CodingMode, DecoderConfig, Error, MetaRecord, Result, RiceK, MODE_FLAG_BITS, RAW_FIELD_BITS,
    WEIGHT_LEVELS,
};
use tracing::trace;

use crate::weight::weight_to_value;

/// MSB-first bit writer.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u32,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bits written.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.filled as usize
    }

    /// Write the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, n: u32) {
        debug_assert!(n <= 64);
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | bit as u8;
        self.filled += 1;
        if self.filled == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
    }

    /// Write `count` ones followed by a terminating zero.
    pub fn write_unary(&mut self, count: u32) {
        for _ in 0..count {
            self.write_bit(true);
        }
        self.write_bit(false);
    }

    /// Write a Golomb-Rice code for `value`.
    pub fn write_rice(&mut self, value: u32, k: RiceK) {
        self.write_unary(value >> k.bits());
        self.write_bits(value as u64, k.bits());
    }

    /// Write a pattern of `'0'` / `'1'` characters; `_` and spaces are skipped.
    pub fn write_pattern(&mut self, pattern: &str) -> Result<()> {
        for c in pattern.chars() {
            match c {
                '0' => self.write_bit(false),
                '1' => self.write_bit(true),
                '_' | ' ' => {}
                other => {
                    return Err(Error::value_out_of_range("pattern digit", other as u64, 1));
                }
            }
        }
        Ok(())
    }

    /// Zero-pad to a byte boundary and return the bytes.
    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.current <<= 8 - self.filled;
            self.bytes.push(self.current);
        }
        self.bytes
    }
}

/// One encoded, byte-aligned group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedGroup {
    /// Mode written in the flag.
    pub mode: CodingMode,
    /// Group bits, zero-padded to a byte boundary.
    pub bytes: Vec<u8>,
    /// Bits before padding, flag included.
    pub bit_len: usize,
}

/// Chooses a coding mode per group and writes its bitstream.
#[derive(Debug, Clone, Copy)]
pub struct GroupEncoder {
    max_quotient: u32,
    group_size: usize,
}

impl GroupEncoder {
    /// Create an encoder for groups of `group_size` weights.
    pub fn new(max_quotient: u32, group_size: usize) -> Self {
        Self {
            max_quotient,
            group_size,
        }
    }

    /// Encoder matching a decoder configuration.
    pub fn from_config(config: &DecoderConfig) -> Self {
        Self::new(config.max_quotient, config.group_size)
    }

    /// Symbols per group.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Payload bits for `values` under `mode`, or `None` if a quotient
    /// exceeds the maximum.
    pub fn cost(&self, values: &[u32], mode: CodingMode) -> Option<usize> {
        match mode {
            CodingMode::Rice(k) => values.iter().try_fold(0usize, |acc, &v| {
                let q = v >> k.bits();
                (q <= self.max_quotient).then(|| acc + (q + 1 + k.bits()) as usize)
            }),
            CodingMode::Raw => Some(values.len() * RAW_FIELD_BITS as usize),
        }
    }

    /// Cheapest mode for `values`; ties prefer k=1, then k=2, then raw.
    pub fn choose_mode(&self, values: &[u32]) -> CodingMode {
        [
            CodingMode::Rice(RiceK::K1),
            CodingMode::Rice(RiceK::K2),
            CodingMode::Raw,
        ]
        .into_iter()
        .filter_map(|mode| self.cost(values, mode).map(|bits| (bits, mode)))
        .min_by_key(|&(bits, _)| bits)
        .map(|(_, mode)| mode)
        .unwrap_or(CodingMode::Raw)
    }

    /// Encode a group in its cheapest mode.
    pub fn encode(&self, weights: &[u8], zero_point: u8) -> Result<EncodedGroup> {
        let values = self.values(weights, zero_point)?;
        let mode = self.choose_mode(&values);
        self.write_group(&values, mode)
    }

    /// Encode a group in a fixed mode.
    pub fn encode_with_mode(
        &self,
        weights: &[u8],
        zero_point: u8,
        mode: CodingMode,
    ) -> Result<EncodedGroup> {
        let values = self.values(weights, zero_point)?;
        self.write_group(&values, mode)
    }

    fn values(&self, weights: &[u8], zero_point: u8) -> Result<Vec<u32>> {
        if weights.len() != self.group_size {
            return Err(Error::value_out_of_range(
                "group length",
                weights.len() as u64,
                self.group_size as u64,
            ));
        }
        check_nibble("zero point", zero_point)?;
        weights
            .iter()
            .map(|&w| {
                check_nibble("weight", w)?;
                Ok(weight_to_value(w, zero_point))
            })
            .collect()
    }

    fn write_group(&self, values: &[u32], mode: CodingMode) -> Result<EncodedGroup> {
        let payload = self.cost(values, mode).ok_or_else(|| {
            let shift = match mode {
                CodingMode::Rice(k) => k.bits(),
                CodingMode::Raw => 0,
            };
            let worst = values.iter().copied().max().unwrap_or(0) >> shift;
            Error::value_out_of_range("quotient", worst as u64, self.max_quotient as u64)
        })?;

        let mut writer = BitWriter::new();
        writer.write_bits(mode.flag() as u64, MODE_FLAG_BITS);
        for &v in values {
            match mode {
                CodingMode::Rice(k) => writer.write_rice(v, k),
                CodingMode::Raw => writer.write_bits(v as u64, RAW_FIELD_BITS),
            }
        }

        let bit_len = writer.bit_len();
        debug_assert_eq!(bit_len, payload + MODE_FLAG_BITS as usize);
        trace!(mode = %mode, bits = bit_len, "encoded group");

        Ok(EncodedGroup {
            mode,
            bytes: writer.finish(),
            bit_len,
        })
    }
}

fn check_nibble(what: &'static str, value: u8) -> Result<()> {
    if value >= WEIGHT_LEVELS {
        return Err(Error::value_out_of_range(
            what,
            value as u64,
            (WEIGHT_LEVELS - 1) as u64,
        ));
    }
    Ok(())
}

/// Cache contents and metadata table for a set of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamImage {
    /// Concatenated group bitstreams.
    pub bytes: Vec<u8>,
    /// One record per group, indexed by group id.
    pub records: Vec<MetaRecord>,
}

impl StreamImage {
    /// Number of groups.
    pub fn groups(&self) -> usize {
        self.records.len()
    }
}

/// Appends encoded groups to a [`StreamImage`], assigning dense group ids.
#[derive(Debug, Clone)]
pub struct StreamBuilder {
    encoder: GroupEncoder,
    image: StreamImage,
}

impl StreamBuilder {
    /// Create a builder using `encoder` for weight groups.
    pub fn new(encoder: GroupEncoder) -> Self {
        Self {
            encoder,
            image: StreamImage::default(),
        }
    }

    /// The group encoder.
    pub fn encoder(&self) -> &GroupEncoder {
        &self.encoder
    }

    /// Encode and append one group; returns its id.
    pub fn push_weights(&mut self, weights: &[u8], zero_point: u8) -> Result<u32> {
        let group = self.encoder.encode(weights, zero_point)?;
        self.push_bytes(&group.bytes, zero_point)
    }

    /// Append one group in a fixed mode; returns its id.
    pub fn push_weights_with_mode(
        &mut self,
        weights: &[u8],
        zero_point: u8,
        mode: CodingMode,
    ) -> Result<u32> {
        let group = self.encoder.encode_with_mode(weights, zero_point, mode)?;
        self.push_bytes(&group.bytes, zero_point)
    }

    /// Append a pre-built group bitstream; returns its id.
    pub fn push_bytes(&mut self, bytes: &[u8], zero_point: u8) -> Result<u32> {
        check_nibble("zero point", zero_point)?;
        let offset = u32::try_from(self.image.bytes.len()).map_err(|_| {
            Error::value_out_of_range("byte offset", self.image.bytes.len() as u64, u32::MAX as u64)
        })?;
        let id = self.image.records.len() as u32;
        self.image.bytes.extend_from_slice(bytes);
        self.image.records.push(MetaRecord::new(offset, zero_point));
        Ok(id)
    }

    /// Append a group written as a `'0'`/`'1'` pattern; returns its id.
    pub fn push_pattern(&mut self, pattern: &str, zero_point: u8) -> Result<u32> {
        let mut writer = BitWriter::new();
        writer.write_pattern(pattern)?;
        self.push_bytes(&writer.finish(), zero_point)
    }

    /// Groups appended so far.
    pub fn len(&self) -> usize {
        self.image.records.len()
    }

    /// Whether no groups were appended.
    pub fn is_empty(&self) -> bool {
        self.image.records.is_empty()
    }

    /// Take the finished image.
    pub fn finish(self) -> StreamImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_writer_msb_first() {
        let mut w = BitWriter::new();
        w.write_bits(0b101, 3);
        w.write_bits(0b00001, 5);
        w.write_bits(0b11, 2);
        assert_eq!(w.bit_len(), 10);
        assert_eq!(w.finish(), vec![0b1010_0001, 0b1100_0000]);
    }

    #[test]
    fn test_write_rice() {
        let mut w = BitWriter::new();
        // 10 under k=2: q=2 -> "110", r=2 -> "10"
        w.write_rice(10, RiceK::K2);
        assert_eq!(w.bit_len(), 5);
        assert_eq!(w.finish(), vec![0b1101_0000]);
    }

    #[test]
    fn test_write_pattern() {
        let mut w = BitWriter::new();
        w.write_pattern("10_01 1").unwrap();
        assert_eq!(w.finish(), vec![0b1001_1000]);

        let mut w = BitWriter::new();
        assert!(w.write_pattern("012").is_err());
    }

    #[test]
    fn test_choose_mode_prefers_k1_for_small_deltas() {
        let enc = GroupEncoder::new(15, 8);
        let group = enc.encode(&[8; 8], 8).unwrap();
        assert_eq!(group.mode, CodingMode::Rice(RiceK::K1));
        // 2 flag bits + 8 codes of "00"
        assert_eq!(group.bit_len, 2 + 8 * 2);
    }

    #[test]
    fn test_choose_mode_raw_for_large_deltas() {
        let enc = GroupEncoder::new(15, 8);
        // Distance -8 everywhere: value 15, k=1 costs 9 bits, k=2 costs 6, raw 4.
        let group = enc.encode(&[0; 8], 8).unwrap();
        assert_eq!(group.mode, CodingMode::Raw);
        assert_eq!(group.bit_len, 2 + 8 * 4);
        assert_eq!(group.bytes[0] >> 6, 0b10);
    }

    #[test]
    fn test_choose_mode_k2_middle_ground() {
        let enc = GroupEncoder::new(15, 4);
        // Distance +3: value 6, k=1 costs 5 bits, k=2 costs 4, raw 4; k=2 wins the tie.
        let group = enc.encode(&[11; 4], 8).unwrap();
        assert_eq!(group.mode, CodingMode::Rice(RiceK::K2));
    }

    #[test]
    fn test_quotient_limit_excludes_mode() {
        let enc = GroupEncoder::new(4, 2);
        let values = [15, 15];
        assert_eq!(enc.cost(&values, CodingMode::Rice(RiceK::K1)), None);
        assert_eq!(enc.cost(&values, CodingMode::Rice(RiceK::K2)), Some(12));

        let err = enc
            .encode_with_mode(&[0, 0], 8, CodingMode::Rice(RiceK::K1))
            .unwrap_err();
        assert_eq!(err.category(), "value_out_of_range");
    }

    #[test]
    fn test_rejects_bad_input() {
        let enc = GroupEncoder::new(15, 4);
        assert!(enc.encode(&[1, 2, 3], 8).is_err());
        assert!(enc.encode(&[1, 2, 3, 16], 8).is_err());
        assert!(enc.encode(&[1, 2, 3, 4], 16).is_err());
    }

    #[test]
    fn test_stream_builder_offsets() {
        let mut builder = StreamBuilder::new(GroupEncoder::new(15, 4));
        let g0 = builder.push_weights(&[8, 8, 8, 8], 8).unwrap();
        let g1 = builder.push_pattern("10 0101 0101 0101 0101", 8).unwrap();
        let g2 = builder.push_weights(&[1, 2, 3, 4], 2).unwrap();
        assert_eq!((g0, g1, g2), (0, 1, 2));
        assert_eq!(builder.len(), 3);

        let image = builder.finish();
        assert_eq!(image.groups(), 3);
        // Group 0: 2 + 4*2 = 10 bits -> 2 bytes. Group 1: 18 bits -> 3 bytes.
        assert_eq!(image.records[0], MetaRecord::new(0, 8));
        assert_eq!(image.records[1], MetaRecord::new(2, 8));
        assert_eq!(image.records[2].byte_offset, 5);
        assert_eq!(image.records[2].zero_point, 2);
    }
}
