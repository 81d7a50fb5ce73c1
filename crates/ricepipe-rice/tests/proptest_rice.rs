//! Property-based tests for the Golomb-Rice codec.
//!
//! - Every code with quotient up to the maximum decodes exactly, whatever
//!   bits follow it
//! - Codes past the maximum quotient are rejected
//! - Zero-point remapping recovers `value mod 16`
//! - Encoded groups walk back to their weights through the accumulator
//!
//! Run with: cargo test -p ricepipe-rice --test proptest_rice

use proptest::prelude::*;

use ricepipe_core::{CodingMode, RiceK, MODE_FLAG_BITS};
use ricepipe_rice::{
    reconstruct, stream_order, weight_to_value, BitAccumulator, GroupEncoder, SymbolCodec,
};

fn k_strategy() -> impl Strategy<Value = RiceK> {
    prop_oneof![Just(RiceK::K1), Just(RiceK::K2)]
}

fn mode_strategy() -> impl Strategy<Value = CodingMode> {
    prop_oneof![
        Just(CodingMode::Rice(RiceK::K1)),
        Just(CodingMode::Rice(RiceK::K2)),
        Just(CodingMode::Raw),
    ]
}

/// Walk a group bitstream the way a lane does: 32-bit chunks appended to
/// the accumulator, refilled whenever fewer than max-symbol-width bits remain.
fn walk_group(bytes: &[u8], group_size: usize, codec: &SymbolCodec, zero_point: u8) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    padded.resize(bytes.len() + 8, 0);
    let mut offset = 0;
    let mut acc = BitAccumulator::new();
    let refill = |acc: &mut BitAccumulator, offset: &mut usize| {
        let mut word = [0u8; 8];
        word[..4].copy_from_slice(&padded[*offset..*offset + 4]);
        acc.push(stream_order(u64::from_le_bytes(word), 4), 32);
        *offset += 4;
    };

    refill(&mut acc, &mut offset);
    let mode = CodingMode::from_flag(acc.take(MODE_FLAG_BITS) as u8);
    let mut out = Vec::with_capacity(group_size);
    while out.len() < group_size {
        if acc.len() < codec.max_symbol_bits() {
            refill(&mut acc, &mut offset);
            continue;
        }
        let coded = codec.decode_value(acc.window(), mode).unwrap();
        out.push(reconstruct(coded.value, zero_point));
        acc.consume(coded.length);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Property: any valid code decodes to its (q, r, length).
    #[test]
    fn prop_symbol_roundtrip(
        k in k_strategy(),
        q in 0u32..=15,
        r_seed in any::<u32>(),
        tail in any::<u64>(),
    ) {
        let codec = SymbolCodec::new(15);
        let kb = k.bits();
        let r = r_seed & ((1 << kb) - 1);
        let len = q + 1 + kb;
        let code = (((1u64 << q) - 1) << (kb + 1)) | r as u64;
        let window = (code << (64 - len)) | (tail >> len);

        let sym = codec.decode(window, k).unwrap();
        prop_assert_eq!((sym.quotient, sym.remainder, sym.length), (q, r, len));
    }

    /// Property: more leading ones than the maximum quotient is an error.
    #[test]
    fn prop_long_quotient_rejected(
        k in k_strategy(),
        max_quotient in 4u32..=20,
        extra in 1u32..=8,
        tail in any::<u64>(),
    ) {
        let codec = SymbolCodec::new(max_quotient);
        let ones = max_quotient + extra;
        let window = !(u64::MAX >> ones) | (tail >> ones);
        prop_assert!(codec.decode(window, k).is_err());
    }

    /// Property: remapping through the zero point recovers value mod 16.
    #[test]
    fn prop_zero_point_remap(value in any::<u8>(), zero_point in 0u8..16) {
        let coded = weight_to_value(value, zero_point);
        prop_assert!(coded <= 15);
        prop_assert_eq!(reconstruct(coded, zero_point), value % 16);
    }

    /// Property: an encoded group decodes back to its weights in any mode.
    #[test]
    fn prop_group_roundtrip(
        weights in prop::collection::vec(0u8..16, 1..96),
        zero_point in 0u8..16,
        mode in mode_strategy(),
    ) {
        let encoder = GroupEncoder::new(15, weights.len());
        let codec = SymbolCodec::new(15);
        let group = encoder.encode_with_mode(&weights, zero_point, mode).unwrap();
        prop_assert_eq!(group.mode, mode);

        let decoded = walk_group(&group.bytes, weights.len(), &codec, zero_point);
        prop_assert_eq!(decoded, weights);
    }

    /// Property: the chosen mode is never larger than raw fallback.
    #[test]
    fn prop_chosen_mode_no_worse_than_raw(
        weights in prop::collection::vec(0u8..16, 1..96),
        zero_point in 0u8..16,
    ) {
        let encoder = GroupEncoder::new(15, weights.len());
        let chosen = encoder.encode(&weights, zero_point).unwrap();
        let raw = encoder.encode_with_mode(&weights, zero_point, CodingMode::Raw).unwrap();
        prop_assert!(chosen.bit_len <= raw.bit_len);
    }
}
