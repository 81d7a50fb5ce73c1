//! Property-based tests for the decoder bank.
//!
//! - Lane shares partition every task exactly
//! - Any encoded set of groups decodes back to its weights, for any lane
//!   count, group size, timing and memory latency
//!
//! Run with: cargo test -p ricepipe --test proptest_decoder

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use ricepipe::DecoderBank;
use ricepipe_core::{DecodeSink, DecodeTask, DecodeTiming, DecoderConfig};
use ricepipe_rice::{GroupEncoder, StreamBuilder};

#[derive(Default)]
struct MapSink {
    groups: HashMap<(usize, u32), Vec<u8>>,
    zero_points: HashMap<(usize, u32), u8>,
}

impl DecodeSink for MapSink {
    fn write_weight(&mut self, lane: usize, wave: u32, offset: usize, weight: u8) {
        let group = self.groups.entry((lane, wave)).or_default();
        assert_eq!(group.len(), offset, "weights arrive in offset order");
        group.push(weight);
    }

    fn write_zero_point(&mut self, lane: usize, wave: u32, zero_point: u8) {
        self.zero_points.insert((lane, wave), zero_point);
    }
}

fn timing_strategy() -> impl Strategy<Value = DecodeTiming> {
    prop_oneof![Just(DecodeTiming::SingleCycle), Just(DecodeTiming::Split)]
}

/// Group weights with zero points, group size fixed per case.
fn groups_strategy() -> impl Strategy<Value = (usize, Vec<(Vec<u8>, u8)>)> {
    (1usize..24).prop_flat_map(|size| {
        let group = (prop::collection::vec(0u8..16, size), 0u8..16);
        (Just(size), prop::collection::vec(group, 1..12))
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    /// Property: shares are disjoint and their union is base..base+count.
    #[test]
    fn prop_lane_shares_partition(base in 0u32..1000, count in 0u32..200, lanes in 1usize..17) {
        let task = DecodeTask::new(base, count);
        let mut seen = BTreeSet::new();
        for lane in 0..lanes {
            for group in task.lane_groups(lane, lanes) {
                prop_assert!(seen.insert(group), "group {} assigned twice", group);
            }
        }
        let expected: BTreeSet<u32> = (base..base + count).collect();
        prop_assert_eq!(seen, expected);
    }

    /// Property: the bank reproduces every encoded group.
    #[test]
    fn prop_bank_decodes_encoded_groups(
        (size, groups) in groups_strategy(),
        lanes in 1usize..6,
        timing in timing_strategy(),
        cache_latency in 1u32..4,
        meta_latency in 1u32..3,
    ) {
        let config = DecoderConfig {
            cache_latency,
            meta_latency,
            ..DecoderConfig::default()
                .with_lanes(lanes)
                .with_group_size(size)
                .with_timing(timing)
        };
        let mut builder = StreamBuilder::new(GroupEncoder::from_config(&config));
        for (weights, zp) in &groups {
            builder.push_weights(weights, *zp).unwrap();
        }

        let mut bank = DecoderBank::new(config).unwrap();
        bank.load_image(&builder.finish()).unwrap();
        bank.start_task(DecodeTask::new(0, groups.len() as u32)).unwrap();

        let mut sink = MapSink::default();
        let mut ticks = 0;
        while !bank.is_finished() {
            bank.tick(&mut sink);
            ticks += 1;
            prop_assert!(ticks < 200_000, "bank stalled");
        }

        for (g, (weights, zp)) in groups.iter().enumerate() {
            let key = (g % lanes, (g / lanes) as u32);
            prop_assert_eq!(&sink.groups[&key], weights);
            prop_assert_eq!(sink.zero_points[&key], *zp);
        }
        prop_assert_eq!(bank.stats().symbols, (size * groups.len()) as u64);
        prop_assert_eq!(bank.stats().codec_faults, 0);
    }
}
