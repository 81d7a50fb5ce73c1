//! Decoder bank and pipeline throughput benchmarks.
//!
//! Throughput is reported in decoded weights per second of host time; the
//! tick counts themselves are printed by the `decode_tiles` example.
//!
//! Run with: `cargo bench -p ricepipe --bench pipeline`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ricepipe::{Accelerator, ChecksumArray, DecoderBank};
use ricepipe_core::{DecodeTask, NullSink, PipelineConfig};
use ricepipe_rice::{GroupEncoder, StreamBuilder, StreamImage};

fn generate_image(config: &PipelineConfig, tiles: usize) -> StreamImage {
    let mut rng = StdRng::seed_from_u64(42);
    let dim = config.array_dim;
    let mut builder = StreamBuilder::new(GroupEncoder::from_config(&config.decoder));
    for _ in 0..tiles * dim {
        let zp = rng.gen_range(0..16u8);
        let weights: Vec<u8> = (0..dim)
            .map(|_| (zp as i32 + rng.gen_range(-2..=2)).rem_euclid(16) as u8)
            .collect();
        builder
            .push_weights(&weights, zp)
            .expect("weights are 4-bit");
    }
    builder.finish()
}

fn bench_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoder_bank");

    for lanes in [1usize, 4, 8] {
        let config = PipelineConfig::with_dims(64, lanes);
        let image = generate_image(&config, 1);
        group.throughput(Throughput::Elements((64 * 64) as u64));

        group.bench_with_input(BenchmarkId::new("tile", lanes), &image, |b, image| {
            b.iter(|| {
                let mut bank = DecoderBank::new(config.decoder.clone()).expect("valid config");
                bank.load_image(image).expect("image fits");
                bank.start_task(DecodeTask::new(0, 64)).expect("idle bank");
                while !bank.is_finished() {
                    bank.tick(&mut NullSink);
                }
                black_box(bank.stats().symbols)
            })
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    let config = PipelineConfig::with_dims(32, 8);
    let tiles = 4;
    let image = generate_image(&config, tiles);
    group.throughput(Throughput::Elements((tiles * 32 * 32) as u64));

    group.bench_function("four_tiles_32", |b| {
        b.iter(|| {
            let mut accel =
                Accelerator::new(config.clone(), ChecksumArray::new(32)).expect("valid config");
            accel.load_image(&image).expect("image fits");
            let report = accel.run(tiles as u32, 1_000_000).expect("run completes");
            black_box(report.ticks)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_bank, bench_pipeline);
criterion_main!(benches);
