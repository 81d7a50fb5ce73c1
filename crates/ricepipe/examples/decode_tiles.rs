//! Encode a few random weight tiles, run them through the pipeline model
//! and print per-tile checksums plus decoder statistics.
//!
//! Usage:
//! ```bash
//! RUST_LOG=ricepipe=debug cargo run --example decode_tiles -p ricepipe -- [tiles] [dim] [lanes]
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ricepipe::{Accelerator, ChecksumArray};
use ricepipe_core::PipelineConfig;
use ricepipe_rice::{GroupEncoder, StreamBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let tiles: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(4);
    let dim: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(64);
    let lanes: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(8);

    let mut config = PipelineConfig::with_dims(dim, lanes);
    config.decoder.cache_bytes = (tiles as usize * dim * dim).max(1024);
    config.decoder.meta_depth = (tiles as usize * dim).max(1);

    println!("Ricepipe tile decode");
    println!("====================\n");
    println!("{tiles} tiles of {dim}x{dim}, {lanes} lanes\n");

    // Weights cluster around each group's zero point like a quantized layer.
    let mut rng = StdRng::seed_from_u64(7);
    let mut builder = StreamBuilder::new(GroupEncoder::from_config(&config.decoder));
    for _ in 0..tiles as usize * dim {
        let zp = rng.gen_range(4..12u8);
        let weights: Vec<u8> = (0..dim)
            .map(|_| {
                let spread: i32 = if rng.gen_bool(0.9) { 1 } else { 6 };
                (zp as i32 + rng.gen_range(-spread..=spread)).rem_euclid(16) as u8
            })
            .collect();
        builder.push_weights(&weights, zp)?;
    }
    let image = builder.finish();
    let raw_bytes = tiles as usize * dim * dim / 2;
    println!(
        "Encoded {} groups into {} bytes ({:.2}x vs packed 4-bit)\n",
        image.groups(),
        image.bytes.len(),
        raw_bytes as f64 / image.bytes.len().max(1) as f64
    );

    let mut accel = Accelerator::new(config, ChecksumArray::new(dim))?;
    accel.load_image(&image)?;
    for col in 0..dim {
        accel.load_scale(col, 0.01 * (col + 1) as f32)?;
    }

    let report = accel.run(tiles, 10_000_000)?;

    println!("{:>6} {:>6} {:>12} {:>14}", "Tile", "Rows", "Weight sum", "Dequant sum");
    println!("{}", "-".repeat(42));
    for tile in accel.array().tiles() {
        println!(
            "{:>6} {:>6} {:>12} {:>14.4}",
            tile.tile, tile.rows, tile.weight_sum, tile.dequant_sum
        );
    }

    println!("\nTicks:            {}", report.ticks);
    println!("Symbols/tick:     {:.3}", report.stats.symbols_per_tick());
    println!("Fast path ratio:  {:.3}", report.stats.fast_path_ratio());
    println!("Codec faults:     {}", report.faults.len());
    println!("\n{}", serde_json::to_string_pretty(&report.stats)?);

    Ok(())
}
