//! Checksum-recording compute array.
//!
//! Stands in for the weight-stationary array: it keeps the loaded tile,
//! and on completion records per-tile sums of the raw and dequantized
//! weights so runs can be compared without modelling the MAC cells.

use serde::{Deserialize, Serialize};

use ricepipe_core::{ComputeArray, TileMeta};

/// Summary of one completed tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileChecksum {
    pub tile: u32,
    /// Load-row pulses received.
    pub rows: usize,
    /// Sum of all 4-bit weights.
    pub weight_sum: u64,
    /// Sum of `(weight - zero_point) * scale` over every cell.
    pub dequant_sum: f64,
}

/// Reference [`ComputeArray`] recording tile contents and checksums.
#[derive(Debug, Clone)]
pub struct ChecksumArray {
    dim: usize,
    meta: TileMeta,
    /// Row-major N×N weights of the tile being loaded.
    weights: Vec<u8>,
    rows: usize,
    tiles: Vec<TileChecksum>,
    last_tile: Vec<u8>,
}

impl ChecksumArray {
    /// An empty `dim` × `dim` array.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            meta: TileMeta::zeroed(dim),
            weights: vec![0; dim * dim],
            rows: 0,
            tiles: Vec::new(),
            last_tile: Vec::new(),
        }
    }

    /// Array dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Checksums of every completed tile, in order.
    pub fn tiles(&self) -> &[TileChecksum] {
        &self.tiles
    }

    /// Row-major weights of the most recently completed tile.
    pub fn last_tile(&self) -> &[u8] {
        &self.last_tile
    }

    /// Metadata most recently loaded.
    pub fn meta(&self) -> &TileMeta {
        &self.meta
    }

    /// Weight at `(row, col)` of the tile being loaded.
    pub fn weight(&self, row: usize, col: usize) -> Option<u8> {
        if col >= self.dim {
            return None;
        }
        self.weights.get(row * self.dim + col).copied()
    }
}

impl ComputeArray for ChecksumArray {
    fn load_meta(&mut self, meta: &TileMeta) {
        self.meta = meta.clone();
        self.rows = 0;
    }

    fn load_row(&mut self, row: usize, weights: &[u8]) {
        if row >= self.dim {
            return;
        }
        let n = weights.len().min(self.dim);
        let start = row * self.dim;
        self.weights[start..start + n].copy_from_slice(&weights[..n]);
        self.rows += 1;
    }

    fn tile_complete(&mut self, tile: u32) {
        let mut weight_sum = 0u64;
        let mut dequant_sum = 0f64;
        for (i, &w) in self.weights.iter().enumerate() {
            let col = i % self.dim;
            let zero_point = self.meta.zero_points.get(col).copied().unwrap_or(0);
            let scale = self.meta.scales.get(col).copied().unwrap_or(0.0);
            weight_sum += w as u64;
            dequant_sum += (w as f64 - zero_point as f64) * scale as f64;
        }

        self.tiles.push(TileChecksum {
            tile,
            rows: self.rows,
            weight_sum,
            dequant_sum,
        });
        self.last_tile = self.weights.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_of_loaded_tile() {
        let mut array = ChecksumArray::new(2);
        array.load_meta(&TileMeta {
            zero_points: vec![8, 4],
            scales: vec![1.0, 0.5],
        });
        array.load_row(0, &[9, 4]);
        array.load_row(1, &[7, 8]);
        assert_eq!(array.weight(1, 1), Some(8));
        assert_eq!(array.weight(0, 2), None);

        array.tile_complete(3);
        let tile = &array.tiles()[0];
        assert_eq!(tile.tile, 3);
        assert_eq!(tile.rows, 2);
        assert_eq!(tile.weight_sum, 28);
        // (9-8)*1 + 0 + (7-8)*1 + (8-4)*0.5
        assert!((tile.dequant_sum - 2.0).abs() < 1e-9);
        assert_eq!(array.last_tile(), &[9, 4, 7, 8]);
    }

    #[test]
    fn test_out_of_range_row_ignored() {
        let mut array = ChecksumArray::new(2);
        array.load_row(2, &[1, 1]);
        array.tile_complete(0);
        assert_eq!(array.tiles()[0].rows, 0);
        assert_eq!(array.tiles()[0].weight_sum, 0);
    }
}
