//! Byte cache holding the concatenated group bitstreams.

use ricepipe_core::{Error, LatencyPipe, Result};

/// Flat byte memory read in fixed-size little-endian chunks.
///
/// Addresses past the end read as zero, so a lane may prefetch beyond the
/// last group of the stream.
#[derive(Debug, Clone)]
pub struct ByteCache {
    bytes: Vec<u8>,
    chunk_bytes: usize,
    responses: LatencyPipe<(usize, u64)>,
}

impl ByteCache {
    /// Create a zeroed cache of `capacity` bytes.
    pub fn new(capacity: usize, chunk_bytes: usize, latency: u32) -> Self {
        debug_assert!((1..=8).contains(&chunk_bytes));
        Self {
            bytes: vec![0; capacity],
            chunk_bytes,
            responses: LatencyPipe::new(latency),
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes per chunk read.
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    /// Bulk-load one byte.
    pub fn load_byte(&mut self, addr: usize, byte: u8) -> Result<()> {
        let size = self.bytes.len();
        let cell = self
            .bytes
            .get_mut(addr)
            .ok_or_else(|| Error::out_of_range("byte cache", addr, size))?;
        *cell = byte;
        Ok(())
    }

    /// Bulk-load a run of bytes starting at `base`.
    pub fn load(&mut self, base: usize, data: &[u8]) -> Result<()> {
        let end = base
            .checked_add(data.len())
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                Error::out_of_range("byte cache", base.saturating_add(data.len()), self.bytes.len())
            })?;
        self.bytes[base..end].copy_from_slice(data);
        Ok(())
    }

    /// The chunk at `addr` as a little-endian word, zero-filled past the end.
    pub fn read_word(&self, addr: usize) -> u64 {
        let mut word = [0u8; 8];
        if let Some(tail) = self.bytes.get(addr..) {
            let n = tail.len().min(self.chunk_bytes);
            word[..n].copy_from_slice(&tail[..n]);
        }
        u64::from_le_bytes(word)
    }

    /// Issue a chunk read on behalf of requester `tag`.
    pub fn issue(&mut self, addr: u32, tag: usize) {
        let word = self.read_word(addr as usize);
        self.responses.push((tag, word));
    }

    /// Take the response due this tick, if any.
    pub fn poll(&mut self) -> Option<(usize, u64)> {
        self.responses.pop()
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        self.responses.tick();
    }

    /// Reads issued but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.responses.in_flight()
    }

    /// Drop every undelivered read. Loaded bytes are kept.
    pub fn cancel_reads(&mut self) {
        self.responses.clear();
    }
}
