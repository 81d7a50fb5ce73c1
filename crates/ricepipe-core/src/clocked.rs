//! Clocked building blocks: fixed-latency pipes and synchronous memories.
//!
//! Every model in ricepipe advances one tick at a time. A request issued
//! during tick `t` against a component with latency `L` becomes visible to
//! its issuer during tick `t + L`, never within the same tick. Issuers that
//! keep several requests outstanding track them with their own in-flight
//! counters instead of stalling.
//!
//! ```text
//!   tick t        tick t+1      ...    tick t+L
//!   push(v) ──▶  [ slot L-1 ]  ──▶ ... ──▶ pop() == Some(v)
//! ```

use std::collections::VecDeque;

use crate::error::{Error, Result};

/// A FIFO delaying every value by a fixed number of ticks.
#[derive(Debug, Clone)]
pub struct LatencyPipe<T> {
    latency: u32,
    /// (ticks remaining, value), oldest first.
    slots: VecDeque<(u32, T)>,
}

impl<T> LatencyPipe<T> {
    /// Create a pipe with the given latency (at least one tick).
    pub fn new(latency: u32) -> Self {
        debug_assert!(latency >= 1, "zero-latency pipe would be combinational");
        Self {
            latency: latency.max(1),
            slots: VecDeque::new(),
        }
    }

    /// Configured latency.
    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Enqueue a value issued this tick.
    pub fn push(&mut self, value: T) {
        self.slots.push_back((self.latency, value));
    }

    /// Take the oldest value whose latency has elapsed.
    pub fn pop(&mut self) -> Option<T> {
        match self.slots.front() {
            Some((0, _)) => self.slots.pop_front().map(|(_, value)| value),
            _ => None,
        }
    }

    /// Peek at the oldest ready value.
    pub fn peek(&self) -> Option<&T> {
        match self.slots.front() {
            Some((0, value)) => Some(value),
            _ => None,
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        for (remaining, _) in self.slots.iter_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }

    /// Values issued but not yet popped.
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every in-flight value.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// A synchronous read memory with tagged, fixed-latency responses.
///
/// Data is sampled when the read is issued; the response carries the
/// requester's tag so a shared memory can route it back.
#[derive(Debug, Clone)]
pub struct SyncMemory<T> {
    name: &'static str,
    cells: Vec<T>,
    responses: LatencyPipe<(usize, T)>,
}

impl<T: Copy + Default> SyncMemory<T> {
    /// Create a memory of `depth` default-initialised cells.
    pub fn new(name: &'static str, depth: usize, latency: u32) -> Self {
        Self {
            name,
            cells: vec![T::default(); depth],
            responses: LatencyPipe::new(latency),
        }
    }

    /// Memory name used in errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of cells.
    pub fn depth(&self) -> usize {
        self.cells.len()
    }

    /// Bulk-load one cell.
    pub fn write(&mut self, addr: usize, value: T) -> Result<()> {
        let depth = self.cells.len();
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or_else(|| Error::out_of_range(self.name, addr, depth))?;
        *cell = value;
        Ok(())
    }

    /// Read a cell immediately, outside the clocked interface.
    pub fn get(&self, addr: usize) -> Result<T> {
        self.cells
            .get(addr)
            .copied()
            .ok_or_else(|| Error::out_of_range(self.name, addr, self.cells.len()))
    }

    /// Issue a read on behalf of requester `tag`.
    pub fn issue(&mut self, addr: usize, tag: usize) -> Result<()> {
        let value = self.get(addr)?;
        self.responses.push((tag, value));
        Ok(())
    }

    /// Take the response due this tick, if any.
    pub fn poll(&mut self) -> Option<(usize, T)> {
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

    /// Drop every undelivered read. Cell contents are kept.
    pub fn cancel_reads(&mut self) {
        self.responses.clear();
    }
}
