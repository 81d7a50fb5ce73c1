//! Round-robin arbitration for shared memories.

/// A single-winner round-robin arbiter.
///
/// Each tick the arbiter sees the full request vector and grants the first
/// requester at or after its priority pointer, then moves the pointer just
/// past the winner. A requester that keeps asking is served within
/// `width` grants.
#[derive(Debug, Clone)]
pub struct RoundRobinArbiter {
    width: usize,
    priority: usize,
}

impl RoundRobinArbiter {
    /// Create an arbiter over `width` requesters, priority starting at 0.
    pub fn new(width: usize) -> Self {
        Self { width, priority: 0 }
    }

    /// Number of requesters.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Current priority pointer.
    pub fn priority(&self) -> usize {
        self.priority
    }

    /// Grant at most one of `requests`, rotating priority past the winner.
    pub fn arbitrate(&mut self, requests: &[bool]) -> Option<usize> {
        debug_assert_eq!(requests.len(), self.width);
        let width = self.width.min(requests.len());
        let winner = (0..width)
            .map(|i| (self.priority + i) % width)
            .find(|&idx| requests[idx])?;
        self.priority = (winner + 1) % width;
        Some(winner)
    }

    /// Reset priority to requester 0.
    pub fn reset(&mut self) {
        self.priority = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_requests() {
        let mut arb = RoundRobinArbiter::new(4);
        assert_eq!(arb.arbitrate(&[false; 4]), None);
        assert_eq!(arb.priority(), 0);
    }

    #[test]
    fn test_all_requesting_rotates() {
        let mut arb = RoundRobinArbiter::new(4);
        let grants: Vec<usize> = (0..8).filter_map(|_| arb.arbitrate(&[true; 4])).collect();
        assert_eq!(grants, vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_pointer_moves_past_winner() {
        let mut arb = RoundRobinArbiter::new(4);
        assert_eq!(arb.arbitrate(&[false, false, true, false]), Some(2));
        assert_eq!(arb.priority(), 3);
        // Lane 0 wins next even though lane 2 asks again: wrap from 3.
        assert_eq!(arb.arbitrate(&[true, false, true, false]), Some(0));
        assert_eq!(arb.arbitrate(&[true, false, true, false]), Some(2));
    }

    #[test]
    fn test_no_starvation() {
        let mut arb = RoundRobinArbiter::new(5);
        let requests = [true, true, false, true, true];
        let mut last_grant = [0usize; 5];
        for tick in 1..=100 {
            if let Some(w) = arb.arbitrate(&requests) {
                last_grant[w] = tick;
            }
            for (lane, &asking) in requests.iter().enumerate() {
                if asking && tick > 5 {
                    assert!(tick - last_grant[lane] < 5, "lane {lane} starved");
                }
            }
        }
    }

    #[test]
    fn test_reset() {
        let mut arb = RoundRobinArbiter::new(3);
        arb.arbitrate(&[false, true, false]);
        arb.reset();
        assert_eq!(arb.priority(), 0);
    }
}
