//! Mapping between 4-bit weights and unsigned code values.
//!
//! A weight is stored as its signed distance from the group's zero point,
//! folded into `-8..=7` and zig-zag mapped to an unsigned delta so that
//! small distances get short codes:
//!
//! | delta | 0 | -1 | 1 | -2 | 2 | ... | -8 |
//! |-------|---|----|---|----|---|-----|----|
//! | code  | 0 | 1  | 2 | 3  | 4 | ... | 15 |

use ricepipe_core::WEIGHT_LEVELS;

/// Largest unsigned delta a 4-bit weight can need.
pub const MAX_DELTA: u32 = 15;

/// Unsigned code value to signed delta: even `u` is `u/2`, odd is `-(u+1)/2`.
#[inline]
pub fn unzigzag(value: u32) -> i32 {
    if value & 1 == 0 {
        (value / 2) as i32
    } else {
        -(value.div_ceil(2) as i32)
    }
}

/// Signed delta to unsigned code value.
#[inline]
pub fn zigzag(delta: i32) -> u32 {
    if delta >= 0 {
        delta as u32 * 2
    } else {
        delta.unsigned_abs() * 2 - 1
    }
}

/// Rebuild a weight from a decoded value and its group's zero point.
#[inline]
pub fn reconstruct(value: u32, zero_point: u8) -> u8 {
    (unzigzag(value) + zero_point as i32).rem_euclid(WEIGHT_LEVELS as i32) as u8
}

/// Distance from `zero_point` to `weight`, folded into `-8..=7`.
#[inline]
pub fn wrapped_delta(weight: u8, zero_point: u8) -> i32 {
    let levels = WEIGHT_LEVELS as i32;
    let d = (weight as i32 - zero_point as i32).rem_euclid(levels);
    if d >= levels / 2 {
        d - levels
    } else {
        d
    }
}

/// Unsigned code value for `weight` relative to `zero_point`.
#[inline]
pub fn weight_to_value(weight: u8, zero_point: u8) -> u32 {
    zigzag(wrapped_delta(weight, zero_point))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unzigzag_table() {
        let deltas: Vec<i32> = (0..8).map(unzigzag).collect();
        assert_eq!(deltas, vec![0, -1, 1, -2, 2, -3, 3, -4]);
        assert_eq!(unzigzag(15), -8);
    }

    #[test]
    fn test_reconstruct_examples() {
        assert_eq!(reconstruct(1, 8), 7);
        assert_eq!(reconstruct(0, 8), 8);
        assert_eq!(reconstruct(5, 8), 5);
    }

    #[test]
    fn test_reconstruct_wraps() {
        // 15 + 1 wraps to 0; 0 - 1 wraps to 15.
        assert_eq!(reconstruct(2, 15), 0);
        assert_eq!(reconstruct(1, 0), 15);
    }

    #[test]
    fn test_all_weights_all_zero_points() {
        for zp in 0..16u8 {
            for w in 0..16u8 {
                let v = weight_to_value(w, zp);
                assert!(v <= MAX_DELTA);
                assert_eq!(reconstruct(v, zp), w, "w={w} zp={zp}");
            }
        }
    }

    #[test]
    fn test_zigzag_inverse() {
        for d in -8..=7 {
            assert_eq!(unzigzag(zigzag(d)), d);
        }
    }
}
