//! Core type definitions shared by the codec and the pipeline model.

use serde::{Deserialize, Serialize};

/// Width of the per-group mode flag in bits.
pub const MODE_FLAG_BITS: u32 = 2;

/// Width of a raw fallback field in bits.
pub const RAW_FIELD_BITS: u32 = 4;

/// Number of distinct 4-bit weight values.
pub const WEIGHT_LEVELS: u8 = 16;

/// Rice parameter selecting the remainder width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiceK {
    /// One remainder bit.
    K1,
    /// Two remainder bits.
    K2,
}

impl RiceK {
    /// Remainder width in bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            RiceK::K1 => 1,
            RiceK::K2 => 2,
        }
    }

    /// Table index for per-k lookup structures.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            RiceK::K1 => 0,
            RiceK::K2 => 1,
        }
    }
}

/// Coding mode of a group, selected by its 2-bit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodingMode {
    /// Golomb-Rice codes with the given parameter.
    Rice(RiceK),
    /// Fixed-width 4-bit fields.
    Raw,
}

impl CodingMode {
    /// Decode a 2-bit mode flag.
    ///
    /// `11` is reserved and decodes as raw fallback.
    pub fn from_flag(flag: u8) -> Self {
        match flag & 0b11 {
            0b00 => CodingMode::Rice(RiceK::K1),
            0b01 => CodingMode::Rice(RiceK::K2),
            _ => CodingMode::Raw,
        }
    }

    /// The flag value the encoder writes for this mode.
    pub fn flag(self) -> u8 {
        match self {
            CodingMode::Rice(RiceK::K1) => 0b00,
            CodingMode::Rice(RiceK::K2) => 0b01,
            CodingMode::Raw => 0b10,
        }
    }

    /// Get mode name as string.
    pub fn name(self) -> &'static str {
        match self {
            CodingMode::Rice(RiceK::K1) => "rice-k1",
            CodingMode::Rice(RiceK::K2) => "rice-k2",
            CodingMode::Raw => "raw",
        }
    }
}

impl std::fmt::Display for CodingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which path produced a decoded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodePath {
    /// Single lookup on the top window bits.
    Fast,
    /// Leading-ones count over the full quotient window.
    Slow,
    /// Fixed-width fallback field.
    Raw,
}

/// Per-group metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetaRecord {
    /// Byte offset of the group's bitstream in the byte cache.
    pub byte_offset: u32,
    /// Additive zero point, 0..16.
    pub zero_point: u8,
}

impl MetaRecord {
    /// Create a new metadata record.
    pub const fn new(byte_offset: u32, zero_point: u8) -> Self {
        Self {
            byte_offset,
            zero_point,
        }
    }
}

/// A contiguous range of groups handed to the decoder bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodeTask {
    /// First group id.
    pub base: u32,
    /// Number of groups.
    pub count: u32,
}

impl DecodeTask {
    /// Create a new decode task.
    pub const fn new(base: u32, count: u32) -> Self {
        Self { base, count }
    }

    /// Task covering tile `tile` of an array with dimension `array_dim`.
    pub fn for_tile(tile: u32, array_dim: usize) -> Self {
        let dim = array_dim as u32;
        Self::new(tile * dim, dim)
    }

    /// Number of groups lane `lane` of `lanes` decodes.
    ///
    /// The remainder goes to the lowest-indexed lanes first, which matches
    /// the `group_id mod lanes` striping.
    pub fn share(&self, lane: usize, lanes: usize) -> u32 {
        let lanes_u = lanes as u32;
        let extra = u32::from((lane as u32) < self.count % lanes_u);
        self.count / lanes_u + extra
    }

    /// Group id of lane `lane`'s `wave`-th group.
    #[inline]
    pub fn group_for(&self, lane: usize, wave: u32, lanes: usize) -> u32 {
        self.base + wave * lanes as u32 + lane as u32
    }

    /// All group ids assigned to `lane`, in decode order.
    pub fn lane_groups(&self, lane: usize, lanes: usize) -> impl Iterator<Item = u32> + '_ {
        (0..self.share(lane, lanes)).map(move |wave| self.group_for(lane, wave, lanes))
    }
}

/// One physical side of a double buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StagingBank {
    A,
    B,
}

impl StagingBank {
    /// The other bank.
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            StagingBank::A => StagingBank::B,
            StagingBank::B => StagingBank::A,
        }
    }

    /// Storage index.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            StagingBank::A => 0,
            StagingBank::B => 1,
        }
    }
}

/// The shared role flag of the double buffers.
///
/// Holds only the produce side; the consume side is always its complement,
/// so the two roles can never coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankRole {
    produce: StagingBank,
}

impl BankRole {
    /// Initial role: decoder produces into A, compute side drains B.
    pub const fn new() -> Self {
        Self {
            produce: StagingBank::A,
        }
    }

    /// Bank the decoder writes.
    #[inline]
    pub const fn produce(&self) -> StagingBank {
        self.produce
    }

    /// Bank the loaders read.
    #[inline]
    pub const fn consume(&self) -> StagingBank {
        self.produce.other()
    }

    /// Swap producer and consumer.
    #[inline]
    pub fn flip(&mut self) {
        self.produce = self.produce.other();
    }
}

impl Default for BankRole {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-column metadata handed to the compute array before a tile's rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileMeta {
    /// Zero point of each group (array column).
    pub zero_points: Vec<u8>,
    /// Scale of each column.
    pub scales: Vec<f32>,
}

impl TileMeta {
    /// Create zero-filled metadata for an array of dimension `dim`.
    pub fn zeroed(dim: usize) -> Self {
        Self {
            zero_points: vec![0; dim],
            scales: vec![0.0; dim],
        }
    }

    /// Array dimension covered.
    pub fn len(&self) -> usize {
        self.zero_points.len()
    }

    /// Whether the vectors are empty.
    pub fn is_empty(&self) -> bool {
        self.zero_points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        assert_eq!(CodingMode::from_flag(0b00), CodingMode::Rice(RiceK::K1));
        assert_eq!(CodingMode::from_flag(0b01), CodingMode::Rice(RiceK::K2));
        assert_eq!(CodingMode::from_flag(0b10), CodingMode::Raw);
        assert_eq!(CodingMode::from_flag(0b11), CodingMode::Raw);

        for mode in [
            CodingMode::Rice(RiceK::K1),
            CodingMode::Rice(RiceK::K2),
            CodingMode::Raw,
        ] {
            assert_eq!(CodingMode::from_flag(mode.flag()), mode);
        }
    }

    #[test]
    fn test_share_remainder_to_low_lanes() {
        let task = DecodeTask::new(0, 10);
        let shares: Vec<u32> = (0..4).map(|lane| task.share(lane, 4)).collect();
        assert_eq!(shares, vec![3, 3, 2, 2]);
        assert_eq!(shares.iter().sum::<u32>(), 10);
    }

    #[test]
    fn test_lane_groups_striping() {
        let task = DecodeTask::new(100, 7);
        let groups: Vec<u32> = task.lane_groups(1, 3).collect();
        assert_eq!(groups, vec![101, 104]);
        let groups: Vec<u32> = task.lane_groups(0, 3).collect();
        assert_eq!(groups, vec![100, 103, 106]);
    }

    #[test]
    fn test_task_for_tile() {
        assert_eq!(DecodeTask::for_tile(0, 8), DecodeTask::new(0, 8));
        assert_eq!(DecodeTask::for_tile(3, 8), DecodeTask::new(24, 8));
    }

    #[test]
    fn test_role_flip_twice_restores() {
        let mut role = BankRole::new();
        let original = role;
        assert_eq!(role.produce(), StagingBank::A);
        assert_eq!(role.consume(), StagingBank::B);

        role.flip();
        assert_eq!(role.produce(), StagingBank::B);
        assert_eq!(role.consume(), StagingBank::A);

        role.flip();
        assert_eq!(role, original);
    }

    #[test]
    fn test_roles_always_complementary() {
        let mut role = BankRole::default();
        for _ in 0..5 {
            assert_ne!(role.produce(), role.consume());
            role.flip();
        }
    }
}
