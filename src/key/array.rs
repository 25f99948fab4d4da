//! Array candidate keys for cardinalities beyond the packed 21-bit range.

use super::{mix64, CandidateKey};

/// A set of 1..=3 attribute codes stored as a sorted inline array.
///
/// Used when the attribute cardinality exceeds the packed representation, and
/// always as the canonical key of the controller's merge map (one key type
/// across threads regardless of enumeration mode). Unused trailing slots hold
/// 0; the length field keeps sets of different order distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayKey {
    codes: [u32; 3],
    len: u8,
}

impl ArrayKey {
    /// Constructs a singleton key.
    pub fn from_one(a: u32) -> Self {
        ArrayKey {
            codes: [a, 0, 0],
            len: 1,
        }
    }

    /// Constructs a pair key; the inputs may arrive in either order.
    pub fn from_two(a: u32, b: u32) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        ArrayKey {
            codes: [lo, hi, 0],
            len: 2,
        }
    }

    /// Constructs a triple key; the inputs may arrive in any order.
    pub fn from_three(a: u32, b: u32, c: u32) -> Self {
        let mut codes = [a, b, c];
        codes.sort_unstable();
        ArrayKey { codes, len: 3 }
    }
}

impl CandidateKey for ArrayKey {
    const EMPTY: Self = ArrayKey {
        codes: [0, 0, 0],
        len: 0,
    };

    fn from_one(a: u32) -> Self {
        ArrayKey::from_one(a)
    }

    fn from_two(a: u32, b: u32) -> Self {
        ArrayKey::from_two(a, b)
    }

    fn from_three(a: u32, b: u32, c: u32) -> Self {
        ArrayKey::from_three(a, b, c)
    }

    #[inline]
    fn first(&self) -> u32 {
        self.codes[0]
    }

    #[inline]
    fn second(&self) -> Option<u32> {
        (self.len >= 2).then(|| self.codes[1])
    }

    #[inline]
    fn third(&self) -> Option<u32> {
        (self.len == 3).then(|| self.codes[2])
    }

    #[inline]
    fn order(&self) -> usize {
        self.len as usize
    }

    #[inline]
    fn slot_hash(&self) -> u64 {
        // Members are already sorted, so folding in order keeps the hash
        // independent of construction order.
        let mut h = mix64(self.codes[0] as u64 ^ ((self.len as u64) << 32));
        h = mix64(h ^ self.codes[1] as u64);
        mix64(h ^ self.codes[2] as u64)
    }

    fn to_array(&self) -> ArrayKey {
        *self
    }
}
