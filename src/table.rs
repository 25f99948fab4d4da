//! Fixed-capacity open-addressed aggregate tables.
//!
//! Each worker thread owns one table per enumeration order. The table maps a
//! candidate key to a fixed-width `f64` aggregate vector stored inline next to
//! the key slots, so the enumeration hot path touches two contiguous arrays
//! and never rehashes or reallocates.

use crate::error::{LensError, Result};
use crate::key::CandidateKey;
use crate::ops::AggregationOp;

/// An open-addressed hash map from candidate keys to fixed-width aggregate
/// vectors, with capacity fixed at construction.
///
/// Linear probing on the low bits of the key's finalized hash; empty slots
/// hold the key type's reserved sentinel. The table never resizes: callers
/// size it to at least the number of distinct candidates their shard can
/// produce, and an insert into a full table is a programming error surfaced
/// as [`LensError::CapacityExceeded`].
#[derive(Debug)]
pub struct FixedAggregateTable<K> {
    keys: Vec<K>,
    values: Vec<f64>,
    width: usize,
    mask: usize,
    len: usize,
}

impl<K: CandidateKey> FixedAggregateTable<K> {
    /// Creates a table with at least `min_slots` slots (rounded up to a power
    /// of two, floored at 64) holding `width` aggregates per key.
    pub fn with_capacity(min_slots: usize, width: usize) -> Self {
        let capacity = min_slots.max(64).next_power_of_two();
        FixedAggregateTable {
            keys: vec![K::EMPTY; capacity],
            values: vec![0.0; capacity * width],
            width,
            mask: capacity - 1,
            len: 0,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no candidates.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slot capacity.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Looks up the aggregate vector stored for `key`.
    pub fn get(&self, key: K) -> Option<&[f64]> {
        let mut slot = (key.slot_hash() as usize) & self.mask;
        for _ in 0..=self.mask {
            let occupant = self.keys[slot];
            if occupant == K::EMPTY {
                return None;
            }
            if occupant == key {
                return Some(&self.values[slot * self.width..][..self.width]);
            }
            slot = (slot + 1) & self.mask;
        }
        None
    }

    /// Folds one row's aggregate vector into the entry for `key`.
    ///
    /// On first sight the row vector is copied in; afterwards it is combined
    /// pointwise under `ops`.
    pub fn combine_or_insert(&mut self, key: K, row: &[f64], ops: &[AggregationOp]) -> Result<()> {
        debug_assert_eq!(row.len(), self.width);
        debug_assert!(key != K::EMPTY);
        let mut slot = (key.slot_hash() as usize) & self.mask;
        for _ in 0..=self.mask {
            let occupant = self.keys[slot];
            if occupant == K::EMPTY {
                self.keys[slot] = key;
                self.values[slot * self.width..][..self.width].copy_from_slice(row);
                self.len += 1;
                return Ok(());
            }
            if occupant == key {
                let acc = &mut self.values[slot * self.width..][..self.width];
                AggregationOp::combine_vector(ops, acc, row);
                return Ok(());
            }
            slot = (slot + 1) & self.mask;
        }
        Err(LensError::CapacityExceeded {
            capacity: self.capacity(),
        })
    }

    /// Iterates over every occupied slot as `(key, aggregate vector)`.
    pub fn iter(&self) -> impl Iterator<Item = (K, &[f64])> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter(|(_, k)| **k != K::EMPTY)
            .map(move |(i, k)| (*k, &self.values[i * self.width..][..self.width]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{ArrayKey, PackedKey};

    const SUM2: [AggregationOp; 2] = [AggregationOp::Sum, AggregationOp::Sum];

    #[test]
    fn test_insert_then_get() {
        let mut table: FixedAggregateTable<PackedKey> = FixedAggregateTable::with_capacity(64, 2);
        let key = PackedKey::from_two(3, 9);
        table.combine_or_insert(key, &[1.0, 0.5], &SUM2).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(key), Some(&[1.0, 0.5][..]));
        assert_eq!(table.get(PackedKey::from_one(3)), None);
    }

    #[test]
    fn test_repeated_keys_combine() {
        let mut table: FixedAggregateTable<PackedKey> = FixedAggregateTable::with_capacity(64, 2);
        let key = PackedKey::from_two(9, 3);
        table.combine_or_insert(key, &[1.0, 1.0], &SUM2).unwrap();
        table
            .combine_or_insert(PackedKey::from_two(3, 9), &[2.0, 0.0], &SUM2)
            .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(key), Some(&[3.0, 1.0][..]));
    }

    #[test]
    fn test_min_max_ops_combine() {
        let ops = [AggregationOp::Min, AggregationOp::Max];
        let mut table: FixedAggregateTable<ArrayKey> = FixedAggregateTable::with_capacity(64, 2);
        let key = ArrayKey::from_one(5);
        table.combine_or_insert(key, &[4.0, 4.0], &ops).unwrap();
        table.combine_or_insert(key, &[2.0, 7.0], &ops).unwrap();

        assert_eq!(table.get(key), Some(&[2.0, 7.0][..]));
    }

    #[test]
    fn test_collisions_survive_linear_probing() {
        // Small table, many keys: adjacent slots must chain correctly.
        let mut table: FixedAggregateTable<PackedKey> = FixedAggregateTable::with_capacity(64, 1);
        for code in 1..=48u32 {
            table
                .combine_or_insert(PackedKey::from_one(code), &[code as f64], &[AggregationOp::Sum])
                .unwrap();
        }
        for code in 1..=48u32 {
            assert_eq!(
                table.get(PackedKey::from_one(code)),
                Some(&[code as f64][..])
            );
        }
        assert_eq!(table.len(), 48);
    }

    #[test]
    fn test_full_table_reports_capacity_exceeded() {
        let mut table: FixedAggregateTable<PackedKey> = FixedAggregateTable::with_capacity(64, 1);
        for code in 1..=64u32 {
            table
                .combine_or_insert(PackedKey::from_one(code), &[1.0], &[AggregationOp::Sum])
                .unwrap();
        }
        let err = table
            .combine_or_insert(PackedKey::from_one(65), &[1.0], &[AggregationOp::Sum])
            .unwrap_err();
        assert!(matches!(err, LensError::CapacityExceeded { capacity: 64 }));

        // Existing keys still combine once the table is full.
        table
            .combine_or_insert(PackedKey::from_one(64), &[1.0], &[AggregationOp::Sum])
            .unwrap();
        assert_eq!(table.get(PackedKey::from_one(64)), Some(&[2.0][..]));
    }

    #[test]
    fn test_iter_yields_every_entry() {
        let mut table: FixedAggregateTable<ArrayKey> = FixedAggregateTable::with_capacity(64, 1);
        for code in [4u32, 11, 23] {
            table
                .combine_or_insert(ArrayKey::from_one(code), &[1.0], &[AggregationOp::Sum])
                .unwrap();
        }
        let mut seen: Vec<u32> = table.iter().map(|(k, _)| k.first()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![4, 11, 23]);
    }
}
