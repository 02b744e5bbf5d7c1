//! External id codec.
//!
//! A 64-bit external id encodes, from low to high bits: the shard index,
//! the 16-bit entity type id, and the within-shard position. Clients treat
//! external ids as opaque; only this module reinterprets their bits.

use crate::error::{Error, Result};
use std::hash::{Hash, Hasher};

/// Bits reserved for the shard index.
pub const SHARD_BITS: u32 = 10;
/// Bits reserved for the entity type id.
pub const TYPE_BITS: u32 = 16;
/// Bits left for the within-shard position.
pub const POSITION_BITS: u32 = 64 - SHARD_BITS - TYPE_BITS;

/// Highest representable shard count.
pub const MAX_SHARDS: u64 = 1 << SHARD_BITS;
/// First position that no longer fits in the position field.
pub const MAX_POSITION: u64 = 1 << POSITION_BITS;

const SHARD_MASK: u64 = MAX_SHARDS - 1;
const TYPE_MASK: u64 = (1 << TYPE_BITS) - 1;

/// Packs `(shard, type, position)` into an external id.
///
/// # Errors
///
/// Returns `Error::Overflow` when `position` does not fit in the position
/// field. Shard and type widths are enforced by their integer types.
pub fn pack(shard_id: u16, type_id: u16, position: u64) -> Result<u64> {
    if position >= MAX_POSITION {
        return Err(Error::Overflow(format!(
            "position {position} exceeds {MAX_POSITION}"
        )));
    }
    if u64::from(shard_id) >= MAX_SHARDS {
        return Err(Error::Overflow(format!(
            "shard {shard_id} exceeds {MAX_SHARDS}"
        )));
    }
    Ok((position << (SHARD_BITS + TYPE_BITS))
        | (u64::from(type_id) << SHARD_BITS)
        | u64::from(shard_id))
}

/// Extracts the shard index from an external id.
#[inline]
#[must_use]
pub fn shard_of(external_id: u64) -> u16 {
    (external_id & SHARD_MASK) as u16
}

/// Extracts the entity type id from an external id.
#[inline]
#[must_use]
pub fn type_of(external_id: u64) -> u16 {
    ((external_id >> SHARD_BITS) & TYPE_MASK) as u16
}

/// Extracts the within-shard position from an external id.
#[inline]
#[must_use]
pub fn position_of(external_id: u64) -> u64 {
    external_id >> (SHARD_BITS + TYPE_BITS)
}

/// Calculates the owning shard for a node key.
///
/// The mapping must be stable across the life of the graph: every caller
/// that hashes the same key gets the same shard.
#[must_use]
pub fn shard_for_key(key: &str, shard_count: u16) -> u16 {
    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() % u64::from(shard_count.max(1))) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pack_unpack_round_trip() {
        let id = pack(3, 7, 42).unwrap();
        assert_eq!(shard_of(id), 3);
        assert_eq!(type_of(id), 7);
        assert_eq!(position_of(id), 42);
    }

    #[test]
    fn test_pack_position_overflow() {
        assert!(pack(0, 1, MAX_POSITION).is_err());
        assert!(pack(0, 1, MAX_POSITION - 1).is_ok());
    }

    #[test]
    fn test_type_zero_is_representable_sentinel() {
        let id = pack(0, 0, 0).unwrap();
        assert_eq!(id, 0);
        assert_eq!(type_of(id), 0);
    }

    #[test]
    fn test_shard_for_key_is_stable_and_in_range() {
        for key in ["helene", "max", "", "a-much-longer-key-with-detail"] {
            let first = shard_for_key(key, 4);
            let second = shard_for_key(key, 4);
            assert_eq!(first, second);
            assert!(first < 4);
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip(shard in 0u16..1024, type_id in 0u16.., position in 0u64..MAX_POSITION) {
            let id = pack(shard, type_id, position).unwrap();
            prop_assert_eq!(shard_of(id), shard);
            prop_assert_eq!(type_of(id), type_id);
            prop_assert_eq!(position_of(id), position);
        }

        #[test]
        fn prop_ids_are_distinct_per_position(shard in 0u16..1024, type_id in 1u16.., a in 0u64..MAX_POSITION, b in 0u64..MAX_POSITION) {
            prop_assume!(a != b);
            let left = pack(shard, type_id, a).unwrap();
            let right = pack(shard, type_id, b).unwrap();
            prop_assert_ne!(left, right);
        }
    }
}
