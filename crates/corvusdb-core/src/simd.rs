//! SIMD-assisted index collection for numeric property columns.
//!
//! The numeric find path compares a whole column against one value and
//! harvests the positions of the matches. The `wide` crate provides portable
//! 4-lane 64-bit vectors (AVX2/SSE/NEON underneath, scalar where the target
//! has nothing better), so the same code runs everywhere with identical
//! results; the scalar tail covers lengths that are not a multiple of the
//! lane width.

use crate::predicate::Operation;
use wide::{f64x4, i64x4, CmpEq, CmpGe, CmpGt, CmpLe, CmpLt, CmpNe};

const LANES: usize = 4;

/// Collects the indexes of all `values` matching `operation target`.
///
/// Only the six ordering operators participate; any other operation yields
/// no matches. Indexes come back in ascending order.
#[must_use]
pub fn collect_indexes_i64(values: &[i64], operation: Operation, target: i64) -> Vec<u64> {
    if !supported(operation) {
        return Vec::new();
    }
    let mut out = Vec::new();
    let splat = i64x4::splat(target);
    let chunks = values.chunks_exact(LANES);
    let tail = chunks.remainder();

    for (chunk_index, chunk) in chunks.enumerate() {
        let lanes = i64x4::from([chunk[0], chunk[1], chunk[2], chunk[3]]);
        // Integer lanes only guarantee eq/gt; the rest are derived.
        let mask = match operation {
            Operation::Eq => lanes.cmp_eq(splat),
            Operation::Neq => !lanes.cmp_eq(splat),
            Operation::Gt => lanes.cmp_gt(splat),
            Operation::Gte => !splat.cmp_gt(lanes),
            Operation::Lt => splat.cmp_gt(lanes),
            Operation::Lte => !lanes.cmp_gt(splat),
            _ => unreachable!("unsupported operations are filtered above"),
        };
        let bits = mask.to_array();
        let base = (chunk_index * LANES) as u64;
        for (lane, bit) in bits.iter().enumerate() {
            if *bit != 0 {
                out.push(base + lane as u64);
            }
        }
    }

    let base = values.len() - tail.len();
    for (offset, value) in tail.iter().enumerate() {
        if crate::predicate::evaluate(operation, value, &target) {
            out.push((base + offset) as u64);
        }
    }
    out
}

/// Collects the indexes of all `values` matching `operation target`.
///
/// Double-precision twin of [`collect_indexes_i64`]. NaN columns behave the
/// way scalar `f64` comparisons do: NaN matches nothing but `NEQ`.
#[must_use]
pub fn collect_indexes_f64(values: &[f64], operation: Operation, target: f64) -> Vec<u64> {
    if !supported(operation) {
        return Vec::new();
    }
    let mut out = Vec::new();
    let splat = f64x4::splat(target);
    let chunks = values.chunks_exact(LANES);
    let tail = chunks.remainder();

    for (chunk_index, chunk) in chunks.enumerate() {
        let lanes = f64x4::from([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let mask = match operation {
            Operation::Eq => lanes.cmp_eq(splat),
            Operation::Neq => lanes.cmp_ne(splat),
            Operation::Gt => lanes.cmp_gt(splat),
            Operation::Gte => lanes.cmp_ge(splat),
            Operation::Lt => lanes.cmp_lt(splat),
            Operation::Lte => lanes.cmp_le(splat),
            _ => unreachable!("unsupported operations are filtered above"),
        };
        let bits = mask.to_array();
        let base = (chunk_index * LANES) as u64;
        for (lane, bit) in bits.iter().enumerate() {
            if bit.to_bits() != 0 {
                out.push(base + lane as u64);
            }
        }
    }

    let base = values.len() - tail.len();
    for (offset, value) in tail.iter().enumerate() {
        if crate::predicate::evaluate(operation, value, &target) {
            out.push((base + offset) as u64);
        }
    }
    out
}

fn supported(operation: Operation) -> bool {
    matches!(
        operation,
        Operation::Eq
            | Operation::Neq
            | Operation::Gt
            | Operation::Gte
            | Operation::Lt
            | Operation::Lte
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scalar_indexes_i64(values: &[i64], operation: Operation, target: i64) -> Vec<u64> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| crate::predicate::evaluate(operation, *v, &target))
            .map(|(i, _)| i as u64)
            .collect()
    }

    fn scalar_indexes_f64(values: &[f64], operation: Operation, target: f64) -> Vec<u64> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| crate::predicate::evaluate(operation, *v, &target))
            .map(|(i, _)| i as u64)
            .collect()
    }

    const ORDERING_OPS: [Operation; 6] = [
        Operation::Eq,
        Operation::Neq,
        Operation::Gt,
        Operation::Gte,
        Operation::Lt,
        Operation::Lte,
    ];

    #[test]
    fn test_i64_eq_collects_positions() {
        let values = vec![5i64, 1, 5, 9, 5, 2, 5];
        assert_eq!(
            collect_indexes_i64(&values, Operation::Eq, 5),
            vec![0, 2, 4, 6]
        );
    }

    #[test]
    fn test_f64_gt_with_unaligned_tail() {
        let values = vec![1.0f64, 10.0, 3.0, 8.5, 2.0];
        assert_eq!(collect_indexes_f64(&values, Operation::Gt, 2.5), vec![1, 2, 3]);
    }

    #[test]
    fn test_unsupported_operation_matches_nothing() {
        let values = vec![1i64, 2, 3];
        assert!(collect_indexes_i64(&values, Operation::StartsWith, 1).is_empty());
        assert!(collect_indexes_f64(&[1.0], Operation::IsNull, 1.0).is_empty());
    }

    #[test]
    fn test_empty_column() {
        assert!(collect_indexes_i64(&[], Operation::Eq, 0).is_empty());
        assert!(collect_indexes_f64(&[], Operation::Eq, 0.0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_i64_matches_scalar_loop(
            values in proptest::collection::vec(-20i64..20, 0..50),
            target in -20i64..20,
            op_index in 0usize..6,
        ) {
            let operation = ORDERING_OPS[op_index];
            prop_assert_eq!(
                collect_indexes_i64(&values, operation, target),
                scalar_indexes_i64(&values, operation, target)
            );
        }

        #[test]
        fn prop_f64_matches_scalar_loop(
            values in proptest::collection::vec(-20.0f64..20.0, 0..50),
            target in -20.0f64..20.0,
            op_index in 0usize..6,
        ) {
            let operation = ORDERING_OPS[op_index];
            prop_assert_eq!(
                collect_indexes_f64(&values, operation, target),
                scalar_indexes_f64(&values, operation, target)
            );
        }
    }
}
