//! Leapfrog triejoin: multi-way intersection of sorted id sequences.
//!
//! Seek cost is amortized `O(1 + log(N_max/N_min))` per step: an exponential
//! probe narrows the range, then a bounded binary search lands on the first
//! value greater than or equal to the target.

/// Seeks the first index in `slice[from..]` whose value is >= `target`.
///
/// Runs an exponential search from `from` to bound the range, then a binary
/// search inside the bound. Returns `slice.len()` when every remaining value
/// is smaller than `target`.
fn leapfrog_seek<T: Ord + Copy>(slice: &[T], from: usize, target: T) -> usize {
    let len = slice.len();
    if from >= len {
        return len;
    }
    if slice[from] >= target {
        return from;
    }

    // Exponential probe: find a window [from + bound/2, from + bound] that
    // brackets the target.
    let mut bound = 1usize;
    while from + bound < len && slice[from + bound] < target {
        bound *= 2;
    }
    let low = from + bound / 2;
    let high = usize::min(from + bound + 1, len);

    low + slice[low..high].partition_point(|value| *value < target)
}

/// Intersects `k` sorted sequences in a single pass.
///
/// Input sequences must be sorted ascending and duplicate-free; the result
/// is the sorted intersection. An empty input list yields an empty result.
#[must_use]
pub fn leapfrog_join<T: Ord + Copy>(mut inputs: Vec<Vec<T>>) -> Vec<T> {
    let mut result = Vec::new();
    if inputs.is_empty() || inputs.iter().any(Vec::is_empty) {
        return result;
    }

    // Order cursors by their first element so the round-robin starts from
    // the smallest sequence head.
    inputs.sort_by(|a, b| a[0].cmp(&b[0]));

    let k = inputs.len();
    let mut cursors = vec![0usize; k];
    let mut max = inputs[k - 1][0];
    let mut at = 0usize;

    loop {
        let value = inputs[at][cursors[at]];
        if value == max {
            result.push(value);
            cursors[at] += 1;
        } else {
            cursors[at] = leapfrog_seek(&inputs[at], cursors[at], max);
        }
        if cursors[at] == inputs[at].len() {
            break;
        }
        max = inputs[at][cursors[at]];
        at = (at + 1) % k;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn naive_intersection(inputs: &[Vec<u64>]) -> Vec<u64> {
        let Some((first, rest)) = inputs.split_first() else {
            return Vec::new();
        };
        let mut acc: BTreeSet<u64> = first.iter().copied().collect();
        for other in rest {
            let set: BTreeSet<u64> = other.iter().copied().collect();
            acc = acc.intersection(&set).copied().collect();
        }
        acc.into_iter().collect()
    }

    #[test]
    fn test_empty_input_list() {
        assert!(leapfrog_join::<u64>(vec![]).is_empty());
    }

    #[test]
    fn test_any_empty_sequence_empties_the_result() {
        assert!(leapfrog_join(vec![vec![1u64, 2], vec![]]).is_empty());
    }

    #[test]
    fn test_three_way_intersection() {
        let result = leapfrog_join(vec![
            vec![0u64, 1, 3, 4, 5, 6, 7, 8, 9, 11],
            vec![0u64, 2, 6, 7, 8, 9],
            vec![2u64, 4, 5, 8, 10],
        ]);
        assert_eq!(result, vec![8]);
    }

    #[test]
    fn test_identical_sequences() {
        let result = leapfrog_join(vec![vec![1u64, 5, 9], vec![1u64, 5, 9]]);
        assert_eq!(result, vec![1, 5, 9]);
    }

    #[test]
    fn test_disjoint_sequences() {
        let result = leapfrog_join(vec![vec![1u64, 3, 5], vec![2u64, 4, 6]]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_seek_lands_on_first_ge() {
        let slice = [1u64, 4, 4, 9, 20, 50];
        assert_eq!(leapfrog_seek(&slice, 0, 4), 1);
        assert_eq!(leapfrog_seek(&slice, 0, 10), 4);
        assert_eq!(leapfrog_seek(&slice, 0, 100), slice.len());
        assert_eq!(leapfrog_seek(&slice, 3, 2), 3);
    }

    proptest! {
        #[test]
        fn prop_matches_naive_intersection(
            raw in proptest::collection::vec(
                proptest::collection::btree_set(0u64..500, 0..60),
                1..5,
            )
        ) {
            let inputs: Vec<Vec<u64>> = raw
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect();
            let expected = naive_intersection(&inputs);
            let actual = leapfrog_join(inputs);
            prop_assert_eq!(actual, expected);
        }
    }
}
