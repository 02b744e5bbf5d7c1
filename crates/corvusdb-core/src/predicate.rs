//! Predicate evaluation kernel.
//!
//! Comparisons over scalars, strings, and lists. Null checks are handled by
//! the find/filter pipelines against the tombstone bitmaps, never here; any
//! operation a kernel does not understand evaluates to `false`.

use serde::{Deserialize, Serialize};

/// Comparison operator carried by find/filter requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// A == B
    Eq,
    /// A != B
    Neq,
    /// A > B
    Gt,
    /// A >= B
    Gte,
    /// A < B
    Lt,
    /// A <= B
    Lte,
    /// A is null
    IsNull,
    /// A starts with B
    StartsWith,
    /// A contains B
    Contains,
    /// A ends with B
    EndsWith,
    /// A is not null
    NotIsNull,
    /// A does not start with B
    NotStartsWith,
    /// A does not contain B
    NotContains,
    /// A does not end with B
    NotEndsWith,
    /// Unrecognized operation; never matches.
    Unknown,
}

impl Operation {
    /// Parses the external operator name (case-insensitive).
    ///
    /// Unrecognized names map to `Unknown` rather than failing, so a bad
    /// operator yields an empty result instead of an error.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "EQ" => Self::Eq,
            "NEQ" => Self::Neq,
            "GT" => Self::Gt,
            "GTE" => Self::Gte,
            "LT" => Self::Lt,
            "LTE" => Self::Lte,
            "IS_NULL" => Self::IsNull,
            "STARTS_WITH" => Self::StartsWith,
            "CONTAINS" => Self::Contains,
            "ENDS_WITH" => Self::EndsWith,
            "NOT_IS_NULL" => Self::NotIsNull,
            "NOT_STARTS_WITH" => Self::NotStartsWith,
            "NOT_CONTAINS" => Self::NotContains,
            "NOT_ENDS_WITH" => Self::NotEndsWith,
            _ => Self::Unknown,
        }
    }

    /// True for `IS_NULL` / `NOT_IS_NULL`, which bypass the kernels.
    #[must_use]
    pub fn is_null_check(self) -> bool {
        matches!(self, Self::IsNull | Self::NotIsNull)
    }
}

/// Evaluates a comparison over a totally ordered scalar.
pub fn evaluate<T: PartialOrd>(operation: Operation, a: &T, b: &T) -> bool {
    match operation {
        Operation::Eq => a == b,
        Operation::Neq => a != b,
        Operation::Gt => a > b,
        Operation::Gte => a >= b,
        Operation::Lt => a < b,
        Operation::Lte => a <= b,
        _ => false,
    }
}

/// Evaluates a comparison over booleans.
///
/// `GT(a, b)` is `a && !b`, `LT(a, b)` is `!a && b`.
#[must_use]
pub fn evaluate_boolean(operation: Operation, a: bool, b: bool) -> bool {
    match operation {
        Operation::Eq => a == b,
        Operation::Neq => a != b,
        Operation::Gt => a && !b,
        Operation::Gte => a || !b,
        Operation::Lt => !a && b,
        Operation::Lte => !a || b,
        _ => false,
    }
}

/// Evaluates a comparison over strings, including the substring family.
#[must_use]
pub fn evaluate_string(operation: Operation, a: &str, b: &str) -> bool {
    match operation {
        Operation::Eq => a == b,
        Operation::Neq => a != b,
        Operation::Gt => a > b,
        Operation::Gte => a >= b,
        Operation::Lt => a < b,
        Operation::Lte => a <= b,
        Operation::StartsWith => a.starts_with(b),
        Operation::Contains => a.contains(b),
        Operation::EndsWith => a.ends_with(b),
        Operation::NotStartsWith => !a.starts_with(b),
        Operation::NotContains => !a.contains(b),
        Operation::NotEndsWith => !a.ends_with(b),
        _ => false,
    }
}

/// Evaluates a comparison over lists.
///
/// `EQ`/`NEQ` compare elementwise; `GT`/`LT` compare lengths with the
/// `GTE`/`LTE` variants admitting elementwise equality; `STARTS_WITH` and
/// `ENDS_WITH` are prefix/suffix checks on the outer list; `CONTAINS` is
/// multiset inclusion of `b` in `a`.
pub fn evaluate_list<T: PartialEq>(operation: Operation, a: &[T], b: &[T]) -> bool {
    match operation {
        Operation::Eq => a == b,
        Operation::Neq => a != b,
        Operation::Gt => a.len() > b.len(),
        Operation::Gte => a.len() > b.len() || a == b,
        Operation::Lt => a.len() < b.len(),
        Operation::Lte => a.len() < b.len() || a == b,
        Operation::StartsWith => a.len() >= b.len() && a[..b.len()] == *b,
        Operation::EndsWith => a.len() >= b.len() && a[a.len() - b.len()..] == *b,
        Operation::Contains => multiset_includes(a, b),
        Operation::NotStartsWith => !(a.len() >= b.len() && a[..b.len()] == *b),
        Operation::NotEndsWith => !(a.len() >= b.len() && a[a.len() - b.len()..] == *b),
        Operation::NotContains => !multiset_includes(a, b),
        _ => false,
    }
}

/// Evaluates a comparison over two property values of the same kind.
///
/// Mismatched kinds (including either side being null) evaluate to `false`;
/// numeric promotion happens before values reach this kernel.
#[must_use]
pub fn evaluate_values(
    operation: Operation,
    a: &crate::value::PropertyValue,
    b: &crate::value::PropertyValue,
) -> bool {
    use crate::value::PropertyValue as V;
    match (a, b) {
        (V::Boolean(x), V::Boolean(y)) => evaluate_boolean(operation, *x, *y),
        (V::Integer(x), V::Integer(y)) => evaluate(operation, x, y),
        (V::Double(x), V::Double(y)) => evaluate(operation, x, y),
        (V::String(x), V::String(y)) => evaluate_string(operation, x, y),
        (V::BooleanList(x), V::BooleanList(y)) => evaluate_list(operation, x, y),
        (V::IntegerList(x), V::IntegerList(y)) => evaluate_list(operation, x, y),
        (V::DoubleList(x), V::DoubleList(y)) => evaluate_list(operation, x, y),
        (V::StringList(x), V::StringList(y)) => evaluate_list(operation, x, y),
        _ => false,
    }
}

/// Multiset inclusion: every element of `b` occurs in `a` at least as many
/// times as it occurs in `b`.
fn multiset_includes<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    let mut used = vec![false; a.len()];
    'outer: for needle in b {
        for (slot, candidate) in a.iter().enumerate() {
            if !used[slot] && candidate == needle {
                used[slot] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_from_name() {
        assert_eq!(Operation::from_name("eq"), Operation::Eq);
        assert_eq!(Operation::from_name("NOT_ENDS_WITH"), Operation::NotEndsWith);
        assert_eq!(Operation::from_name("REGEX"), Operation::Unknown);
    }

    #[test]
    fn test_scalar_ordering() {
        assert!(evaluate(Operation::Gt, &5i64, &3i64));
        assert!(evaluate(Operation::Lte, &3i64, &3i64));
        assert!(!evaluate(Operation::Eq, &2.5f64, &2.6f64));
        assert!(!evaluate(Operation::StartsWith, &1i64, &1i64));
    }

    #[test]
    fn test_boolean_ordering() {
        assert!(evaluate_boolean(Operation::Gt, true, false));
        assert!(!evaluate_boolean(Operation::Gt, false, true));
        assert!(evaluate_boolean(Operation::Lt, false, true));
        assert!(!evaluate_boolean(Operation::Lt, true, true));
    }

    #[test]
    fn test_string_family() {
        assert!(evaluate_string(Operation::StartsWith, "graph", "gr"));
        assert!(evaluate_string(Operation::Contains, "graph", "rap"));
        assert!(evaluate_string(Operation::EndsWith, "graph", "ph"));
        assert!(evaluate_string(Operation::NotContains, "graph", "xyz"));
        assert!(evaluate_string(Operation::Lt, "apple", "banana"));
        assert!(!evaluate_string(Operation::Unknown, "a", "a"));
    }

    #[test]
    fn test_list_length_ordering() {
        let long = vec![1, 2, 3];
        let short = vec![9];
        assert!(evaluate_list(Operation::Gt, &long, &short));
        assert!(evaluate_list(Operation::Lt, &short, &long));
        assert!(evaluate_list(Operation::Gte, &long, &long));
        assert!(evaluate_list(Operation::Lte, &long, &long));
        assert!(!evaluate_list(Operation::Gte, &short, &long));
    }

    #[test]
    fn test_list_prefix_suffix() {
        let list = vec![1, 2, 3, 4];
        assert!(evaluate_list(Operation::StartsWith, &list, &[1, 2]));
        assert!(evaluate_list(Operation::EndsWith, &list, &[3, 4]));
        assert!(!evaluate_list(Operation::StartsWith, &list, &[2]));
        assert!(evaluate_list(Operation::NotStartsWith, &list, &[2]));
        // b longer than a can never be a prefix
        assert!(!evaluate_list(Operation::StartsWith, &[1], &[1, 2]));
    }

    #[test]
    fn test_list_multiset_contains() {
        let a = vec![1, 2, 2, 3];
        assert!(evaluate_list(Operation::Contains, &a, &[2, 2]));
        assert!(!evaluate_list(Operation::Contains, &a, &[2, 2, 2]));
        assert!(evaluate_list(Operation::Contains, &a, &[]));
        assert!(evaluate_list(Operation::NotContains, &a, &[5]));
    }

    #[test]
    fn test_list_works_unsorted() {
        let a = vec![3, 1, 2];
        assert!(evaluate_list(Operation::Contains, &a, &[2, 3]));
    }
}
