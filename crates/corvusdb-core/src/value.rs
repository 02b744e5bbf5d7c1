//! Property value model.
//!
//! Property values form a small sum type with a fixed tag order that matches
//! the column kinds used by the property store and the JSON coercion rules.
//! Dates are stored and compared as `f64` seconds since the epoch; date
//! lists as `Vec<f64>`.

use serde::{Deserialize, Serialize};

/// A single property value.
///
/// The variant order is stable: null, bool, int64, double, string, then the
/// four list kinds. `date` values live in the `Double` variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Unset / null.
    #[default]
    Null,
    /// Boolean scalar.
    Boolean(bool),
    /// 64-bit signed integer scalar.
    Integer(i64),
    /// 64-bit float scalar; also carries dates as epoch seconds.
    Double(f64),
    /// String scalar.
    String(String),
    /// List of booleans.
    BooleanList(Vec<bool>),
    /// List of integers.
    IntegerList(Vec<i64>),
    /// List of doubles; also carries date lists.
    DoubleList(Vec<f64>),
    /// List of strings.
    StringList(Vec<String>),
}

impl PropertyValue {
    /// Returns true for the null variant.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the carried kind, for error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::BooleanList(_) => "boolean_list",
            Self::IntegerList(_) => "integer_list",
            Self::DoubleList(_) => "double_list",
            Self::StringList(_) => "string_list",
        }
    }

    /// Returns the boolean payload if this is a boolean.
    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload if this is an integer.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the double payload if this is a double.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the string payload if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Declared column type of a property, as held in the schema catalog.
///
/// Tag values are stable and match the order used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DataType {
    /// Boolean column.
    Boolean = 1,
    /// Integer column.
    Integer = 2,
    /// Double column.
    Double = 3,
    /// String column.
    String = 4,
    /// Boolean list column.
    BooleanList = 5,
    /// Integer list column.
    IntegerList = 6,
    /// Double list column.
    DoubleList = 7,
    /// String list column.
    StringList = 8,
    /// Date column, stored as doubles.
    Date = 9,
    /// Date list column, stored as double lists.
    DateList = 10,
}

impl DataType {
    /// Parses the external type name (`"boolean"`, `"integer_list"`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "double" => Some(Self::Double),
            "string" => Some(Self::String),
            "boolean_list" => Some(Self::BooleanList),
            "integer_list" => Some(Self::IntegerList),
            "double_list" => Some(Self::DoubleList),
            "string_list" => Some(Self::StringList),
            "date" => Some(Self::Date),
            "date_list" => Some(Self::DateList),
            _ => None,
        }
    }

    /// External type name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::BooleanList => "boolean_list",
            Self::IntegerList => "integer_list",
            Self::DoubleList => "double_list",
            Self::StringList => "string_list",
            Self::Date => "date",
            Self::DateList => "date_list",
        }
    }

    /// The column kind that physically stores this type.
    ///
    /// Dates collapse onto the double columns.
    #[must_use]
    pub fn storage(self) -> Self {
        match self {
            Self::Date => Self::Double,
            Self::DateList => Self::DoubleList,
            other => other,
        }
    }

    /// True for the four list kinds (including date lists).
    #[must_use]
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::BooleanList
                | Self::IntegerList
                | Self::DoubleList
                | Self::StringList
                | Self::DateList
        )
    }
}

/// Promotes a caller-supplied value onto a declared column: integers become
/// doubles for double and date columns, elementwise for the list twins. No
/// other implicit coercion happens.
#[must_use]
pub(crate) fn normalize_for(tag: DataType, value: &PropertyValue) -> PropertyValue {
    match (tag.storage(), value) {
        (DataType::Double, PropertyValue::Integer(v)) => PropertyValue::Double(*v as f64),
        (DataType::DoubleList, PropertyValue::IntegerList(values)) => {
            PropertyValue::DoubleList(values.iter().map(|v| *v as f64).collect())
        }
        _ => value.clone(),
    }
}

/// Total order over property values, used by the sorted filter entry points.
///
/// Same-kind values compare naturally (doubles by partial order, with
/// incomparable pairs treated as equal); different kinds order by their tag
/// position, nulls first.
#[must_use]
pub(crate) fn compare_values(a: &PropertyValue, b: &PropertyValue) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (PropertyValue::Boolean(x), PropertyValue::Boolean(y)) => x.cmp(y),
        (PropertyValue::Integer(x), PropertyValue::Integer(y)) => x.cmp(y),
        (PropertyValue::Double(x), PropertyValue::Double(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (PropertyValue::String(x), PropertyValue::String(y)) => x.cmp(y),
        (PropertyValue::BooleanList(x), PropertyValue::BooleanList(y)) => x.cmp(y),
        (PropertyValue::IntegerList(x), PropertyValue::IntegerList(y)) => x.cmp(y),
        (PropertyValue::DoubleList(x), PropertyValue::DoubleList(y)) => x
            .partial_cmp(y)
            .unwrap_or(Ordering::Equal),
        (PropertyValue::StringList(x), PropertyValue::StringList(y)) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: &PropertyValue) -> u8 {
    match value {
        PropertyValue::Null => 0,
        PropertyValue::Boolean(_) => 1,
        PropertyValue::Integer(_) => 2,
        PropertyValue::Double(_) => 3,
        PropertyValue::String(_) => 4,
        PropertyValue::BooleanList(_) => 5,
        PropertyValue::IntegerList(_) => 6,
        PropertyValue::DoubleList(_) => 7,
        PropertyValue::StringList(_) => 8,
    }
}

/// Converts an ISO-8601 timestamp string to seconds since the epoch.
///
/// Fractional seconds and offsets are honored. Returns `None` for strings
/// that do not parse as RFC 3339.
#[must_use]
pub fn date_string_to_epoch_seconds(raw: &str) -> Option<f64> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.timestamp_millis() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_null() {
        assert!(PropertyValue::default().is_null());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(PropertyValue::Integer(1).kind_name(), "integer");
        assert_eq!(PropertyValue::DoubleList(vec![]).kind_name(), "double_list");
    }

    #[test]
    fn test_data_type_name_round_trip() {
        for name in [
            "boolean",
            "integer",
            "double",
            "string",
            "boolean_list",
            "integer_list",
            "double_list",
            "string_list",
            "date",
            "date_list",
        ] {
            let tag = DataType::from_name(name).unwrap();
            assert_eq!(tag.name(), name);
        }
        assert_eq!(DataType::from_name("decimal"), None);
    }

    #[test]
    fn test_date_storage_collapses_to_double() {
        assert_eq!(DataType::Date.storage(), DataType::Double);
        assert_eq!(DataType::DateList.storage(), DataType::DoubleList);
        assert_eq!(DataType::String.storage(), DataType::String);
    }

    #[test]
    fn test_date_parsing() {
        let epoch = date_string_to_epoch_seconds("1970-01-01T00:00:00Z").unwrap();
        assert!((epoch - 0.0).abs() < f64::EPSILON);

        let with_offset = date_string_to_epoch_seconds("2021-04-01T00:00:00-05:00").unwrap();
        assert!((with_offset - 1_617_253_200.0).abs() < 0.001);

        assert!(date_string_to_epoch_seconds("not-a-date").is_none());
    }

    #[test]
    fn test_serde_untagged_shape() {
        let json = serde_json::to_value(PropertyValue::Integer(42)).unwrap();
        assert_eq!(json, serde_json::json!(42));
        let json = serde_json::to_value(PropertyValue::StringList(vec!["a".into()])).unwrap();
        assert_eq!(json, serde_json::json!(["a"]));
    }
}
