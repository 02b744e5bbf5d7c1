//! JSON ingestion for the property store.
//!
//! Raw `serde_json` values are coerced per declared column type. A value
//! that cannot be coerced tombstones the column at that position and the
//! call reports `false`; it never aborts a batch on its own.

use super::PropertyStore;
use crate::value::{date_string_to_epoch_seconds, DataType};
use serde_json::Value;

impl PropertyStore {
    /// Sets one property from a raw JSON value, coercing per the declared
    /// column type:
    ///
    /// - `boolean` accepts JSON booleans only.
    /// - `integer` accepts signed integers; unsigned values are bit-cast.
    /// - `double` accepts integers and floats.
    /// - `date` additionally accepts ISO-8601 strings.
    /// - `string` accepts JSON strings only.
    /// - List kinds accept arrays of the right element shape; elements of
    ///   the wrong shape are skipped.
    ///
    /// On any coercion failure the column is tombstoned at `position` and
    /// the call returns `false`. An undeclared property returns `false`
    /// without touching any column.
    pub fn set_property_from_json(&mut self, key: &str, position: u64, raw: &Value) -> bool {
        let Some(tag) = self.property_type(key) else {
            return false;
        };
        let stored = match tag {
            DataType::Boolean => raw
                .as_bool()
                .is_some_and(|v| self.set_boolean(key, position, v)),
            DataType::Integer => {
                json_integer(raw).is_some_and(|v| self.set_integer(key, position, v))
            }
            DataType::Double => {
                json_double(raw).is_some_and(|v| self.set_double(key, position, v))
            }
            DataType::Date => json_date(raw).is_some_and(|v| self.set_double(key, position, v)),
            DataType::String => raw
                .as_str()
                .is_some_and(|v| self.set_string(key, position, v.to_string())),
            DataType::BooleanList => raw.as_array().is_some_and(|items| {
                let values = items.iter().filter_map(Value::as_bool).collect();
                self.set_boolean_list(key, position, values)
            }),
            DataType::IntegerList => raw.as_array().is_some_and(|items| {
                let values = items.iter().filter_map(json_integer).collect();
                self.set_integer_list(key, position, values)
            }),
            DataType::DoubleList => raw.as_array().is_some_and(|items| {
                let values = items.iter().filter_map(json_double).collect();
                self.set_double_list(key, position, values)
            }),
            DataType::DateList => raw.as_array().is_some_and(|items| {
                let values = items.iter().filter_map(json_date).collect();
                self.set_double_list(key, position, values)
            }),
            DataType::StringList => raw.as_array().is_some_and(|items| {
                let values = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                self.set_string_list(key, position, values)
            }),
        };
        if !stored {
            // The value was invalid for the declared type; leave the slot unset.
            self.delete_property(key, position);
        }
        stored
    }

    /// Applies every entry of a JSON object as a property write.
    ///
    /// Returns `true` only if every entry is declared in the schema and
    /// coerces cleanly. Entries are applied as they are visited; a failure
    /// does not roll back earlier writes.
    pub fn set_properties_from_json(
        &mut self,
        position: u64,
        object: &serde_json::Map<String, Value>,
    ) -> bool {
        let mut all_applied = true;
        for (key, raw) in object {
            if !self.set_property_from_json(key, position, raw) {
                all_applied = false;
            }
        }
        all_applied
    }
}

fn json_integer(raw: &Value) -> Option<i64> {
    if let Some(v) = raw.as_i64() {
        return Some(v);
    }
    // Unsigned values are not allowed; convert to signed via bit-cast.
    raw.as_u64().map(|v| v as i64)
}

fn json_double(raw: &Value) -> Option<f64> {
    if let Some(v) = raw.as_i64() {
        return Some(v as f64);
    }
    if let Some(v) = raw.as_u64() {
        return Some((v as i64) as f64);
    }
    raw.as_f64()
}

fn json_date(raw: &Value) -> Option<f64> {
    if let Some(v) = json_double(raw) {
        return Some(v);
    }
    raw.as_str().and_then(date_string_to_epoch_seconds)
}
