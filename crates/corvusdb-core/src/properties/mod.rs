//! Columnar, type-tagged property storage.
//!
//! One `PropertyStore` exists per entity type (per shard). Each declared
//! property owns a dense column vector of its scalar or list element type
//! plus a tombstone bitmap; a set bit means "unset for this position" no
//! matter what the column holds there. Columns grow on write, and trailing
//! unwritten positions are implicitly deleted.

mod json;

use crate::value::{DataType, PropertyValue};
use roaring::RoaringTreemap;
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// Columnar property storage for one entity type.
#[derive(Debug, Default)]
pub struct PropertyStore {
    types: FxHashMap<String, DataType>,
    deleted: FxHashMap<String, RoaringTreemap>,
    booleans: FxHashMap<String, Vec<bool>>,
    integers: FxHashMap<String, Vec<i64>>,
    doubles: FxHashMap<String, Vec<f64>>,
    strings: FxHashMap<String, Vec<String>>,
    boolean_lists: FxHashMap<String, Vec<Vec<bool>>>,
    integer_lists: FxHashMap<String, Vec<Vec<i64>>>,
    double_lists: FxHashMap<String, Vec<Vec<f64>>>,
    string_lists: FxHashMap<String, Vec<Vec<String>>>,
}

impl PropertyStore {
    /// Creates an empty store with no declared properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every declared property and all stored values.
    pub fn clear(&mut self) {
        self.types.clear();
        self.deleted.clear();
        self.booleans.clear();
        self.integers.clear();
        self.doubles.clear();
        self.strings.clear();
        self.boolean_lists.clear();
        self.integer_lists.clear();
        self.double_lists.clear();
        self.string_lists.clear();
    }

    /// Declared schema: property name to external type name, sorted by name.
    #[must_use]
    pub fn property_types(&self) -> std::collections::BTreeMap<String, String> {
        self.types
            .iter()
            .map(|(key, tag)| (key.clone(), tag.name().to_string()))
            .collect()
    }

    /// Declared type of a property, if any.
    #[must_use]
    pub fn property_type(&self, key: &str) -> Option<DataType> {
        self.types.get(key).copied()
    }

    /// Declares a property with the given type and allocates its column.
    ///
    /// Idempotent when the existing declaration matches; returns `None` when
    /// the property exists with a different type.
    pub fn set_property_type(&mut self, key: &str, tag: DataType) -> Option<DataType> {
        if let Some(existing) = self.types.get(key) {
            if *existing == tag {
                return Some(tag);
            }
            return None;
        }
        self.types.insert(key.to_string(), tag);
        self.deleted.insert(key.to_string(), RoaringTreemap::new());
        self.add_column(key, tag.storage());
        Some(tag)
    }

    /// Removes a property declaration and its column entirely.
    pub fn remove_property_type(&mut self, key: &str) -> bool {
        let Some(tag) = self.types.remove(key) else {
            return false;
        };
        self.deleted.remove(key);
        self.remove_column(key, tag.storage());
        true
    }

    fn add_column(&mut self, key: &str, storage: DataType) {
        match storage {
            DataType::Boolean => {
                self.booleans.insert(key.to_string(), Vec::new());
            }
            DataType::Integer => {
                self.integers.insert(key.to_string(), Vec::new());
            }
            DataType::Double => {
                self.doubles.insert(key.to_string(), Vec::new());
            }
            DataType::String => {
                self.strings.insert(key.to_string(), Vec::new());
            }
            DataType::BooleanList => {
                self.boolean_lists.insert(key.to_string(), Vec::new());
            }
            DataType::IntegerList => {
                self.integer_lists.insert(key.to_string(), Vec::new());
            }
            DataType::DoubleList => {
                self.double_lists.insert(key.to_string(), Vec::new());
            }
            DataType::StringList => {
                self.string_lists.insert(key.to_string(), Vec::new());
            }
            DataType::Date | DataType::DateList => unreachable!("storage() never returns dates"),
        }
    }

    fn remove_column(&mut self, key: &str, storage: DataType) {
        match storage {
            DataType::Boolean => {
                self.booleans.remove(key);
            }
            DataType::Integer => {
                self.integers.remove(key);
            }
            DataType::Double => {
                self.doubles.remove(key);
            }
            DataType::String => {
                self.strings.remove(key);
            }
            DataType::BooleanList => {
                self.boolean_lists.remove(key);
            }
            DataType::IntegerList => {
                self.integer_lists.remove(key);
            }
            DataType::DoubleList => {
                self.double_lists.remove(key);
            }
            DataType::StringList => {
                self.string_lists.remove(key);
            }
            DataType::Date | DataType::DateList => unreachable!("storage() never returns dates"),
        }
    }

    fn storage_of(&self, key: &str) -> Option<DataType> {
        self.types.get(key).map(|tag| tag.storage())
    }

    fn mark_written(&mut self, key: &str, position: u64) {
        if let Some(map) = self.deleted.get_mut(key) {
            map.remove(position);
        }
    }

    /// Sets a boolean value. Fails when the property is not a boolean column.
    pub fn set_boolean(&mut self, key: &str, position: u64, value: bool) -> bool {
        if self.storage_of(key) != Some(DataType::Boolean) {
            return false;
        }
        let Some(column) = self.booleans.get_mut(key) else {
            return false;
        };
        grow_to(column, position, false);
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets an integer value. Fails when the property is not an integer column.
    pub fn set_integer(&mut self, key: &str, position: u64, value: i64) -> bool {
        if self.storage_of(key) != Some(DataType::Integer) {
            return false;
        }
        let Some(column) = self.integers.get_mut(key) else {
            return false;
        };
        grow_to(column, position, 0);
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets a double or date value; both live in the double column.
    pub fn set_double(&mut self, key: &str, position: u64, value: f64) -> bool {
        if self.storage_of(key) != Some(DataType::Double) {
            return false;
        }
        let Some(column) = self.doubles.get_mut(key) else {
            return false;
        };
        grow_to(column, position, 0.0);
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets a string value. Fails when the property is not a string column.
    pub fn set_string(&mut self, key: &str, position: u64, value: String) -> bool {
        if self.storage_of(key) != Some(DataType::String) {
            return false;
        }
        let Some(column) = self.strings.get_mut(key) else {
            return false;
        };
        grow_to(column, position, String::new());
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets a boolean-list value.
    pub fn set_boolean_list(&mut self, key: &str, position: u64, value: Vec<bool>) -> bool {
        if self.storage_of(key) != Some(DataType::BooleanList) {
            return false;
        }
        let Some(column) = self.boolean_lists.get_mut(key) else {
            return false;
        };
        grow_to(column, position, Vec::new());
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets an integer-list value.
    pub fn set_integer_list(&mut self, key: &str, position: u64, value: Vec<i64>) -> bool {
        if self.storage_of(key) != Some(DataType::IntegerList) {
            return false;
        }
        let Some(column) = self.integer_lists.get_mut(key) else {
            return false;
        };
        grow_to(column, position, Vec::new());
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets a double-list or date-list value; both live in the double-list column.
    pub fn set_double_list(&mut self, key: &str, position: u64, value: Vec<f64>) -> bool {
        if self.storage_of(key) != Some(DataType::DoubleList) {
            return false;
        }
        let Some(column) = self.double_lists.get_mut(key) else {
            return false;
        };
        grow_to(column, position, Vec::new());
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets a string-list value.
    pub fn set_string_list(&mut self, key: &str, position: u64, value: Vec<String>) -> bool {
        if self.storage_of(key) != Some(DataType::StringList) {
            return false;
        }
        let Some(column) = self.string_lists.get_mut(key) else {
            return false;
        };
        grow_to(column, position, Vec::new());
        column[position as usize] = value;
        self.mark_written(key, position);
        true
    }

    /// Sets a typed value, dispatching on the declared column type.
    ///
    /// The value kind must match the declaration exactly; integers are not
    /// silently promoted to doubles here (that happens only on the typed
    /// find path).
    pub fn set_value(&mut self, key: &str, position: u64, value: &PropertyValue) -> bool {
        match (self.storage_of(key), value) {
            (Some(DataType::Boolean), PropertyValue::Boolean(v)) => {
                self.set_boolean(key, position, *v)
            }
            (Some(DataType::Integer), PropertyValue::Integer(v)) => {
                self.set_integer(key, position, *v)
            }
            (Some(DataType::Double), PropertyValue::Double(v)) => {
                self.set_double(key, position, *v)
            }
            (Some(DataType::Double), PropertyValue::Integer(v)) => {
                // Dates arrive as either representation.
                self.set_double(key, position, *v as f64)
            }
            (Some(DataType::String), PropertyValue::String(v)) => {
                self.set_string(key, position, v.clone())
            }
            (Some(DataType::BooleanList), PropertyValue::BooleanList(v)) => {
                self.set_boolean_list(key, position, v.clone())
            }
            (Some(DataType::IntegerList), PropertyValue::IntegerList(v)) => {
                self.set_integer_list(key, position, v.clone())
            }
            (Some(DataType::DoubleList), PropertyValue::DoubleList(v)) => {
                self.set_double_list(key, position, v.clone())
            }
            (Some(DataType::StringList), PropertyValue::StringList(v)) => {
                self.set_string_list(key, position, v.clone())
            }
            _ => false,
        }
    }

    /// Reads one property at a position. Returns `Null` when the property is
    /// undeclared, deleted at that position, or out of range.
    #[must_use]
    pub fn get_property(&self, key: &str, position: u64) -> PropertyValue {
        let Some(storage) = self.storage_of(key) else {
            return PropertyValue::Null;
        };
        if self.is_deleted(key, position) {
            return PropertyValue::Null;
        }
        let at = position as usize;
        match storage {
            DataType::Boolean => self
                .booleans
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::Boolean(*v)),
            DataType::Integer => self
                .integers
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::Integer(*v)),
            DataType::Double => self
                .doubles
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::Double(*v)),
            DataType::String => self
                .strings
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::String(v.clone())),
            DataType::BooleanList => self
                .boolean_lists
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::BooleanList(v.clone())),
            DataType::IntegerList => self
                .integer_lists
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::IntegerList(v.clone())),
            DataType::DoubleList => self
                .double_lists
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::DoubleList(v.clone())),
            DataType::StringList => self
                .string_lists
                .get(key)
                .and_then(|column| column.get(at))
                .map_or(PropertyValue::Null, |v| PropertyValue::StringList(v.clone())),
            DataType::Date | DataType::DateList => unreachable!("storage() never returns dates"),
        }
    }

    /// Collects one row across all declared properties, skipping deleted slots.
    #[must_use]
    pub fn get_all(&self, position: u64) -> HashMap<String, PropertyValue> {
        let mut row = HashMap::new();
        for key in self.types.keys() {
            let value = self.get_property(key, position);
            if !value.is_null() {
                row.insert(key.clone(), value);
            }
        }
        row
    }

    /// Tombstones one property at a position; storage is kept.
    pub fn delete_property(&mut self, key: &str, position: u64) -> bool {
        if !self.types.contains_key(key) {
            return false;
        }
        if let Some(map) = self.deleted.get_mut(key) {
            map.insert(position);
        }
        true
    }

    /// Tombstones every property at a position (row delete).
    pub fn delete_row(&mut self, position: u64) -> bool {
        for map in self.deleted.values_mut() {
            map.insert(position);
        }
        true
    }

    /// True when the property is tombstoned at the position.
    ///
    /// Entity stores scrub every column when a position is (re)allocated, so
    /// the bitmap is authoritative for live positions.
    #[must_use]
    pub fn is_deleted(&self, key: &str, position: u64) -> bool {
        self.deleted
            .get(key)
            .is_some_and(|map| map.contains(position))
    }

    /// Number of tombstoned positions for a property.
    #[must_use]
    pub fn deleted_count(&self, key: &str) -> u64 {
        self.deleted.get(key).map_or(0, RoaringTreemap::len)
    }

    /// The tombstone bitmap for a property, empty when undeclared.
    #[must_use]
    pub fn deleted_map(&self, key: &str) -> RoaringTreemap {
        self.deleted.get(key).cloned().unwrap_or_default()
    }

    /// Length of the underlying column vector; positions at or past this
    /// have never been written.
    #[must_use]
    pub fn column_len(&self, key: &str) -> u64 {
        let len = match self.storage_of(key) {
            Some(DataType::Boolean) => self.booleans.get(key).map_or(0, Vec::len),
            Some(DataType::Integer) => self.integers.get(key).map_or(0, Vec::len),
            Some(DataType::Double) => self.doubles.get(key).map_or(0, Vec::len),
            Some(DataType::String) => self.strings.get(key).map_or(0, Vec::len),
            Some(DataType::BooleanList) => self.boolean_lists.get(key).map_or(0, Vec::len),
            Some(DataType::IntegerList) => self.integer_lists.get(key).map_or(0, Vec::len),
            Some(DataType::DoubleList) => self.double_lists.get(key).map_or(0, Vec::len),
            Some(DataType::StringList) => self.string_lists.get(key).map_or(0, Vec::len),
            Some(DataType::Date | DataType::DateList) | None => 0,
        };
        len as u64
    }

    /// Positions holding a written, non-tombstoned value for a property:
    /// the grown range of the column minus its tombstones. Positions the
    /// column never grew to count as unset.
    #[must_use]
    pub fn written_map(&self, key: &str) -> RoaringTreemap {
        let mut written = RoaringTreemap::new();
        let len = self.column_len(key);
        if len > 0 {
            written.insert_range(0..len);
        }
        written - self.deleted_map(key)
    }

    /// Boolean column vector, for the scan pipelines.
    #[must_use]
    pub fn booleans(&self, key: &str) -> Option<&Vec<bool>> {
        self.booleans.get(key)
    }

    /// Integer column vector, for the scan pipelines.
    #[must_use]
    pub fn integers(&self, key: &str) -> Option<&Vec<i64>> {
        self.integers.get(key)
    }

    /// Double column vector, for the scan pipelines.
    #[must_use]
    pub fn doubles(&self, key: &str) -> Option<&Vec<f64>> {
        self.doubles.get(key)
    }

    /// String column vector, for the scan pipelines.
    #[must_use]
    pub fn strings(&self, key: &str) -> Option<&Vec<String>> {
        self.strings.get(key)
    }

    /// Boolean-list column vector, for the scan pipelines.
    #[must_use]
    pub fn boolean_lists(&self, key: &str) -> Option<&Vec<Vec<bool>>> {
        self.boolean_lists.get(key)
    }

    /// Integer-list column vector, for the scan pipelines.
    #[must_use]
    pub fn integer_lists(&self, key: &str) -> Option<&Vec<Vec<i64>>> {
        self.integer_lists.get(key)
    }

    /// Double-list column vector, for the scan pipelines.
    #[must_use]
    pub fn double_lists(&self, key: &str) -> Option<&Vec<Vec<f64>>> {
        self.double_lists.get(key)
    }

    /// String-list column vector, for the scan pipelines.
    #[must_use]
    pub fn string_lists(&self, key: &str) -> Option<&Vec<Vec<String>>> {
        self.string_lists.get(key)
    }
}

/// Grows `column` so that `position` is addressable, filling with `fill`.
fn grow_to<T: Clone>(column: &mut Vec<T>, position: u64, fill: T) {
    let needed = position as usize + 1;
    if column.len() < needed {
        column.resize(needed, fill);
    }
}

#[cfg(test)]
mod tests;
