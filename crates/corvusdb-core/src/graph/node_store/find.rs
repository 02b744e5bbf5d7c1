//! Find pipeline: full-column scans over one `(type, property)` column.
//!
//! Null checks run purely on bitmaps. Integer and double columns go through
//! the SIMD index collector; the remaining kinds use scalar loops with the
//! predicate kernels. Skip/limit pacing counts accepted rows only.

use super::NodeStore;
use crate::graph::paging::Page;
use crate::graph::{Node, Pager};
use crate::ids;
use crate::predicate::{self, Operation};
use crate::simd;
use crate::value::{normalize_for as normalize_value, DataType, PropertyValue};
use roaring::RoaringTreemap;

impl NodeStore {
    /// Positions to skip: the column's tombstones unioned with the type's
    /// deleted positions.
    pub(crate) fn blanks(&self, type_id: u16, property: &str) -> RoaringTreemap {
        self.property_store(type_id).deleted_map(property) | self.deleted_map(type_id)
    }

    /// Counts nodes matching `property operation value`.
    pub(crate) fn find_count(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        if !self.valid_type_id(type_id) {
            return 0;
        }
        let Some(tag) = self.property_store(type_id).property_type(property) else {
            return 0;
        };

        // Null counts come straight off the bitmaps: deleted nodes do not
        // count as null properties.
        if operation == Operation::IsNull {
            return self.null_positions(type_id, property).len();
        }
        if operation == Operation::NotIsNull {
            return self
                .count(type_id)
                .saturating_sub(self.null_positions(type_id, property).len());
        }
        let value = normalize_value(tag, value);
        match tag.storage() {
            DataType::Boolean => self.count_booleans(type_id, property, operation, &value),
            DataType::Integer => self.count_integers(type_id, property, operation, &value),
            DataType::Double => self.count_doubles(type_id, property, operation, &value),
            DataType::String => self.count_strings(type_id, property, operation, &value),
            DataType::BooleanList => self.count_boolean_lists(type_id, property, operation, &value),
            DataType::IntegerList => self.count_integer_lists(type_id, property, operation, &value),
            DataType::DoubleList => self.count_double_lists(type_id, property, operation, &value),
            DataType::StringList => self.count_string_lists(type_id, property, operation, &value),
            DataType::Date | DataType::DateList => 0,
        }
    }

    /// External ids of nodes matching `property operation value`, paged.
    pub(crate) fn find_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        if !self.valid_type_id(type_id) {
            return Vec::new();
        }
        let Some(tag) = self.property_store(type_id).property_type(property) else {
            return Vec::new();
        };

        if operation == Operation::IsNull {
            return self.find_null_ids(type_id, property, skip, limit);
        }
        if operation == Operation::NotIsNull {
            return self.find_not_null_ids(type_id, property, skip, limit);
        }
        let value = normalize_value(tag, value);
        match tag.storage() {
            DataType::Boolean => self.find_boolean_ids(type_id, property, operation, &value, skip, limit),
            DataType::Integer => self.find_integer_ids(type_id, property, operation, &value, skip, limit),
            DataType::Double => self.find_double_ids(type_id, property, operation, &value, skip, limit),
            DataType::String => self.find_string_ids(type_id, property, operation, &value, skip, limit),
            DataType::BooleanList => {
                self.find_boolean_list_ids(type_id, property, operation, &value, skip, limit)
            }
            DataType::IntegerList => {
                self.find_integer_list_ids(type_id, property, operation, &value, skip, limit)
            }
            DataType::DoubleList => {
                self.find_double_list_ids(type_id, property, operation, &value, skip, limit)
            }
            DataType::StringList => {
                self.find_string_list_ids(type_id, property, operation, &value, skip, limit)
            }
            DataType::Date | DataType::DateList => Vec::new(),
        }
    }

    /// Nodes matching `property operation value`, paged.
    pub(crate) fn find_nodes(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<Node> {
        self.find_ids(type_id, property, operation, value, skip, limit)
            .into_iter()
            .filter_map(|id| self.node_at(ids::type_of(id), ids::position_of(id)))
            .collect()
    }

    /// Positions where the property is unset but the node is live: the live
    /// set minus the column's written set, so positions the column never
    /// grew to count as null.
    fn null_positions(&self, type_id: u16, property: &str) -> RoaringTreemap {
        self.live_positions(type_id) - self.property_store(type_id).written_map(property)
    }

    /// Live node positions of a type.
    fn live_positions(&self, type_id: u16) -> RoaringTreemap {
        let slot = usize::from(type_id);
        let max_position = self.keys[slot].len() as u64;
        let mut live = RoaringTreemap::new();
        if max_position > 0 {
            live.insert_range(0..max_position);
        }
        live - self.deleted_map(type_id)
    }

    fn find_null_ids(&self, type_id: u16, property: &str, skip: u64, limit: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for position in self.null_positions(type_id, property) {
            match pager.accept() {
                Page::Emit => {
                    if let Ok(id) = ids::pack(self.shard_id, type_id, position) {
                        out.push(id);
                    }
                }
                Page::Skip => {}
                Page::Done => break,
            }
        }
        out
    }

    fn find_not_null_ids(&self, type_id: u16, property: &str, skip: u64, limit: u64) -> Vec<u64> {
        let written =
            self.property_store(type_id).written_map(property) - self.deleted_map(type_id);

        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for position in written {
            match pager.accept() {
                Page::Emit => {
                    if let Ok(id) = ids::pack(self.shard_id, type_id, position) {
                        out.push(id);
                    }
                }
                Page::Skip => {}
                Page::Done => break,
            }
        }
        out
    }

    fn count_booleans(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::Boolean(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).booleans(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate_boolean(operation, **stored, *target))
            .count() as u64
    }

    fn count_integers(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::Integer(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).integers(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate(operation, *stored, target))
            .count() as u64
    }

    fn count_doubles(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::Double(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).doubles(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate(operation, *stored, target))
            .count() as u64
    }

    fn count_strings(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::String(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).strings(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate_string(operation, stored, target))
            .count() as u64
    }

    fn count_boolean_lists(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::BooleanList(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).boolean_lists(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate_list(operation, stored, target))
            .count() as u64
    }

    fn count_integer_lists(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::IntegerList(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).integer_lists(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate_list(operation, stored, target))
            .count() as u64
    }

    fn count_double_lists(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::DoubleList(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).double_lists(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate_list(operation, stored, target))
            .count() as u64
    }

    fn count_string_lists(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let PropertyValue::StringList(target) = value else {
            return 0;
        };
        let Some(column) = self.property_store(type_id).string_lists(property) else {
            return 0;
        };
        let blank = self.blanks(type_id, property);
        column
            .iter()
            .enumerate()
            .filter(|(position, _)| !blank.contains(*position as u64))
            .filter(|(_, stored)| predicate::evaluate_list(operation, stored, target))
            .count() as u64
    }

    fn find_boolean_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::Boolean(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).booleans(property) else {
            return Vec::new();
        };
        let blank = self.blanks(type_id, property);
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for (position, stored) in column.iter().enumerate() {
            if pager.full() {
                break;
            }
            let position = position as u64;
            if blank.contains(position) {
                continue;
            }
            if !predicate::evaluate_boolean(operation, *stored, *target) {
                continue;
            }
            match pager.accept() {
                Page::Emit => {
                    if let Ok(id) = ids::pack(self.shard_id, type_id, position) {
                        out.push(id);
                    }
                }
                Page::Skip => {}
                Page::Done => break,
            }
        }
        out
    }

    /// Integer columns run through the SIMD index collector, then subtract
    /// the blank bitmap and page.
    fn find_integer_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::Integer(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).integers(property) else {
            return Vec::new();
        };
        let blank = self.blanks(type_id, property);
        let mut indexes = simd::collect_indexes_i64(column, operation, *target);
        indexes.retain(|position| !blank.contains(*position));
        self.page_positions(type_id, &indexes, skip, limit)
    }

    fn find_double_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::Double(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).doubles(property) else {
            return Vec::new();
        };
        let blank = self.blanks(type_id, property);
        let mut indexes = simd::collect_indexes_f64(column, operation, *target);
        indexes.retain(|position| !blank.contains(*position));
        self.page_positions(type_id, &indexes, skip, limit)
    }

    fn find_string_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::String(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).strings(property) else {
            return Vec::new();
        };
        let blank = self.blanks(type_id, property);
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for (position, stored) in column.iter().enumerate() {
            if pager.full() {
                break;
            }
            let position = position as u64;
            if blank.contains(position) {
                continue;
            }
            if !predicate::evaluate_string(operation, stored, target) {
                continue;
            }
            match pager.accept() {
                Page::Emit => {
                    if let Ok(id) = ids::pack(self.shard_id, type_id, position) {
                        out.push(id);
                    }
                }
                Page::Skip => {}
                Page::Done => break,
            }
        }
        out
    }

    fn find_boolean_list_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::BooleanList(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).boolean_lists(property) else {
            return Vec::new();
        };
        self.find_list_ids(type_id, property, column, operation, target, skip, limit)
    }

    fn find_integer_list_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::IntegerList(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).integer_lists(property) else {
            return Vec::new();
        };
        self.find_list_ids(type_id, property, column, operation, target, skip, limit)
    }

    fn find_double_list_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::DoubleList(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).double_lists(property) else {
            return Vec::new();
        };
        self.find_list_ids(type_id, property, column, operation, target, skip, limit)
    }

    fn find_string_list_ids(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let PropertyValue::StringList(target) = value else {
            return Vec::new();
        };
        let Some(column) = self.property_store(type_id).string_lists(property) else {
            return Vec::new();
        };
        self.find_list_ids(type_id, property, column, operation, target, skip, limit)
    }

    fn find_list_ids<T: PartialEq>(
        &self,
        type_id: u16,
        property: &str,
        column: &[Vec<T>],
        operation: Operation,
        target: &[T],
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let blank = self.blanks(type_id, property);
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for (position, stored) in column.iter().enumerate() {
            if pager.full() {
                break;
            }
            let position = position as u64;
            if blank.contains(position) {
                continue;
            }
            if !predicate::evaluate_list(operation, stored, target) {
                continue;
            }
            match pager.accept() {
                Page::Emit => {
                    if let Ok(id) = ids::pack(self.shard_id, type_id, position) {
                        out.push(id);
                    }
                }
                Page::Skip => {}
                Page::Done => break,
            }
        }
        out
    }

    fn page_positions(&self, type_id: u16, positions: &[u64], skip: u64, limit: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for position in positions {
            match pager.accept() {
                Page::Emit => {
                    if let Ok(id) = ids::pack(self.shard_id, type_id, *position) {
                        out.push(id);
                    }
                }
                Page::Skip => {}
                Page::Done => break,
            }
        }
        out
    }
}

