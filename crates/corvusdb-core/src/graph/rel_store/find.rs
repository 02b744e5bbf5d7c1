//! Find pipeline over relationship property columns.
//!
//! Same shape as the node pipeline: bitmaps for null checks, the SIMD
//! collector for numeric columns, scalar loops with the predicate kernels
//! for everything else.

use super::RelationshipStore;
use crate::graph::paging::Page;
use crate::graph::{Pager, Relationship};
use crate::ids;
use crate::predicate::{self, Operation};
use crate::simd;
use crate::value::{normalize_for as normalize_value, DataType, PropertyValue};
use roaring::RoaringTreemap;

impl RelationshipStore {
    /// Positions to skip: column tombstones unioned with deleted positions.
    pub(crate) fn blanks(&self, type_id: u16, property: &str) -> RoaringTreemap {
        self.property_store(type_id).deleted_map(property) | self.deleted_map(type_id)
    }

    /// Counts relationships matching `property operation value`.
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

        if operation == Operation::IsNull {
            return self.null_positions(type_id, property).len();
        }
        if operation == Operation::NotIsNull {
            return self
                .count(type_id)
                .saturating_sub(self.null_positions(type_id, property).len());
        }
        let value = normalize_value(tag, value);
        let blank = self.blanks(type_id, property);
        let store = self.property_store(type_id);

        match (tag.storage(), &value) {
            (DataType::Boolean, PropertyValue::Boolean(target)) => store
                .booleans(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate_boolean(operation, *stored, *target)
                    })
                }),
            (DataType::Integer, PropertyValue::Integer(target)) => store
                .integers(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate(operation, stored, target)
                    })
                }),
            (DataType::Double, PropertyValue::Double(target)) => store
                .doubles(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate(operation, stored, target)
                    })
                }),
            (DataType::String, PropertyValue::String(target)) => store
                .strings(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate_string(operation, stored, target)
                    })
                }),
            (DataType::BooleanList, PropertyValue::BooleanList(target)) => store
                .boolean_lists(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            (DataType::IntegerList, PropertyValue::IntegerList(target)) => store
                .integer_lists(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            (DataType::DoubleList, PropertyValue::DoubleList(target)) => store
                .double_lists(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            (DataType::StringList, PropertyValue::StringList(target)) => store
                .string_lists(property)
                .map_or(0, |column| {
                    scalar_count(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            _ => 0,
        }
    }

    /// External ids of relationships matching, paged.
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
            return self.page_bitmap(type_id, self.null_positions(type_id, property), skip, limit);
        }
        if operation == Operation::NotIsNull {
            return self.page_bitmap(type_id, self.written_positions(type_id, property), skip, limit);
        }
        let value = normalize_value(tag, value);
        let blank = self.blanks(type_id, property);
        let store = self.property_store(type_id);

        // Numeric columns: SIMD index collection, then subtract blanks and page.
        if let (DataType::Integer, PropertyValue::Integer(target)) = (tag.storage(), &value) {
            let Some(column) = store.integers(property) else {
                return Vec::new();
            };
            let mut indexes = simd::collect_indexes_i64(column, operation, *target);
            indexes.retain(|position| !blank.contains(*position));
            return self.page_positions(type_id, &indexes, skip, limit);
        }
        if let (DataType::Double, PropertyValue::Double(target)) = (tag.storage(), &value) {
            let Some(column) = store.doubles(property) else {
                return Vec::new();
            };
            let mut indexes = simd::collect_indexes_f64(column, operation, *target);
            indexes.retain(|position| !blank.contains(*position));
            return self.page_positions(type_id, &indexes, skip, limit);
        }

        let matching: Vec<u64> = match (tag.storage(), &value) {
            (DataType::Boolean, PropertyValue::Boolean(target)) => store
                .booleans(property)
                .map_or_else(Vec::new, |column| {
                    scalar_positions(column, &blank, |stored| {
                        predicate::evaluate_boolean(operation, *stored, *target)
                    })
                }),
            (DataType::String, PropertyValue::String(target)) => store
                .strings(property)
                .map_or_else(Vec::new, |column| {
                    scalar_positions(column, &blank, |stored| {
                        predicate::evaluate_string(operation, stored, target)
                    })
                }),
            (DataType::BooleanList, PropertyValue::BooleanList(target)) => store
                .boolean_lists(property)
                .map_or_else(Vec::new, |column| {
                    scalar_positions(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            (DataType::IntegerList, PropertyValue::IntegerList(target)) => store
                .integer_lists(property)
                .map_or_else(Vec::new, |column| {
                    scalar_positions(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            (DataType::DoubleList, PropertyValue::DoubleList(target)) => store
                .double_lists(property)
                .map_or_else(Vec::new, |column| {
                    scalar_positions(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            (DataType::StringList, PropertyValue::StringList(target)) => store
                .string_lists(property)
                .map_or_else(Vec::new, |column| {
                    scalar_positions(column, &blank, |stored| {
                        predicate::evaluate_list(operation, stored, target)
                    })
                }),
            _ => Vec::new(),
        };
        self.page_positions(type_id, &matching, skip, limit)
    }

    /// Relationships matching, paged.
    pub(crate) fn find_relationships(
        &self,
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<Relationship> {
        self.find_ids(type_id, property, operation, value, skip, limit)
            .into_iter()
            .filter_map(|id| self.relationship_at(ids::type_of(id), ids::position_of(id)))
            .collect()
    }

    /// Unset-but-live positions: live set minus the column's written set,
    /// so positions the column never grew to count as null.
    fn null_positions(&self, type_id: u16, property: &str) -> RoaringTreemap {
        self.live_positions(type_id) - self.property_store(type_id).written_map(property)
    }

    fn live_positions(&self, type_id: u16) -> RoaringTreemap {
        let slot = usize::from(type_id);
        let max_position = self.starting_node_ids[slot].len() as u64;
        let mut live = RoaringTreemap::new();
        if max_position > 0 {
            live.insert_range(0..max_position);
        }
        live - self.deleted_map(type_id)
    }

    fn written_positions(&self, type_id: u16, property: &str) -> RoaringTreemap {
        self.property_store(type_id).written_map(property) - self.deleted_map(type_id)
    }

    fn page_bitmap(
        &self,
        type_id: u16,
        positions: RoaringTreemap,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for position in positions {
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

fn scalar_count<T>(
    column: &[T],
    blank: &RoaringTreemap,
    mut matches: impl FnMut(&T) -> bool,
) -> u64 {
    column
        .iter()
        .enumerate()
        .filter(|(position, _)| !blank.contains(*position as u64))
        .filter(|(_, stored)| matches(stored))
        .count() as u64
}

fn scalar_positions<T>(
    column: &[T],
    blank: &RoaringTreemap,
    mut matches: impl FnMut(&T) -> bool,
) -> Vec<u64> {
    column
        .iter()
        .enumerate()
        .filter(|(position, _)| !blank.contains(*position as u64))
        .filter(|(_, stored)| matches(stored))
        .map(|(position, _)| position as u64)
        .collect()
}
