//! Filter pipeline: predicate evaluation over a caller-supplied id list.
//!
//! Unlike find, filter starts from external ids: deleted nodes are removed
//! up front, ids of the wrong type never match, and pacing runs over the
//! surviving list in its input order.

use super::NodeStore;
use crate::graph::paging::Page;
use crate::graph::{Node, Pager};
use crate::ids;
use crate::predicate::{self, Operation};
use crate::value::{normalize_for as normalize_value, PropertyValue};

impl NodeStore {
    /// Drops ids whose position is deleted or whose type does not match.
    pub(crate) fn remove_deleted_ids(&self, type_id: u16, list: &mut Vec<u64>) {
        if !self.valid_type_id(type_id) {
            list.clear();
            return;
        }
        let deleted = &self.deleted[usize::from(type_id)];
        list.retain(|id| {
            ids::type_of(*id) == type_id && !deleted.contains(ids::position_of(*id))
        });
    }

    /// Counts ids whose property matches `operation value`.
    pub(crate) fn filter_count(
        &self,
        unfiltered: &[u64],
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        if !self.valid_type_id(type_id) {
            return 0;
        }
        let mut list = unfiltered.to_vec();
        self.remove_deleted_ids(type_id, &mut list);

        let store = self.property_store(type_id);
        if operation.is_null_check() {
            // Null means "no written value", which covers tombstones and
            // positions the column never grew to.
            let written = store.written_map(property);
            let want_null = operation == Operation::IsNull;
            return list
                .iter()
                .filter(|id| written.contains(ids::position_of(**id)) != want_null)
                .count() as u64;
        }

        let Some(tag) = store.property_type(property) else {
            return 0;
        };
        let value = normalize_value(tag, value);
        list.iter()
            .filter(|id| self.matches(type_id, ids::position_of(**id), property, operation, &value))
            .count() as u64
    }

    /// Ids whose property matches, paged over the surviving input order.
    pub(crate) fn filter_ids(
        &self,
        unfiltered: &[u64],
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
        let mut list = unfiltered.to_vec();
        self.remove_deleted_ids(type_id, &mut list);

        let store = self.property_store(type_id);
        if operation.is_null_check() {
            let written = store.written_map(property);
            let want_null = operation == Operation::IsNull;
            return page_matching(&list, skip, limit, |id| {
                written.contains(ids::position_of(id)) != want_null
            });
        }

        let Some(tag) = store.property_type(property) else {
            return Vec::new();
        };
        let value = normalize_value(tag, value);
        page_matching(&list, skip, limit, |id| {
            self.matches(type_id, ids::position_of(id), property, operation, &value)
        })
    }

    /// Nodes whose property matches, paged.
    pub(crate) fn filter_nodes(
        &self,
        unfiltered: &[u64],
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<Node> {
        self.filter_ids(unfiltered, type_id, property, operation, value, skip, limit)
            .into_iter()
            .filter_map(|id| self.node_at(ids::type_of(id), ids::position_of(id)))
            .collect()
    }

    /// One id against the kernel; tombstoned positions never match.
    fn matches(
        &self,
        type_id: u16,
        position: u64,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> bool {
        let store = self.property_store(type_id);
        if store.is_deleted(property, position) {
            return false;
        }
        let stored = store.get_property(property, position);
        predicate::evaluate_values(operation, &stored, value)
    }
}

fn page_matching(list: &[u64], skip: u64, limit: u64, accept: impl Fn(u64) -> bool) -> Vec<u64> {
    let mut out = Vec::new();
    let mut pager = Pager::new(skip, limit);
    for id in list {
        if pager.full() {
            break;
        }
        if !accept(*id) {
            continue;
        }
        match pager.accept() {
            Page::Emit => out.push(*id),
            Page::Skip => {}
            Page::Done => break,
        }
    }
    out
}
