//! Filter pipeline over caller-supplied relationship ids.
//!
//! The sorted variants materialize `(id, value)` pairs, run a partial sort
//! up to the window end, and emit the page, so a sorted filter costs
//! `O(N + L log L)` rather than a full `O(N log N)` sort.

use super::RelationshipStore;
use crate::graph::paging::Page;
use crate::graph::{Pager, Relationship, SortOrder};
use crate::ids;
use crate::predicate::{self, Operation};
use crate::value::{compare_values, normalize_for as normalize_value, PropertyValue};

impl RelationshipStore {
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
            // Null covers tombstones and positions the column never grew to.
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

    /// Ids whose property matches, paged; optionally sorted by the fetched
    /// property value.
    pub(crate) fn filter_ids(
        &self,
        unfiltered: &[u64],
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
        sort: SortOrder,
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
            // Null rows carry no sort value; input order is the only order.
            return page_matching(&list, skip, limit, |id| {
                written.contains(ids::position_of(id)) != want_null
            });
        }

        let Some(tag) = store.property_type(property) else {
            return Vec::new();
        };
        let value = normalize_value(tag, value);

        if sort == SortOrder::None {
            return page_matching(&list, skip, limit, |id| {
                self.matches(type_id, ids::position_of(id), property, operation, &value)
            });
        }

        // Sorted path: materialize (id, value) pairs for matching rows, then
        // partial-sort up to the window end.
        let mut pairs: Vec<(u64, PropertyValue)> = list
            .into_iter()
            .filter(|id| self.matches(type_id, ids::position_of(*id), property, operation, &value))
            .map(|id| {
                let stored = store.get_property(property, ids::position_of(id));
                (id, stored)
            })
            .collect();
        partial_sort_pairs(&mut pairs, skip.saturating_add(limit), sort);

        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for (id, _) in pairs {
            match pager.accept() {
                Page::Emit => out.push(id),
                Page::Skip => {}
                Page::Done => break,
            }
        }
        out
    }

    /// Matching `(id, value)` pairs for a sorted cross-shard merge: rows
    /// with a tombstoned sort property are excluded, and only the first
    /// `window` pairs (in the requested order) survive.
    pub(crate) fn filter_pairs(
        &self,
        unfiltered: &[u64],
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        window: u64,
        sort: SortOrder,
    ) -> Vec<(u64, PropertyValue)> {
        if !self.valid_type_id(type_id) {
            return Vec::new();
        }
        let mut list = unfiltered.to_vec();
        self.remove_deleted_ids(type_id, &mut list);
        let store = self.property_store(type_id);
        let Some(tag) = store.property_type(property) else {
            return Vec::new();
        };
        let value = normalize_value(tag, value);
        let mut pairs: Vec<(u64, PropertyValue)> = list
            .into_iter()
            .filter(|id| self.matches(type_id, ids::position_of(*id), property, operation, &value))
            .map(|id| {
                let stored = store.get_property(property, ids::position_of(id));
                (id, stored)
            })
            .collect();
        partial_sort_pairs(&mut pairs, window, sort);
        pairs.truncate(window as usize);
        pairs
    }

    /// Relationships whose property matches, paged and optionally sorted.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn filter_relationships(
        &self,
        unfiltered: &[u64],
        type_id: u16,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
        sort: SortOrder,
    ) -> Vec<Relationship> {
        self.filter_ids(unfiltered, type_id, property, operation, value, skip, limit, sort)
            .into_iter()
            .filter_map(|id| self.relationship_at(ids::type_of(id), ids::position_of(id)))
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

/// Orders the first `window` pairs by value; everything past the window is
/// left in arbitrary order and never emitted.
fn partial_sort_pairs(pairs: &mut [(u64, PropertyValue)], window: u64, sort: SortOrder) {
    let compare = |a: &(u64, PropertyValue), b: &(u64, PropertyValue)| match sort {
        SortOrder::Desc => compare_values(&b.1, &a.1),
        _ => compare_values(&a.1, &b.1),
    };
    let window = (window as usize).min(pairs.len());
    if window == 0 {
        return;
    }
    if window < pairs.len() {
        pairs.select_nth_unstable_by(window - 1, compare);
    }
    pairs[..window].sort_unstable_by(compare);
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
