//! Per-shard, per-type relationship storage.
//!
//! Relationships are stored once, by type, as parallel endpoint vectors
//! plus property columns and a deleted-position bitmap. The adjacency
//! groups on the endpoint nodes reference relationships by external id;
//! keeping both sides consistent is the shard's job.

mod find;
mod filter;

use crate::error::{Error, Result};
use crate::graph::{Pager, Relationship};
use crate::graph::paging::Page;
use crate::ids;
use crate::properties::PropertyStore;
use crate::value::PropertyValue;
use roaring::RoaringTreemap;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Typed relationship storage owned by one shard.
#[derive(Debug)]
pub(crate) struct RelationshipStore {
    shard_id: u16,
    type_to_id: FxHashMap<String, u16>,
    id_to_type: Vec<String>,
    starting_node_ids: Vec<Vec<u64>>,
    ending_node_ids: Vec<Vec<u64>>,
    properties: Vec<PropertyStore>,
    deleted: Vec<RoaringTreemap>,
}

impl RelationshipStore {
    /// Creates a store seeded with the empty sentinel type at id 0.
    pub(crate) fn new(shard_id: u16) -> Self {
        let mut store = Self {
            shard_id,
            type_to_id: FxHashMap::default(),
            id_to_type: Vec::new(),
            starting_node_ids: Vec::new(),
            ending_node_ids: Vec::new(),
            properties: Vec::new(),
            deleted: Vec::new(),
        };
        store.push_type_slot("");
        store
    }

    /// Empties the store back to its freshly created state.
    pub(crate) fn clear(&mut self) {
        self.type_to_id.clear();
        self.id_to_type.clear();
        self.starting_node_ids.clear();
        self.ending_node_ids.clear();
        self.properties.clear();
        self.deleted.clear();
        self.push_type_slot("");
    }

    fn push_type_slot(&mut self, name: &str) {
        if !name.is_empty() {
            self.type_to_id
                .insert(name.to_string(), self.id_to_type.len() as u16);
        }
        self.id_to_type.push(name.to_string());
        self.starting_node_ids.push(Vec::new());
        self.ending_node_ids.push(Vec::new());
        self.properties.push(PropertyStore::new());
        self.deleted.push(RoaringTreemap::new());
    }

    // ---- type catalog -----------------------------------------------------

    /// Returns the existing id for a type name or allocates the next one.
    pub(crate) fn insert_or_get_type_id(&mut self, name: &str) -> u16 {
        if let Some(id) = self.type_to_id.get(name) {
            return *id;
        }
        let id = self.id_to_type.len() as u16;
        self.push_type_slot(name);
        id
    }

    /// Mirrors a type allocation decided by the authority shard. Missing
    /// lower slots are filled with unnamed placeholders so mirrors converge
    /// regardless of arrival order.
    pub(crate) fn add_type_id(&mut self, name: &str, type_id: u16) -> bool {
        if name.is_empty() || self.type_to_id.contains_key(name) {
            return false;
        }
        while self.id_to_type.len() <= usize::from(type_id) {
            self.push_type_slot("");
        }
        let slot = usize::from(type_id);
        if !self.id_to_type[slot].is_empty() {
            return false;
        }
        self.id_to_type[slot] = name.to_string();
        self.type_to_id.insert(name.to_string(), type_id);
        true
    }

    /// Type id for a name, or 0 (the sentinel) when unknown.
    pub(crate) fn type_id(&self, name: &str) -> u16 {
        self.type_to_id.get(name).copied().unwrap_or(0)
    }

    /// Type name for an id, or the empty string when unknown.
    pub(crate) fn type_name(&self, type_id: u16) -> &str {
        self.id_to_type
            .get(usize::from(type_id))
            .map_or("", String::as_str)
    }

    /// True for an allocated, non-sentinel type id.
    pub(crate) fn valid_type_id(&self, type_id: u16) -> bool {
        type_id != 0 && usize::from(type_id) < self.id_to_type.len()
    }

    /// Deletes a type when no live relationship of it remains. The id slot
    /// is reset, never reused.
    pub(crate) fn delete_type_id(&mut self, name: &str) -> bool {
        let type_id = self.type_id(name);
        if !self.valid_type_id(type_id) || self.count(type_id) != 0 {
            return false;
        }
        self.type_to_id.remove(name);
        let slot = usize::from(type_id);
        self.id_to_type[slot].clear();
        self.starting_node_ids[slot].clear();
        self.ending_node_ids[slot].clear();
        self.properties[slot].clear();
        self.deleted[slot].clear();
        true
    }

    /// All live type names, in id order.
    pub(crate) fn type_names(&self) -> Vec<String> {
        self.id_to_type
            .iter()
            .skip(1)
            .filter(|name| !name.is_empty())
            .cloned()
            .collect()
    }

    /// All live type ids, ascending.
    pub(crate) fn type_ids(&self) -> Vec<u16> {
        (1..self.id_to_type.len() as u16)
            .filter(|id| !self.id_to_type[usize::from(*id)].is_empty())
            .collect()
    }

    /// Live relationship count per type id.
    pub(crate) fn counts(&self) -> BTreeMap<u16, u64> {
        self.type_ids()
            .into_iter()
            .map(|id| (id, self.count(id)))
            .collect()
    }

    /// Live relationship count for one type.
    pub(crate) fn count(&self, type_id: u16) -> u64 {
        let slot = usize::from(type_id);
        if slot >= self.starting_node_ids.len() {
            return 0;
        }
        self.starting_node_ids[slot].len() as u64 - self.deleted[slot].len()
    }

    /// The recyclable-position bitmap for a type.
    pub(crate) fn deleted_map(&self, type_id: u16) -> RoaringTreemap {
        self.deleted
            .get(usize::from(type_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Property columns of a type.
    pub(crate) fn property_store(&self, type_id: u16) -> &PropertyStore {
        &self.properties[usize::from(type_id)]
    }

    /// Mutable property columns of a type.
    pub(crate) fn property_store_mut(&mut self, type_id: u16) -> &mut PropertyStore {
        &mut self.properties[usize::from(type_id)]
    }

    // ---- relationship lifecycle -------------------------------------------

    /// True when the position holds a live relationship of the type.
    pub(crate) fn contains(&self, type_id: u16, position: u64) -> bool {
        if !self.valid_type_id(type_id) {
            return false;
        }
        let slot = usize::from(type_id);
        (position as usize) < self.starting_node_ids[slot].len()
            && !self.deleted[slot].contains(position)
    }

    /// Allocates a relationship position (reusing the minimum recyclable one)
    /// and writes the endpoint pair. Adjacency splicing is the shard's job.
    pub(crate) fn add(&mut self, type_id: u16, from_id: u64, to_id: u64) -> Result<u64> {
        if !self.valid_type_id(type_id) {
            return Err(Error::InvalidArgument(format!(
                "unknown relationship type id {type_id}"
            )));
        }
        let slot = usize::from(type_id);
        let position = match self.deleted[slot].min() {
            Some(minimum) => {
                self.deleted[slot].remove(minimum);
                minimum
            }
            None => self.starting_node_ids[slot].len() as u64,
        };
        let external_id = ids::pack(self.shard_id, type_id, position)?;

        let at = position as usize;
        if self.starting_node_ids[slot].len() <= at {
            self.starting_node_ids[slot].resize(at + 1, 0);
            self.ending_node_ids[slot].resize(at + 1, 0);
        }
        self.starting_node_ids[slot][at] = from_id;
        self.ending_node_ids[slot][at] = to_id;
        // Scrub the row so a recycled slot never leaks its previous tenant.
        self.properties[slot].delete_row(position);

        Ok(external_id)
    }

    /// Recycles a relationship position and tombstones its properties.
    pub(crate) fn remove(&mut self, type_id: u16, position: u64) -> bool {
        if !self.contains(type_id, position) {
            return false;
        }
        let slot = usize::from(type_id);
        self.starting_node_ids[slot][position as usize] = 0;
        self.ending_node_ids[slot][position as usize] = 0;
        self.properties[slot].delete_row(position);
        self.deleted[slot].insert(position);
        true
    }

    /// Starting node of a live relationship, or 0.
    pub(crate) fn starting_node_id(&self, type_id: u16, position: u64) -> u64 {
        if !self.contains(type_id, position) {
            return 0;
        }
        self.starting_node_ids[usize::from(type_id)][position as usize]
    }

    /// Ending node of a live relationship, or 0.
    pub(crate) fn ending_node_id(&self, type_id: u16, position: u64) -> u64 {
        if !self.contains(type_id, position) {
            return 0;
        }
        self.ending_node_ids[usize::from(type_id)][position as usize]
    }

    /// Builds the by-value `Relationship` for a live position.
    pub(crate) fn relationship_at(&self, type_id: u16, position: u64) -> Option<Relationship> {
        if !self.contains(type_id, position) {
            return None;
        }
        let external_id = ids::pack(self.shard_id, type_id, position).ok()?;
        let slot = usize::from(type_id);
        Some(
            Relationship::new(
                external_id,
                &self.id_to_type[slot],
                self.starting_node_ids[slot][position as usize],
                self.ending_node_ids[slot][position as usize],
            )
            .with_properties(self.properties[slot].get_all(position)),
        )
    }

    /// One property of a live relationship; `Null` when unset or gone.
    pub(crate) fn relationship_property(
        &self,
        type_id: u16,
        position: u64,
        property: &str,
    ) -> PropertyValue {
        if !self.contains(type_id, position) {
            return PropertyValue::Null;
        }
        self.properties[usize::from(type_id)].get_property(property, position)
    }

    // ---- paging over all relationships ------------------------------------

    /// External ids of live relationships of one type, paged.
    pub(crate) fn rel_ids(&self, type_id: u16, skip: u64, limit: u64) -> Vec<u64> {
        let mut out = Vec::new();
        if !self.valid_type_id(type_id) {
            return out;
        }
        let slot = usize::from(type_id);
        let mut pager = Pager::new(skip, limit);
        for position in 0..self.starting_node_ids[slot].len() as u64 {
            if self.deleted[slot].contains(position) {
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

    /// External ids of live relationships across every type, paged.
    pub(crate) fn all_rel_ids(&self, skip: u64, limit: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for type_id in 1..self.id_to_type.len() as u16 {
            let slot = usize::from(type_id);
            for position in 0..self.starting_node_ids[slot].len() as u64 {
                if self.deleted[slot].contains(position) {
                    continue;
                }
                match pager.accept() {
                    Page::Emit => {
                        if let Ok(id) = ids::pack(self.shard_id, type_id, position) {
                            out.push(id);
                        }
                    }
                    Page::Skip => {}
                    Page::Done => return out,
                }
            }
        }
        out
    }

    /// Live relationships of one type, paged.
    pub(crate) fn relationships(&self, type_id: u16, skip: u64, limit: u64) -> Vec<Relationship> {
        self.rel_ids(type_id, skip, limit)
            .into_iter()
            .filter_map(|id| self.relationship_at(ids::type_of(id), ids::position_of(id)))
            .collect()
    }

    /// Live relationships across every type, paged.
    pub(crate) fn all_relationships(&self, skip: u64, limit: u64) -> Vec<Relationship> {
        self.all_rel_ids(skip, limit)
            .into_iter()
            .filter_map(|id| self.relationship_at(ids::type_of(id), ids::position_of(id)))
            .collect()
    }
}

#[cfg(test)]
mod tests;
