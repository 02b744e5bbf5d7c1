//! Per-shard, per-type node storage.
//!
//! For every node type the store keeps a key→position index, the key
//! vector, the property columns, the per-position adjacency groups (split
//! into outgoing and incoming), and a compressed bitmap of recyclable
//! positions. All vectors indexed by position are parallel. A position is
//! live exactly when it is in range and not in the deleted bitmap.

mod find;
mod filter;

use crate::error::{Error, Result};
use crate::graph::{Group, Node, Pager};
use crate::graph::paging::Page;
use crate::ids;
use crate::properties::PropertyStore;
use crate::value::PropertyValue;
use roaring::RoaringTreemap;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Typed node storage owned by one shard.
#[derive(Debug)]
pub(crate) struct NodeStore {
    shard_id: u16,
    type_to_id: FxHashMap<String, u16>,
    id_to_type: Vec<String>,
    key_to_position: Vec<FxHashMap<String, u64>>,
    keys: Vec<Vec<String>>,
    properties: Vec<PropertyStore>,
    outgoing: Vec<Vec<Vec<Group>>>,
    incoming: Vec<Vec<Vec<Group>>>,
    deleted: Vec<RoaringTreemap>,
}

impl NodeStore {
    /// Creates a store seeded with the empty sentinel type at id 0.
    pub(crate) fn new(shard_id: u16) -> Self {
        let mut store = Self {
            shard_id,
            type_to_id: FxHashMap::default(),
            id_to_type: Vec::new(),
            key_to_position: Vec::new(),
            keys: Vec::new(),
            properties: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            deleted: Vec::new(),
        };
        store.push_type_slot("");
        store
    }

    /// Empties the store back to its freshly created state.
    pub(crate) fn clear(&mut self) {
        self.type_to_id.clear();
        self.id_to_type.clear();
        self.key_to_position.clear();
        self.keys.clear();
        self.properties.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.deleted.clear();
        self.push_type_slot("");
    }

    fn push_type_slot(&mut self, name: &str) {
        if !name.is_empty() {
            self.type_to_id
                .insert(name.to_string(), self.id_to_type.len() as u16);
        }
        self.id_to_type.push(name.to_string());
        self.key_to_position.push(FxHashMap::default());
        self.keys.push(Vec::new());
        self.properties.push(PropertyStore::new());
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
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

    /// Mirrors a type allocation decided by the authority shard.
    ///
    /// Mirror writes may arrive out of allocation order, so missing lower
    /// slots are filled with unnamed placeholders that a later mirror can
    /// claim. Fails when the name or the slot is already taken.
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

    /// Deletes a type. Succeeds only when no live node of the type remains;
    /// the id slot is reset but never reused.
    pub(crate) fn delete_type_id(&mut self, name: &str) -> bool {
        let type_id = self.type_id(name);
        if !self.valid_type_id(type_id) || self.count(type_id) != 0 {
            return false;
        }
        self.type_to_id.remove(name);
        let slot = usize::from(type_id);
        self.id_to_type[slot].clear();
        self.key_to_position[slot].clear();
        self.keys[slot].clear();
        self.properties[slot].clear();
        self.outgoing[slot].clear();
        self.incoming[slot].clear();
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

    /// Live node count per type id.
    pub(crate) fn counts(&self) -> BTreeMap<u16, u64> {
        self.type_ids()
            .into_iter()
            .map(|id| (id, self.count(id)))
            .collect()
    }

    /// Live node count for one type.
    pub(crate) fn count(&self, type_id: u16) -> u64 {
        self.key_to_position
            .get(usize::from(type_id))
            .map_or(0, |index| index.len() as u64)
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

    // ---- node lifecycle ---------------------------------------------------

    /// True when the position holds a live node of the type.
    pub(crate) fn contains(&self, type_id: u16, position: u64) -> bool {
        if !self.valid_type_id(type_id) {
            return false;
        }
        let slot = usize::from(type_id);
        (position as usize) < self.keys[slot].len() && !self.deleted[slot].contains(position)
    }

    /// Adds an empty node, reusing the minimum recyclable position when one
    /// exists. Fails with `AlreadyExists` when the key is live in this type
    /// and `InvalidArgument` for the sentinel type.
    pub(crate) fn add(&mut self, type_id: u16, key: &str) -> Result<u64> {
        if !self.valid_type_id(type_id) {
            return Err(Error::InvalidArgument(format!(
                "unknown node type id {type_id}"
            )));
        }
        let slot = usize::from(type_id);
        if self.key_to_position[slot].contains_key(key) {
            return Err(Error::AlreadyExists(format!(
                "node ({}, {key})",
                self.id_to_type[slot]
            )));
        }

        let position = match self.deleted[slot].min() {
            Some(minimum) => {
                self.deleted[slot].remove(minimum);
                minimum
            }
            None => self.keys[slot].len() as u64,
        };
        let external_id = ids::pack(self.shard_id, type_id, position)?;

        let at = position as usize;
        if self.keys[slot].len() <= at {
            self.keys[slot].resize(at + 1, String::new());
            self.outgoing[slot].resize(at + 1, Vec::new());
            self.incoming[slot].resize(at + 1, Vec::new());
        }
        self.keys[slot][at] = key.to_string();
        self.outgoing[slot][at].clear();
        self.incoming[slot][at].clear();
        self.key_to_position[slot].insert(key.to_string(), position);
        // Scrub the row so a recycled slot never leaks its previous tenant.
        self.properties[slot].delete_row(position);

        Ok(external_id)
    }

    /// Removes a node position: clears the key index entry, tombstones every
    /// property, drops the adjacency groups, and recycles the position.
    ///
    /// The caller is responsible for having detached all relationships first.
    pub(crate) fn remove(&mut self, type_id: u16, position: u64) -> bool {
        if !self.contains(type_id, position) {
            return false;
        }
        let slot = usize::from(type_id);
        let at = position as usize;
        let key = std::mem::take(&mut self.keys[slot][at]);
        self.key_to_position[slot].remove(&key);
        self.properties[slot].delete_row(position);
        self.outgoing[slot][at].clear();
        self.incoming[slot][at].clear();
        self.deleted[slot].insert(position);
        true
    }

    /// Position of a live node by key, if any.
    pub(crate) fn position_for_key(&self, type_id: u16, key: &str) -> Option<u64> {
        self.key_to_position
            .get(usize::from(type_id))
            .and_then(|index| index.get(key))
            .copied()
    }

    /// External id of a live node by key, or 0.
    pub(crate) fn node_id(&self, type_id: u16, key: &str) -> u64 {
        self.position_for_key(type_id, key)
            .and_then(|position| ids::pack(self.shard_id, type_id, position).ok())
            .unwrap_or(0)
    }

    /// Builds the by-value `Node` for a live position; `None` otherwise.
    pub(crate) fn node_at(&self, type_id: u16, position: u64) -> Option<Node> {
        if !self.contains(type_id, position) {
            return None;
        }
        let external_id = ids::pack(self.shard_id, type_id, position).ok()?;
        let slot = usize::from(type_id);
        Some(
            Node::new(
                external_id,
                &self.id_to_type[slot],
                &self.keys[slot][position as usize],
            )
            .with_properties(self.properties[slot].get_all(position)),
        )
    }

    /// One property of a live node; `Null` when unset or the node is gone.
    pub(crate) fn node_property(
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

    // ---- adjacency --------------------------------------------------------

    /// Outgoing groups of a node position.
    pub(crate) fn outgoing_groups(&self, type_id: u16, position: u64) -> &[Group] {
        if !self.contains(type_id, position) {
            return &[];
        }
        &self.outgoing[usize::from(type_id)][position as usize]
    }

    /// Incoming groups of a node position.
    pub(crate) fn incoming_groups(&self, type_id: u16, position: u64) -> &[Group] {
        if !self.contains(type_id, position) {
            return &[];
        }
        &self.incoming[usize::from(type_id)][position as usize]
    }

    /// Appends a link to the outgoing group of `rel_type_id`, creating the
    /// group on first use.
    pub(crate) fn attach_outgoing(
        &mut self,
        type_id: u16,
        position: u64,
        rel_type_id: u16,
        link: crate::graph::Link,
    ) -> bool {
        if !self.contains(type_id, position) {
            return false;
        }
        let groups = &mut self.outgoing[usize::from(type_id)][position as usize];
        group_for(groups, rel_type_id).links.push(link);
        true
    }

    /// Appends a link to the incoming group of `rel_type_id`.
    pub(crate) fn attach_incoming(
        &mut self,
        type_id: u16,
        position: u64,
        rel_type_id: u16,
        link: crate::graph::Link,
    ) -> bool {
        if !self.contains(type_id, position) {
            return false;
        }
        let groups = &mut self.incoming[usize::from(type_id)][position as usize];
        group_for(groups, rel_type_id).links.push(link);
        true
    }

    /// Removes the link carrying `rel_id` from the outgoing groups.
    pub(crate) fn detach_outgoing(&mut self, type_id: u16, position: u64, rel_id: u64) -> bool {
        if !self.contains(type_id, position) {
            return false;
        }
        detach(
            &mut self.outgoing[usize::from(type_id)][position as usize],
            rel_id,
        )
    }

    /// Removes the link carrying `rel_id` from the incoming groups.
    pub(crate) fn detach_incoming(&mut self, type_id: u16, position: u64, rel_id: u64) -> bool {
        if !self.contains(type_id, position) {
            return false;
        }
        detach(
            &mut self.incoming[usize::from(type_id)][position as usize],
            rel_id,
        )
    }

    /// Takes both adjacency sides of a node for cascade deletion, leaving
    /// the groups empty.
    pub(crate) fn take_groups(
        &mut self,
        type_id: u16,
        position: u64,
    ) -> (Vec<Group>, Vec<Group>) {
        if !self.contains(type_id, position) {
            return (Vec::new(), Vec::new());
        }
        let slot = usize::from(type_id);
        let at = position as usize;
        (
            std::mem::take(&mut self.outgoing[slot][at]),
            std::mem::take(&mut self.incoming[slot][at]),
        )
    }

    // ---- paging over all nodes -------------------------------------------

    /// External ids of live nodes of one type, paged.
    pub(crate) fn ids(&self, type_id: u16, skip: u64, limit: u64) -> Vec<u64> {
        let mut out = Vec::new();
        if !self.valid_type_id(type_id) {
            return out;
        }
        let slot = usize::from(type_id);
        let mut pager = Pager::new(skip, limit);
        for position in 0..self.keys[slot].len() as u64 {
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

    /// External ids of live nodes across every type, paged in type order.
    pub(crate) fn all_ids(&self, skip: u64, limit: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut pager = Pager::new(skip, limit);
        for type_id in 1..self.id_to_type.len() as u16 {
            let slot = usize::from(type_id);
            for position in 0..self.keys[slot].len() as u64 {
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

    /// Live nodes of one type, paged.
    pub(crate) fn nodes(&self, type_id: u16, skip: u64, limit: u64) -> Vec<Node> {
        self.ids(type_id, skip, limit)
            .into_iter()
            .filter_map(|id| self.node_at(ids::type_of(id), ids::position_of(id)))
            .collect()
    }

    /// Live nodes across every type, paged in type order.
    pub(crate) fn all_nodes(&self, skip: u64, limit: u64) -> Vec<Node> {
        self.all_ids(skip, limit)
            .into_iter()
            .filter_map(|id| self.node_at(ids::type_of(id), ids::position_of(id)))
            .collect()
    }
}

fn group_for(groups: &mut Vec<Group>, rel_type_id: u16) -> &mut Group {
    let at = match groups.iter().position(|g| g.rel_type_id == rel_type_id) {
        Some(found) => found,
        None => {
            groups.push(Group::new(rel_type_id));
            groups.len() - 1
        }
    };
    &mut groups[at]
}

fn detach(groups: &mut [Group], rel_id: u64) -> bool {
    for group in groups {
        if let Some(found) = group.links.iter().position(|link| link.rel_id == rel_id) {
            group.links.remove(found);
            return true;
        }
    }
    false
}
