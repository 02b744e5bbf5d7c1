//! A shard: the single-threaded owner of one slice of the graph.
//!
//! Each shard owns a node store and a relationship store and mutates them
//! only from its own mailbox task, so nothing here takes a lock. Operations
//! that span shards are split into local halves; the runtime coordinates
//! the halves and the shard never reaches into another shard's state.
//!
//! Placement rules: a node lives on the shard its key hashes to; a
//! relationship is homed on the shard of its starting node, so a node's
//! outgoing links always reference locally stored relationships.

use crate::error::Result;
use crate::graph::node_store::NodeStore;
use crate::graph::rel_store::RelationshipStore;
use crate::graph::{Direction, Group, Link, Node, RelTypeFilter, Relationship, SortOrder};
use crate::ids;
use crate::predicate::Operation;
use crate::value::{DataType, PropertyValue};
use serde_json::Value;
use std::collections::BTreeMap;

/// Work the runtime must dispatch to finish a node removal.
#[derive(Debug, Default)]
pub(crate) struct NodeRemoveCascade {
    /// `(neighbor node, relationship)` pairs whose incoming link must be
    /// detached on the neighbor's shard.
    pub detach_incoming: Vec<(u64, u64)>,
    /// Relationships homed on other shards (this node was their ending
    /// endpoint); their records and outgoing links die over there.
    pub remove_remote: Vec<u64>,
}

/// One shard's slice of the graph.
pub struct Shard {
    shard_id: u16,
    nodes: NodeStore,
    relationships: RelationshipStore,
}

impl Shard {
    /// Creates an empty shard.
    #[must_use]
    pub(crate) fn new(shard_id: u16) -> Self {
        Self {
            shard_id,
            nodes: NodeStore::new(shard_id),
            relationships: RelationshipStore::new(shard_id),
        }
    }

    /// Empties both stores.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.relationships.clear();
    }

    // ---- schema (catalog mirrored on every shard) -------------------------

    pub(crate) fn node_type_insert_or_get(&mut self, name: &str) -> u16 {
        self.nodes.insert_or_get_type_id(name)
    }

    pub(crate) fn node_type_mirror(&mut self, name: &str, type_id: u16) -> bool {
        self.nodes.add_type_id(name, type_id)
    }

    pub(crate) fn node_type_delete(&mut self, name: &str) -> bool {
        self.nodes.delete_type_id(name)
    }

    pub(crate) fn rel_type_insert_or_get(&mut self, name: &str) -> u16 {
        self.relationships.insert_or_get_type_id(name)
    }

    pub(crate) fn rel_type_mirror(&mut self, name: &str, type_id: u16) -> bool {
        self.relationships.add_type_id(name, type_id)
    }

    pub(crate) fn rel_type_delete(&mut self, name: &str) -> bool {
        self.relationships.delete_type_id(name)
    }

    pub(crate) fn node_type_id(&self, name: &str) -> u16 {
        self.nodes.type_id(name)
    }

    pub(crate) fn rel_type_id(&self, name: &str) -> u16 {
        self.relationships.type_id(name)
    }

    pub(crate) fn node_type_names(&self) -> Vec<String> {
        self.nodes.type_names()
    }

    pub(crate) fn rel_type_names(&self) -> Vec<String> {
        self.relationships.type_names()
    }

    /// Declares a node property column; `None` reports a tag conflict.
    pub(crate) fn node_property_type_set(
        &mut self,
        type_name: &str,
        property: &str,
        tag: DataType,
    ) -> Option<DataType> {
        let type_id = self.nodes.type_id(type_name);
        if !self.nodes.valid_type_id(type_id) {
            return None;
        }
        self.nodes
            .property_store_mut(type_id)
            .set_property_type(property, tag)
    }

    pub(crate) fn node_property_type_delete(&mut self, type_name: &str, property: &str) -> bool {
        let type_id = self.nodes.type_id(type_name);
        if !self.nodes.valid_type_id(type_id) {
            return false;
        }
        self.nodes
            .property_store_mut(type_id)
            .remove_property_type(property)
    }

    pub(crate) fn rel_property_type_set(
        &mut self,
        type_name: &str,
        property: &str,
        tag: DataType,
    ) -> Option<DataType> {
        let type_id = self.relationships.type_id(type_name);
        if !self.relationships.valid_type_id(type_id) {
            return None;
        }
        self.relationships
            .property_store_mut(type_id)
            .set_property_type(property, tag)
    }

    pub(crate) fn rel_property_type_delete(&mut self, type_name: &str, property: &str) -> bool {
        let type_id = self.relationships.type_id(type_name);
        if !self.relationships.valid_type_id(type_id) {
            return false;
        }
        self.relationships
            .property_store_mut(type_id)
            .remove_property_type(property)
    }

    /// Property schema of a node type (name → external type name).
    pub(crate) fn node_property_schema(&self, type_name: &str) -> BTreeMap<String, String> {
        let type_id = self.nodes.type_id(type_name);
        if !self.nodes.valid_type_id(type_id) {
            return BTreeMap::new();
        }
        self.nodes.property_store(type_id).property_types()
    }

    /// Property schema of a relationship type.
    pub(crate) fn rel_property_schema(&self, type_name: &str) -> BTreeMap<String, String> {
        let type_id = self.relationships.type_id(type_name);
        if !self.relationships.valid_type_id(type_id) {
            return BTreeMap::new();
        }
        self.relationships.property_store(type_id).property_types()
    }

    /// Live node counts by type name, this shard only.
    pub(crate) fn node_counts(&self) -> BTreeMap<String, u64> {
        self.nodes
            .counts()
            .into_iter()
            .map(|(type_id, count)| (self.nodes.type_name(type_id).to_string(), count))
            .collect()
    }

    /// Live relationship counts by type name, this shard only.
    pub(crate) fn rel_counts(&self) -> BTreeMap<String, u64> {
        self.relationships
            .counts()
            .into_iter()
            .map(|(type_id, count)| (self.relationships.type_name(type_id).to_string(), count))
            .collect()
    }

    pub(crate) fn node_count(&self, type_name: &str) -> u64 {
        self.nodes.count(self.nodes.type_id(type_name))
    }

    pub(crate) fn rel_count(&self, type_name: &str) -> u64 {
        self.relationships.count(self.relationships.type_id(type_name))
    }

    /// Resolves relationship type names to ids for traversal filtering.
    ///
    /// Unknown names are dropped; asking only for unknown types therefore
    /// matches nothing.
    pub(crate) fn resolve_rel_types(&self, names: &[String]) -> RelTypeFilter {
        if names.is_empty() {
            return None;
        }
        Some(
            names
                .iter()
                .map(|name| self.relationships.type_id(name))
                .filter(|id| *id != 0)
                .collect(),
        )
    }

    // ---- nodes ------------------------------------------------------------

    /// Adds an empty node of an already-declared type.
    pub(crate) fn node_add_empty(&mut self, type_id: u16, key: &str) -> Result<u64> {
        let id = self.nodes.add(type_id, key)?;
        tracing::debug!(shard = self.shard_id, id, key, "node added");
        Ok(id)
    }

    /// Adds a node and applies a JSON property object.
    ///
    /// Property coercion failures are local: failing entries are tombstoned
    /// and the node keeps the entries that applied cleanly.
    pub(crate) fn node_add(
        &mut self,
        type_id: u16,
        key: &str,
        properties: &serde_json::Map<String, Value>,
    ) -> Result<u64> {
        let id = self.node_add_empty(type_id, key)?;
        self.nodes
            .property_store_mut(type_id)
            .set_properties_from_json(ids::position_of(id), properties);
        Ok(id)
    }

    /// True when the external id names a live node on this shard.
    pub(crate) fn node_alive(&self, external_id: u64) -> bool {
        self.nodes
            .contains(ids::type_of(external_id), ids::position_of(external_id))
    }

    pub(crate) fn node_get(&self, external_id: u64) -> Option<Node> {
        self.nodes
            .node_at(ids::type_of(external_id), ids::position_of(external_id))
    }

    pub(crate) fn node_get_by_key(&self, type_id: u16, key: &str) -> Option<Node> {
        let position = self.nodes.position_for_key(type_id, key)?;
        self.nodes.node_at(type_id, position)
    }

    pub(crate) fn node_id_by_key(&self, type_id: u16, key: &str) -> u64 {
        self.nodes.node_id(type_id, key)
    }

    /// Starts a node removal: deletes the node and every relationship homed
    /// here, and reports the cross-shard work left to do.
    ///
    /// Returns `None` when the node is not live on this shard.
    pub(crate) fn node_remove_start(&mut self, external_id: u64) -> Option<NodeRemoveCascade> {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return None;
        }

        let (outgoing, incoming) = self.nodes.take_groups(type_id, position);
        let mut cascade = NodeRemoveCascade::default();

        // Outgoing relationships are homed here: kill the records now and
        // queue the neighbors' incoming-link detachments.
        for group in outgoing {
            for link in group.links {
                self.relationships
                    .remove(ids::type_of(link.rel_id), ids::position_of(link.rel_id));
                cascade.detach_incoming.push((link.node_id, link.rel_id));
            }
        }
        // Incoming relationships are homed on their starting node's shard.
        for group in incoming {
            for link in group.links {
                if ids::shard_of(link.rel_id) == self.shard_id {
                    self.rel_remove_half(link.rel_id);
                } else {
                    cascade.remove_remote.push(link.rel_id);
                }
            }
        }

        self.nodes.remove(type_id, position);
        tracing::debug!(shard = self.shard_id, id = external_id, "node removed");
        Some(cascade)
    }

    /// Removes a link to `rel_id` from a node's incoming groups.
    pub(crate) fn detach_incoming_link(&mut self, node_id: u64, rel_id: u64) -> bool {
        self.nodes
            .detach_incoming(ids::type_of(node_id), ids::position_of(node_id), rel_id)
    }

    /// Removes a relationship record homed here together with its starting
    /// node's outgoing link. Used when the ending endpoint is already gone.
    pub(crate) fn rel_remove_half(&mut self, rel_id: u64) -> bool {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        let from = self.relationships.starting_node_id(type_id, position);
        if !self.relationships.remove(type_id, position) {
            return false;
        }
        self.nodes
            .detach_outgoing(ids::type_of(from), ids::position_of(from), rel_id);
        true
    }

    // ---- node properties --------------------------------------------------

    pub(crate) fn node_property_get(&self, external_id: u64, property: &str) -> PropertyValue {
        self.nodes.node_property(
            ids::type_of(external_id),
            ids::position_of(external_id),
            property,
        )
    }

    pub(crate) fn node_property_set(
        &mut self,
        external_id: u64,
        property: &str,
        value: &PropertyValue,
    ) -> bool {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return false;
        }
        let tag = match self.nodes.property_store(type_id).property_type(property) {
            Some(tag) => tag,
            None => return false,
        };
        let value = crate::value::normalize_for(tag, value);
        self.nodes
            .property_store_mut(type_id)
            .set_value(property, position, &value)
    }

    pub(crate) fn node_property_set_from_json(
        &mut self,
        external_id: u64,
        property: &str,
        raw: &Value,
    ) -> bool {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return false;
        }
        self.nodes
            .property_store_mut(type_id)
            .set_property_from_json(property, position, raw)
    }

    pub(crate) fn node_property_delete(&mut self, external_id: u64, property: &str) -> bool {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return false;
        }
        self.nodes
            .property_store_mut(type_id)
            .delete_property(property, position)
    }

    pub(crate) fn node_properties_get(
        &self,
        external_id: u64,
    ) -> std::collections::HashMap<String, PropertyValue> {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return std::collections::HashMap::new();
        }
        self.nodes.property_store(type_id).get_all(position)
    }

    pub(crate) fn node_properties_set_from_json(
        &mut self,
        external_id: u64,
        object: &serde_json::Map<String, Value>,
    ) -> bool {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return false;
        }
        self.nodes
            .property_store_mut(type_id)
            .set_properties_from_json(position, object)
    }

    /// Clears the row, then applies the object: a reset, not a merge.
    pub(crate) fn node_properties_reset_from_json(
        &mut self,
        external_id: u64,
        object: &serde_json::Map<String, Value>,
    ) -> bool {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return false;
        }
        let store = self.nodes.property_store_mut(type_id);
        store.delete_row(position);
        store.set_properties_from_json(position, object)
    }

    pub(crate) fn node_properties_delete(&mut self, external_id: u64) -> bool {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        if !self.nodes.contains(type_id, position) {
            return false;
        }
        self.nodes.property_store_mut(type_id).delete_row(position)
    }

    // ---- relationships ----------------------------------------------------

    /// Creates a relationship record homed on this shard and splices the
    /// starting node's outgoing link. The incoming side is spliced
    /// separately (locally when the ending node lives here too).
    pub(crate) fn rel_add_local(
        &mut self,
        rel_type_id: u16,
        from_id: u64,
        to_id: u64,
        properties: &serde_json::Map<String, Value>,
    ) -> Result<u64> {
        if !self.node_alive(from_id) {
            return Err(crate::error::Error::NotFound(format!(
                "starting node {from_id}"
            )));
        }
        let rel_id = self.relationships.add(rel_type_id, from_id, to_id)?;
        self.relationships
            .property_store_mut(rel_type_id)
            .set_properties_from_json(ids::position_of(rel_id), properties);
        self.nodes.attach_outgoing(
            ids::type_of(from_id),
            ids::position_of(from_id),
            rel_type_id,
            Link::new(to_id, rel_id),
        );
        tracing::debug!(shard = self.shard_id, rel_id, from_id, to_id, "relationship added");
        Ok(rel_id)
    }

    /// Splices an incoming link on the ending node's shard.
    pub(crate) fn attach_incoming_link(
        &mut self,
        node_id: u64,
        from_id: u64,
        rel_type_id: u16,
        rel_id: u64,
    ) -> bool {
        self.nodes.attach_incoming(
            ids::type_of(node_id),
            ids::position_of(node_id),
            rel_type_id,
            Link::new(from_id, rel_id),
        )
    }

    /// Undoes `rel_add_local` when the remote incoming splice failed.
    pub(crate) fn rel_add_rollback(&mut self, rel_id: u64, from_id: u64) {
        self.nodes
            .detach_outgoing(ids::type_of(from_id), ids::position_of(from_id), rel_id);
        self.relationships
            .remove(ids::type_of(rel_id), ids::position_of(rel_id));
        tracing::warn!(shard = self.shard_id, rel_id, "relationship add rolled back");
    }

    /// Removes a relationship homed here and detaches the local sides.
    ///
    /// Returns `Some(ending_node)` when the ending node lives on another
    /// shard and its incoming link still needs detaching; `None` when done.
    pub(crate) fn rel_remove_start(&mut self, rel_id: u64) -> Option<Option<u64>> {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return None;
        }
        let from = self.relationships.starting_node_id(type_id, position);
        let to = self.relationships.ending_node_id(type_id, position);
        self.relationships.remove(type_id, position);
        self.nodes
            .detach_outgoing(ids::type_of(from), ids::position_of(from), rel_id);
        if ids::shard_of(to) == self.shard_id {
            self.nodes
                .detach_incoming(ids::type_of(to), ids::position_of(to), rel_id);
            Some(None)
        } else {
            Some(Some(to))
        }
    }

    pub(crate) fn rel_get(&self, rel_id: u64) -> Option<Relationship> {
        self.relationships
            .relationship_at(ids::type_of(rel_id), ids::position_of(rel_id))
    }

    pub(crate) fn rel_property_get(&self, rel_id: u64, property: &str) -> PropertyValue {
        self.relationships
            .relationship_property(ids::type_of(rel_id), ids::position_of(rel_id), property)
    }

    pub(crate) fn rel_property_set(
        &mut self,
        rel_id: u64,
        property: &str,
        value: &PropertyValue,
    ) -> bool {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return false;
        }
        let tag = match self
            .relationships
            .property_store(type_id)
            .property_type(property)
        {
            Some(tag) => tag,
            None => return false,
        };
        let value = crate::value::normalize_for(tag, value);
        self.relationships
            .property_store_mut(type_id)
            .set_value(property, position, &value)
    }

    pub(crate) fn rel_property_set_from_json(
        &mut self,
        rel_id: u64,
        property: &str,
        raw: &Value,
    ) -> bool {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return false;
        }
        self.relationships
            .property_store_mut(type_id)
            .set_property_from_json(property, position, raw)
    }

    pub(crate) fn rel_property_delete(&mut self, rel_id: u64, property: &str) -> bool {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return false;
        }
        self.relationships
            .property_store_mut(type_id)
            .delete_property(property, position)
    }

    pub(crate) fn rel_properties_get(
        &self,
        rel_id: u64,
    ) -> std::collections::HashMap<String, PropertyValue> {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return std::collections::HashMap::new();
        }
        self.relationships.property_store(type_id).get_all(position)
    }

    pub(crate) fn rel_properties_set_from_json(
        &mut self,
        rel_id: u64,
        object: &serde_json::Map<String, Value>,
    ) -> bool {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return false;
        }
        self.relationships
            .property_store_mut(type_id)
            .set_properties_from_json(position, object)
    }

    pub(crate) fn rel_properties_reset_from_json(
        &mut self,
        rel_id: u64,
        object: &serde_json::Map<String, Value>,
    ) -> bool {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return false;
        }
        let store = self.relationships.property_store_mut(type_id);
        store.delete_row(position);
        store.set_properties_from_json(position, object)
    }

    pub(crate) fn rel_properties_delete(&mut self, rel_id: u64) -> bool {
        let type_id = ids::type_of(rel_id);
        let position = ids::position_of(rel_id);
        if !self.relationships.contains(type_id, position) {
            return false;
        }
        self.relationships
            .property_store_mut(type_id)
            .delete_row(position)
    }

    // ---- traversal kernel -------------------------------------------------

    /// Counts links in the selected groups of a node on this shard.
    pub(crate) fn node_degree(
        &self,
        external_id: u64,
        direction: Direction,
        filter: &RelTypeFilter,
    ) -> u64 {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        let mut degree = 0u64;
        if direction.includes_out() {
            degree += count_links(self.nodes.outgoing_groups(type_id, position), filter);
        }
        if direction.includes_in() {
            degree += count_links(self.nodes.incoming_groups(type_id, position), filter);
        }
        degree
    }

    /// Links of a node in the selected direction(s), outgoing first.
    pub(crate) fn node_links(
        &self,
        external_id: u64,
        direction: Direction,
        filter: &RelTypeFilter,
    ) -> Vec<Link> {
        let type_id = ids::type_of(external_id);
        let position = ids::position_of(external_id);
        let mut links = Vec::new();
        if direction.includes_out() {
            collect_links(self.nodes.outgoing_groups(type_id, position), filter, &mut links);
        }
        if direction.includes_in() {
            collect_links(self.nodes.incoming_groups(type_id, position), filter, &mut links);
        }
        links
    }

    /// Relationship ids connecting `a` (on this shard) to `b`, honoring
    /// direction and type filter. Scanning `a`'s groups is enough: link
    /// identity alone names the relationship wherever it is homed.
    pub(crate) fn node_connected(
        &self,
        a: u64,
        b: u64,
        direction: Direction,
        filter: &RelTypeFilter,
    ) -> Vec<u64> {
        let type_id = ids::type_of(a);
        let position = ids::position_of(a);
        let mut rel_ids = Vec::new();
        if direction.includes_out() {
            for group in self.nodes.outgoing_groups(type_id, position) {
                if !crate::graph::type_admitted(filter, group.rel_type_id) {
                    continue;
                }
                rel_ids.extend(
                    group
                        .links
                        .iter()
                        .filter(|link| link.node_id == b)
                        .map(|link| link.rel_id),
                );
            }
        }
        if direction.includes_in() {
            for group in self.nodes.incoming_groups(type_id, position) {
                if !crate::graph::type_admitted(filter, group.rel_type_id) {
                    continue;
                }
                rel_ids.extend(
                    group
                        .links
                        .iter()
                        .filter(|link| link.node_id == b)
                        .map(|link| link.rel_id),
                );
            }
        }
        rel_ids
    }

    // ---- scans ------------------------------------------------------------

    pub(crate) fn node_ids_for_type(&self, type_id: u16, skip: u64, limit: u64) -> Vec<u64> {
        self.nodes.ids(type_id, skip, limit)
    }

    pub(crate) fn nodes_for_type(&self, type_id: u16, skip: u64, limit: u64) -> Vec<Node> {
        self.nodes.nodes(type_id, skip, limit)
    }

    pub(crate) fn all_nodes(&self, skip: u64, limit: u64) -> Vec<Node> {
        self.nodes.all_nodes(skip, limit)
    }

    pub(crate) fn rel_ids_for_type(&self, type_id: u16, skip: u64, limit: u64) -> Vec<u64> {
        self.relationships.rel_ids(type_id, skip, limit)
    }

    pub(crate) fn rels_for_type(&self, type_id: u16, skip: u64, limit: u64) -> Vec<Relationship> {
        self.relationships.relationships(type_id, skip, limit)
    }

    pub(crate) fn all_rels(&self, skip: u64, limit: u64) -> Vec<Relationship> {
        self.relationships.all_relationships(skip, limit)
    }

    pub(crate) fn node_live_count(&self) -> u64 {
        self.nodes.counts().values().sum()
    }

    pub(crate) fn rel_live_count(&self) -> u64 {
        self.relationships.counts().values().sum()
    }

    // ---- find / filter ----------------------------------------------------

    pub(crate) fn find_node_count(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let type_id = self.nodes.type_id(type_name);
        self.nodes.find_count(type_id, property, operation, value)
    }

    pub(crate) fn find_node_ids(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let type_id = self.nodes.type_id(type_name);
        self.nodes
            .find_ids(type_id, property, operation, value, skip, limit)
    }

    pub(crate) fn find_nodes(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<Node> {
        let type_id = self.nodes.type_id(type_name);
        self.nodes
            .find_nodes(type_id, property, operation, value, skip, limit)
    }

    pub(crate) fn find_rel_count(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let type_id = self.relationships.type_id(type_name);
        self.relationships
            .find_count(type_id, property, operation, value)
    }

    pub(crate) fn find_rel_ids(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let type_id = self.relationships.type_id(type_name);
        self.relationships
            .find_ids(type_id, property, operation, value, skip, limit)
    }

    pub(crate) fn find_rels(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<Relationship> {
        let type_id = self.relationships.type_id(type_name);
        self.relationships
            .find_relationships(type_id, property, operation, value, skip, limit)
    }

    pub(crate) fn filter_node_count(
        &self,
        ids: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let type_id = self.nodes.type_id(type_name);
        self.nodes
            .filter_count(ids, type_id, property, operation, value)
    }

    pub(crate) fn filter_node_ids(
        &self,
        ids: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<u64> {
        let type_id = self.nodes.type_id(type_name);
        self.nodes
            .filter_ids(ids, type_id, property, operation, value, skip, limit)
    }

    pub(crate) fn filter_nodes(
        &self,
        ids: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Vec<Node> {
        let type_id = self.nodes.type_id(type_name);
        self.nodes
            .filter_nodes(ids, type_id, property, operation, value, skip, limit)
    }

    pub(crate) fn filter_rel_count(
        &self,
        ids: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> u64 {
        let type_id = self.relationships.type_id(type_name);
        self.relationships
            .filter_count(ids, type_id, property, operation, value)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn filter_rel_ids(
        &self,
        ids: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
        sort: SortOrder,
    ) -> Vec<u64> {
        let type_id = self.relationships.type_id(type_name);
        self.relationships
            .filter_ids(ids, type_id, property, operation, value, skip, limit, sort)
    }

    /// Sorted-merge support: matching `(id, value)` pairs truncated to the
    /// window, for the runtime to merge across shards.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn filter_rel_pairs(
        &self,
        ids: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        window: u64,
        sort: SortOrder,
    ) -> Vec<(u64, PropertyValue)> {
        let type_id = self.relationships.type_id(type_name);
        self.relationships
            .filter_pairs(ids, type_id, property, operation, value, window, sort)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn filter_rels(
        &self,
        ids: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
        sort: SortOrder,
    ) -> Vec<Relationship> {
        let type_id = self.relationships.type_id(type_name);
        self.relationships
            .filter_relationships(ids, type_id, property, operation, value, skip, limit, sort)
    }
}

fn count_links(groups: &[Group], filter: &RelTypeFilter) -> u64 {
    groups
        .iter()
        .filter(|group| crate::graph::type_admitted(filter, group.rel_type_id))
        .map(|group| group.links.len() as u64)
        .sum()
}

fn collect_links(groups: &[Group], filter: &RelTypeFilter, out: &mut Vec<Link>) {
    for group in groups {
        if crate::graph::type_admitted(filter, group.rel_type_id) {
            out.extend(group.links.iter().copied());
        }
    }
}

