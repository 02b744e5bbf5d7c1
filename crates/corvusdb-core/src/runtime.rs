//! Shard runtime: mailbox threads, cross-shard dispatch, peered fan-out.
//!
//! One OS thread per shard owns that shard's state outright and drains a
//! channel of closures; there is no shared mutable graph state. The `Graph`
//! handle routes every operation to the owning shard, splits cross-shard
//! mutations into per-shard halves, and merges fan-out results in
//! shard-index order so cross-shard ordering is deterministic.
//!
//! The type catalog is written on shard 0 (the authority) and mirrored to
//! every other shard before the new id is used anywhere.

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::graph::{Direction, Node, Relationship, SortOrder};
use crate::ids;
use crate::predicate::Operation;
use crate::shard::Shard;
use crate::value::{compare_values, DataType, PropertyValue};
use crossbeam_channel::{bounded, unbounded, Sender};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

type ShardTask = Box<dyn FnOnce(&mut Shard) + Send>;

struct ShardHandle {
    sender: Sender<ShardTask>,
    thread: Option<JoinHandle<()>>,
}

/// The graph engine: a set of shards and the routing logic over them.
pub struct Graph {
    config: GraphConfig,
    shard_count: u16,
    handles: Vec<ShardHandle>,
    stopping: Arc<AtomicBool>,
}

impl Graph {
    /// Starts a graph with the given configuration, spawning one mailbox
    /// thread per shard.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the configuration does not validate and
    /// `Error::Io` when a shard thread cannot be spawned.
    pub fn start(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        let shard_count = config.shard_count();
        let mut handles = Vec::with_capacity(usize::from(shard_count));
        for shard_id in 0..shard_count {
            let (sender, receiver) = match config.mailbox_capacity {
                Some(capacity) => bounded::<ShardTask>(capacity),
                None => unbounded::<ShardTask>(),
            };
            let thread = std::thread::Builder::new()
                .name(format!("{}-{shard_id}", config.thread_name_prefix))
                .spawn(move || {
                    let mut shard = Shard::new(shard_id);
                    while let Ok(task) = receiver.recv() {
                        task(&mut shard);
                    }
                })?;
            handles.push(ShardHandle {
                sender,
                thread: Some(thread),
            });
        }
        tracing::info!(shards = shard_count, "graph started");
        Ok(Self {
            config,
            shard_count,
            handles,
            stopping: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Starts a graph with default configuration.
    ///
    /// # Errors
    ///
    /// See [`Graph::start`].
    pub fn start_default() -> Result<Self> {
        Self::start(GraphConfig::default())
    }

    /// Number of shards.
    #[must_use]
    pub fn shard_count(&self) -> u16 {
        self.shard_count
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Stops the shard threads. New submissions observe cancellation and
    /// surface `Error::Cancelled`; queued work is drained before exit.
    pub fn stop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        for handle in &mut self.handles {
            // Swapping the sender for a disconnected one drops the mailbox's
            // last producer, which ends the thread's recv loop.
            let (dead_sender, _) = bounded::<ShardTask>(0);
            handle.sender = dead_sender;
            if let Some(thread) = handle.thread.take() {
                let _ = thread.join();
            }
        }
        tracing::info!("graph stopped");
    }

    /// Empties every shard.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` or `Error::ShardUnavailable` during
    /// shutdown.
    pub fn clear(&self) -> Result<()> {
        self.peered(|shard| shard.clear()).map(|_| ())
    }

    // ---- dispatch ---------------------------------------------------------

    fn on_shard<R, F>(&self, shard_id: u16, task: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Shard) -> R + Send + 'static,
    {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }
        let handle = self
            .handles
            .get(usize::from(shard_id))
            .ok_or_else(|| Error::InvalidArgument(format!("shard {shard_id} out of range")))?;
        let (tx, rx) = bounded(1);
        handle
            .sender
            .send(Box::new(move |shard| {
                let _ = tx.send(task(shard));
            }))
            .map_err(|_| Error::ShardUnavailable(shard_id.to_string()))?;
        rx.recv()
            .map_err(|_| Error::ShardUnavailable(shard_id.to_string()))
    }

    /// Submits a task to every shard and collects the results in
    /// shard-index order.
    fn peered<R, F>(&self, task: F) -> Result<Vec<R>>
    where
        R: Send + 'static,
        F: Fn(&mut Shard) -> R + Clone + Send + 'static,
    {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }
        let mut receivers = Vec::with_capacity(self.handles.len());
        for (shard_id, handle) in self.handles.iter().enumerate() {
            let (tx, rx) = bounded(1);
            let task = task.clone();
            handle
                .sender
                .send(Box::new(move |shard| {
                    let _ = tx.send(task(shard));
                }))
                .map_err(|_| Error::ShardUnavailable(shard_id.to_string()))?;
            receivers.push(rx);
        }
        receivers
            .into_iter()
            .enumerate()
            .map(|(shard_id, rx)| {
                rx.recv()
                    .map_err(|_| Error::ShardUnavailable(shard_id.to_string()))
            })
            .collect()
    }

    fn shard_for_key(&self, key: &str) -> u16 {
        ids::shard_for_key(key, self.shard_count)
    }

    fn owner_of(&self, external_id: u64) -> Result<u16> {
        let shard_id = ids::shard_of(external_id);
        if shard_id >= self.shard_count {
            return Err(Error::InvalidArgument(format!(
                "id {external_id} names shard {shard_id}, but only {} exist",
                self.shard_count
            )));
        }
        Ok(shard_id)
    }

    // ---- schema -----------------------------------------------------------

    /// All node type names, from the authority shard.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_types_list(&self) -> Result<Vec<String>> {
        self.on_shard(0, |shard| shard.node_type_names())
    }

    /// All relationship type names, from the authority shard.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_types_list(&self) -> Result<Vec<String>> {
        self.on_shard(0, |shard| shard.rel_type_names())
    }

    /// Property schema of a node type, name → external type name.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; an unknown type yields an empty map.
    pub fn node_type_get(&self, type_name: &str) -> Result<BTreeMap<String, String>> {
        let type_name = type_name.to_string();
        self.on_shard(0, move |shard| shard.node_property_schema(&type_name))
    }

    /// Property schema of a relationship type.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_type_get(&self, type_name: &str) -> Result<BTreeMap<String, String>> {
        let type_name = type_name.to_string();
        self.on_shard(0, move |shard| shard.rel_property_schema(&type_name))
    }

    /// Adds a node type. Allocated on the authority shard and mirrored to
    /// every shard before returning. `Ok(false)` when the type existed.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name; dispatch errors otherwise.
    pub fn node_type_add(&self, type_name: &str) -> Result<bool> {
        if type_name.is_empty() {
            return Err(Error::InvalidArgument("empty type name".into()));
        }
        let name = type_name.to_string();
        let existing = {
            let name = name.clone();
            self.on_shard(0, move |shard| shard.node_type_id(&name))?
        };
        if existing != 0 {
            return Ok(false);
        }
        self.ensure_node_type(&name).map(|_| true)
    }

    /// Adds a relationship type, authority-first. `Ok(false)` when it existed.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name; dispatch errors otherwise.
    pub fn rel_type_add(&self, type_name: &str) -> Result<bool> {
        if type_name.is_empty() {
            return Err(Error::InvalidArgument("empty type name".into()));
        }
        let name = type_name.to_string();
        let existing = {
            let name = name.clone();
            self.on_shard(0, move |shard| shard.rel_type_id(&name))?
        };
        if existing != 0 {
            return Ok(false);
        }
        self.ensure_rel_type(&name).map(|_| true)
    }

    /// Resolves a node type id, allocating and mirroring it when new.
    fn ensure_node_type(&self, type_name: &str) -> Result<u16> {
        let name = type_name.to_string();
        let type_id = {
            let name = name.clone();
            self.on_shard(0, move |shard| shard.node_type_insert_or_get(&name))?
        };
        // Mirror before anyone references the id.
        for shard_id in 1..self.shard_count {
            let name = name.clone();
            self.on_shard(shard_id, move |shard| {
                shard.node_type_mirror(&name, type_id)
            })?;
        }
        Ok(type_id)
    }

    fn ensure_rel_type(&self, type_name: &str) -> Result<u16> {
        let name = type_name.to_string();
        let type_id = {
            let name = name.clone();
            self.on_shard(0, move |shard| shard.rel_type_insert_or_get(&name))?
        };
        for shard_id in 1..self.shard_count {
            let name = name.clone();
            self.on_shard(shard_id, move |shard| shard.rel_type_mirror(&name, type_id))?;
        }
        Ok(type_id)
    }

    /// Deletes a node type everywhere. Succeeds only when no live node of
    /// the type exists on any shard.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a non-empty type reports `Ok(false)`.
    pub fn node_type_delete(&self, type_name: &str) -> Result<bool> {
        let name = type_name.to_string();
        let live: u64 = {
            let name = name.clone();
            self.peered(move |shard| shard.node_count(&name))?.iter().sum()
        };
        if live != 0 {
            return Ok(false);
        }
        let results = self.peered(move |shard| shard.node_type_delete(&name))?;
        Ok(results.into_iter().all(|deleted| deleted))
    }

    /// Deletes a relationship type everywhere when no live relationship of
    /// it remains.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_type_delete(&self, type_name: &str) -> Result<bool> {
        let name = type_name.to_string();
        let live: u64 = {
            let name = name.clone();
            self.peered(move |shard| shard.rel_count(&name))?.iter().sum()
        };
        if live != 0 {
            return Ok(false);
        }
        let results = self.peered(move |shard| shard.rel_type_delete(&name))?;
        Ok(results.into_iter().all(|deleted| deleted))
    }

    /// Declares a node property column on every shard.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unknown data-type name or unknown type;
    /// `AlreadyExists` when the property exists with a different tag.
    pub fn node_property_add(
        &self,
        type_name: &str,
        property: &str,
        data_type: &str,
    ) -> Result<DataType> {
        let tag = DataType::from_name(data_type).ok_or_else(|| {
            Error::InvalidArgument(format!("unknown data type '{data_type}'"))
        })?;
        let name = type_name.to_string();
        let known = {
            let name = name.clone();
            self.on_shard(0, move |shard| shard.node_type_id(&name))?
        };
        if known == 0 {
            return Err(Error::InvalidArgument(format!(
                "unknown node type '{type_name}'"
            )));
        }
        let property_owned = property.to_string();
        let results = self.peered(move |shard| {
            shard.node_property_type_set(&name, &property_owned, tag)
        })?;
        if results.iter().all(Option::is_some) {
            Ok(tag)
        } else {
            Err(Error::AlreadyExists(format!(
                "property '{property}' on '{type_name}' with a different type"
            )))
        }
    }

    /// Declares a relationship property column on every shard.
    ///
    /// # Errors
    ///
    /// See [`Graph::node_property_add`].
    pub fn rel_property_add(
        &self,
        type_name: &str,
        property: &str,
        data_type: &str,
    ) -> Result<DataType> {
        let tag = DataType::from_name(data_type).ok_or_else(|| {
            Error::InvalidArgument(format!("unknown data type '{data_type}'"))
        })?;
        let name = type_name.to_string();
        let known = {
            let name = name.clone();
            self.on_shard(0, move |shard| shard.rel_type_id(&name))?
        };
        if known == 0 {
            return Err(Error::InvalidArgument(format!(
                "unknown relationship type '{type_name}'"
            )));
        }
        let property_owned = property.to_string();
        let results = self.peered(move |shard| {
            shard.rel_property_type_set(&name, &property_owned, tag)
        })?;
        if results.iter().all(Option::is_some) {
            Ok(tag)
        } else {
            Err(Error::AlreadyExists(format!(
                "property '{property}' on '{type_name}' with a different type"
            )))
        }
    }

    /// Drops a node property column everywhere.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_property_delete(&self, type_name: &str, property: &str) -> Result<bool> {
        let name = type_name.to_string();
        let property = property.to_string();
        let results =
            self.peered(move |shard| shard.node_property_type_delete(&name, &property))?;
        Ok(results.into_iter().all(|removed| removed))
    }

    /// Drops a relationship property column everywhere.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_property_delete(&self, type_name: &str, property: &str) -> Result<bool> {
        let name = type_name.to_string();
        let property = property.to_string();
        let results =
            self.peered(move |shard| shard.rel_property_type_delete(&name, &property))?;
        Ok(results.into_iter().all(|removed| removed))
    }

    /// Live node counts by type, summed across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_counts(&self) -> Result<BTreeMap<String, u64>> {
        let per_shard = self.peered(|shard| shard.node_counts())?;
        let mut totals = BTreeMap::new();
        for counts in per_shard {
            for (type_name, count) in counts {
                *totals.entry(type_name).or_insert(0) += count;
            }
        }
        Ok(totals)
    }

    /// Live relationship counts by type, summed across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_counts(&self) -> Result<BTreeMap<String, u64>> {
        let per_shard = self.peered(|shard| shard.rel_counts())?;
        let mut totals = BTreeMap::new();
        for counts in per_shard {
            for (type_name, count) in counts {
                *totals.entry(type_name).or_insert(0) += count;
            }
        }
        Ok(totals)
    }

    // ---- nodes ------------------------------------------------------------

    /// Adds an empty node; the key's hash picks the owning shard.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` for a live duplicate key, `InvalidArgument` for an
    /// empty type or key, `Overflow` when the shard's position space is
    /// exhausted.
    pub fn node_add_empty(&self, type_name: &str, key: &str) -> Result<u64> {
        if type_name.is_empty() || key.is_empty() {
            return Err(Error::InvalidArgument("empty type or key".into()));
        }
        let type_id = self.ensure_node_type(type_name)?;
        let shard_id = self.shard_for_key(key);
        let key = key.to_string();
        self.on_shard(shard_id, move |shard| shard.node_add_empty(type_id, &key))?
    }

    /// Adds a node with a JSON property object.
    ///
    /// Coercion failures tombstone their entries and do not fail the add.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `properties` is not a JSON object; otherwise
    /// as [`Graph::node_add_empty`].
    pub fn node_add(&self, type_name: &str, key: &str, properties: &Value) -> Result<u64> {
        if type_name.is_empty() || key.is_empty() {
            return Err(Error::InvalidArgument("empty type or key".into()));
        }
        let object = properties
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("properties must be a JSON object".into()))?
            .clone();
        let type_id = self.ensure_node_type(type_name)?;
        let shard_id = self.shard_for_key(key);
        let key = key.to_string();
        self.on_shard(shard_id, move |shard| shard.node_add(type_id, &key, &object))?
    }

    /// Fetches a node by external id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no live node carries the id.
    pub fn node_get(&self, external_id: u64) -> Result<Node> {
        let shard_id = self.owner_of(external_id)?;
        self.on_shard(shard_id, move |shard| shard.node_get(external_id))?
            .ok_or_else(|| Error::NotFound(format!("node {external_id}")))
    }

    /// Fetches a node by `(type, key)`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the key is not live in the type.
    pub fn node_get_by_key(&self, type_name: &str, key: &str) -> Result<Node> {
        let shard_id = self.shard_for_key(key);
        let type_name_owned = type_name.to_string();
        let key_owned = key.to_string();
        self.on_shard(shard_id, move |shard| {
            let type_id = shard.node_type_id(&type_name_owned);
            shard.node_get_by_key(type_id, &key_owned)
        })?
        .ok_or_else(|| Error::NotFound(format!("node ({type_name}, {key})")))
    }

    /// External id for `(type, key)`, or 0 when absent.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_id(&self, type_name: &str, key: &str) -> Result<u64> {
        let shard_id = self.shard_for_key(key);
        let type_name = type_name.to_string();
        let key = key.to_string();
        self.on_shard(shard_id, move |shard| {
            let type_id = shard.node_type_id(&type_name);
            shard.node_id_by_key(type_id, &key)
        })
    }

    /// Removes a node and cascades through every incident relationship on
    /// every shard.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reports `Ok(false)`.
    pub fn node_remove(&self, external_id: u64) -> Result<bool> {
        let home = self.owner_of(external_id)?;
        let Some(cascade) =
            self.on_shard(home, move |shard| shard.node_remove_start(external_id))?
        else {
            return Ok(false);
        };

        // Neighbors drop their incoming links to the dead relationships.
        for (node_id, rel_id) in cascade.detach_incoming {
            let shard_id = self.owner_of(node_id)?;
            self.on_shard(shard_id, move |shard| {
                shard.detach_incoming_link(node_id, rel_id)
            })?;
        }
        // Relationships that ended at the removed node die on their home
        // shard, along with their starting node's outgoing link.
        for rel_id in cascade.remove_remote {
            let shard_id = self.owner_of(rel_id)?;
            self.on_shard(shard_id, move |shard| shard.rel_remove_half(rel_id))?;
        }
        Ok(true)
    }

    /// Removes a node addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reports `Ok(false)`.
    pub fn node_remove_by_key(&self, type_name: &str, key: &str) -> Result<bool> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(false);
        }
        self.node_remove(id)
    }

    /// All live nodes of one type, paged deterministically across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn nodes_all(&self, type_name: &str, skip: u64, limit: u64) -> Result<Vec<Node>> {
        let name = type_name.to_string();
        let counts = {
            let name = name.clone();
            self.peered(move |shard| shard.node_count(&name))?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let name = name.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                let type_id = shard.node_type_id(&name);
                shard.nodes_for_type(type_id, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// All live nodes of every type, paged deterministically across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn nodes_all_types(&self, skip: u64, limit: u64) -> Result<Vec<Node>> {
        let counts = self.peered(|shard| shard.node_live_count())?;
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let mut chunk =
                self.on_shard(shard_id, move |shard| shard.all_nodes(window.0, window.1))?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// External ids of live nodes of one type, paged across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_ids(&self, type_name: &str, skip: u64, limit: u64) -> Result<Vec<u64>> {
        let name = type_name.to_string();
        let counts = {
            let name = name.clone();
            self.peered(move |shard| shard.node_count(&name))?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let name = name.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                let type_id = shard.node_type_id(&name);
                shard.node_ids_for_type(type_id, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    // ---- node properties --------------------------------------------------

    /// One property of a node.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node or property reads as `Null`.
    pub fn node_property_get(&self, external_id: u64, property: &str) -> Result<PropertyValue> {
        let shard_id = self.owner_of(external_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.node_property_get(external_id, &property)
        })
    }

    /// Sets one typed property of a node.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; schema mismatches report `Ok(false)`.
    pub fn node_property_set(
        &self,
        external_id: u64,
        property: &str,
        value: PropertyValue,
    ) -> Result<bool> {
        let shard_id = self.owner_of(external_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.node_property_set(external_id, &property, &value)
        })
    }

    /// Sets one property of a node from raw JSON.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; coercion failures report `Ok(false)`.
    pub fn node_property_set_from_json(
        &self,
        external_id: u64,
        property: &str,
        value: Value,
    ) -> Result<bool> {
        let shard_id = self.owner_of(external_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.node_property_set_from_json(external_id, &property, &value)
        })
    }

    /// Tombstones one property of a node.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_property_delete(&self, external_id: u64, property: &str) -> Result<bool> {
        let shard_id = self.owner_of(external_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.node_property_delete(external_id, &property)
        })
    }

    /// All properties of a node.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reads as an empty map.
    pub fn node_properties_get(
        &self,
        external_id: u64,
    ) -> Result<std::collections::HashMap<String, PropertyValue>> {
        let shard_id = self.owner_of(external_id)?;
        self.on_shard(shard_id, move |shard| shard.node_properties_get(external_id))
    }

    /// Applies a JSON object to a node's properties (merge semantics).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `properties` is not an object.
    pub fn node_properties_set_from_json(
        &self,
        external_id: u64,
        properties: &Value,
    ) -> Result<bool> {
        let object = properties
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("properties must be a JSON object".into()))?
            .clone();
        let shard_id = self.owner_of(external_id)?;
        self.on_shard(shard_id, move |shard| {
            shard.node_properties_set_from_json(external_id, &object)
        })
    }

    /// Clears then applies a JSON object to a node's properties.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `properties` is not an object.
    pub fn node_properties_reset_from_json(
        &self,
        external_id: u64,
        properties: &Value,
    ) -> Result<bool> {
        let object = properties
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("properties must be a JSON object".into()))?
            .clone();
        let shard_id = self.owner_of(external_id)?;
        self.on_shard(shard_id, move |shard| {
            shard.node_properties_reset_from_json(external_id, &object)
        })
    }

    /// Tombstones every property of a node.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_properties_delete(&self, external_id: u64) -> Result<bool> {
        let shard_id = self.owner_of(external_id)?;
        self.on_shard(shard_id, move |shard| {
            shard.node_properties_delete(external_id)
        })
    }

    /// One property of a node addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reads as `Null`.
    pub fn node_property_get_by_key(
        &self,
        type_name: &str,
        key: &str,
        property: &str,
    ) -> Result<PropertyValue> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(PropertyValue::Null);
        }
        self.node_property_get(id, property)
    }

    /// Sets one typed property of a node addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reports `Ok(false)`.
    pub fn node_property_set_by_key(
        &self,
        type_name: &str,
        key: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<bool> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(false);
        }
        self.node_property_set(id, property, value)
    }

    /// Tombstones one property of a node addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reports `Ok(false)`.
    pub fn node_property_delete_by_key(
        &self,
        type_name: &str,
        key: &str,
        property: &str,
    ) -> Result<bool> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(false);
        }
        self.node_property_delete(id, property)
    }

    /// All properties of a node addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reads as an empty map.
    pub fn node_properties_get_by_key(
        &self,
        type_name: &str,
        key: &str,
    ) -> Result<std::collections::HashMap<String, PropertyValue>> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(std::collections::HashMap::new());
        }
        self.node_properties_get(id)
    }

    /// Applies a JSON object to the properties of a node addressed by
    /// `(type, key)` (merge semantics).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `properties` is not an object.
    pub fn node_properties_set_by_key(
        &self,
        type_name: &str,
        key: &str,
        properties: &Value,
    ) -> Result<bool> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(false);
        }
        self.node_properties_set_from_json(id, properties)
    }

    /// Clears then applies a JSON object to a node addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `properties` is not an object.
    pub fn node_properties_reset_by_key(
        &self,
        type_name: &str,
        key: &str,
        properties: &Value,
    ) -> Result<bool> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(false);
        }
        self.node_properties_reset_from_json(id, properties)
    }

    /// Tombstones every property of a node addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node reports `Ok(false)`.
    pub fn node_properties_delete_by_key(&self, type_name: &str, key: &str) -> Result<bool> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(false);
        }
        self.node_properties_delete(id)
    }

    /// One property for a whole id list, `id → value`, skipping dead ids
    /// and unset slots. Ids are fetched from their owning shards in
    /// shard-index order.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_property_for_ids(
        &self,
        ids_in: &[u64],
        property: &str,
    ) -> Result<BTreeMap<u64, PropertyValue>> {
        let mut out = BTreeMap::new();
        for (shard_id, ids_here) in self.partition_ids(ids_in)? {
            let property = property.to_string();
            let fetched = self.on_shard(shard_id, move |shard| {
                ids_here
                    .iter()
                    .map(|id| (*id, shard.node_property_get(*id, &property)))
                    .filter(|(_, value)| !value.is_null())
                    .collect::<Vec<_>>()
            })?;
            out.extend(fetched);
        }
        Ok(out)
    }

    /// One property for a whole relationship id list, `id → value`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_property_for_ids(
        &self,
        ids_in: &[u64],
        property: &str,
    ) -> Result<BTreeMap<u64, PropertyValue>> {
        let mut out = BTreeMap::new();
        for (shard_id, ids_here) in self.partition_ids(ids_in)? {
            let property = property.to_string();
            let fetched = self.on_shard(shard_id, move |shard| {
                ids_here
                    .iter()
                    .map(|id| (*id, shard.rel_property_get(*id, &property)))
                    .filter(|(_, value)| !value.is_null())
                    .collect::<Vec<_>>()
            })?;
            out.extend(fetched);
        }
        Ok(out)
    }

    /// Full property rows for a node id list, `id → (property → value)`,
    /// skipping dead ids.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_properties_for_ids(
        &self,
        ids_in: &[u64],
    ) -> Result<BTreeMap<u64, std::collections::HashMap<String, PropertyValue>>> {
        let mut out = BTreeMap::new();
        for (shard_id, ids_here) in self.partition_ids(ids_in)? {
            let fetched = self.on_shard(shard_id, move |shard| {
                ids_here
                    .iter()
                    .filter(|id| shard.node_alive(**id))
                    .map(|id| (*id, shard.node_properties_get(*id)))
                    .collect::<Vec<_>>()
            })?;
            out.extend(fetched);
        }
        Ok(out)
    }

    /// Full property rows for a relationship id list.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_properties_for_ids(
        &self,
        ids_in: &[u64],
    ) -> Result<BTreeMap<u64, std::collections::HashMap<String, PropertyValue>>> {
        let mut out = BTreeMap::new();
        for (shard_id, ids_here) in self.partition_ids(ids_in)? {
            let fetched = self.on_shard(shard_id, move |shard| {
                ids_here
                    .iter()
                    .filter_map(|id| {
                        shard
                            .rel_get(*id)
                            .map(|rel| (*id, rel.properties().clone()))
                    })
                    .collect::<Vec<_>>()
            })?;
            out.extend(fetched);
        }
        Ok(out)
    }

    /// Live node count for one type, summed across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_count(&self, type_name: &str) -> Result<u64> {
        let name = type_name.to_string();
        Ok(self.peered(move |shard| shard.node_count(&name))?.iter().sum())
    }

    /// Live relationship count for one type, summed across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_count(&self, type_name: &str) -> Result<u64> {
        let name = type_name.to_string();
        Ok(self.peered(move |shard| shard.rel_count(&name))?.iter().sum())
    }

    // ---- relationships ----------------------------------------------------

    /// Adds a relationship homed on the starting node's shard.
    ///
    /// When the ending node lives elsewhere its shard splices the incoming
    /// link; the id is returned only after both sides acknowledge, and the
    /// home-side writes are rolled back if the splice fails.
    ///
    /// # Errors
    ///
    /// `NotFound` when either endpoint is dead, `InvalidArgument` for an
    /// empty type name or non-object properties.
    pub fn rel_add(
        &self,
        rel_type: &str,
        from_id: u64,
        to_id: u64,
        properties: &Value,
    ) -> Result<u64> {
        if rel_type.is_empty() {
            return Err(Error::InvalidArgument("empty relationship type".into()));
        }
        let object = properties
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("properties must be a JSON object".into()))?
            .clone();
        let rel_type_id = self.ensure_rel_type(rel_type)?;
        let home = self.owner_of(from_id)?;
        let to_shard = self.owner_of(to_id)?;

        if to_shard == home {
            // Both endpoints are local: all three writes happen in one task.
            return self.on_shard(home, move |shard| -> Result<u64> {
                if !shard.node_alive(to_id) {
                    return Err(Error::NotFound(format!("ending node {to_id}")));
                }
                let rel_id = shard.rel_add_local(rel_type_id, from_id, to_id, &object)?;
                shard.attach_incoming_link(to_id, from_id, rel_type_id, rel_id);
                Ok(rel_id)
            })?;
        }

        let alive = self.on_shard(to_shard, move |shard| shard.node_alive(to_id))?;
        if !alive {
            return Err(Error::NotFound(format!("ending node {to_id}")));
        }
        let rel_id = self.on_shard(home, move |shard| {
            shard.rel_add_local(rel_type_id, from_id, to_id, &object)
        })??;
        let spliced = self.on_shard(to_shard, move |shard| {
            shard.attach_incoming_link(to_id, from_id, rel_type_id, rel_id)
        })?;
        if !spliced {
            self.on_shard(home, move |shard| shard.rel_add_rollback(rel_id, from_id))?;
            return Err(Error::NotFound(format!("ending node {to_id}")));
        }
        Ok(rel_id)
    }

    /// Adds a relationship addressed by `(type, key)` endpoint pairs.
    ///
    /// # Errors
    ///
    /// `NotFound` when either key does not resolve.
    pub fn rel_add_by_keys(
        &self,
        rel_type: &str,
        from: (&str, &str),
        to: (&str, &str),
        properties: &Value,
    ) -> Result<u64> {
        let from_id = self.node_id(from.0, from.1)?;
        if from_id == 0 {
            return Err(Error::NotFound(format!("node ({}, {})", from.0, from.1)));
        }
        let to_id = self.node_id(to.0, to.1)?;
        if to_id == 0 {
            return Err(Error::NotFound(format!("node ({}, {})", to.0, to.1)));
        }
        self.rel_add(rel_type, from_id, to_id, properties)
    }

    /// Fetches a relationship by external id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no live relationship carries the id.
    pub fn rel_get(&self, rel_id: u64) -> Result<Relationship> {
        let shard_id = self.owner_of(rel_id)?;
        self.on_shard(shard_id, move |shard| shard.rel_get(rel_id))?
            .ok_or_else(|| Error::NotFound(format!("relationship {rel_id}")))
    }

    /// Removes a relationship, detaching both endpoints' links.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing relationship reports `Ok(false)`.
    pub fn rel_remove(&self, rel_id: u64) -> Result<bool> {
        let home = self.owner_of(rel_id)?;
        let Some(remote) = self.on_shard(home, move |shard| shard.rel_remove_start(rel_id))?
        else {
            return Ok(false);
        };
        if let Some(to_id) = remote {
            let shard_id = self.owner_of(to_id)?;
            self.on_shard(shard_id, move |shard| {
                shard.detach_incoming_link(to_id, rel_id)
            })?;
        }
        Ok(true)
    }

    /// All live relationships of one type, paged across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rels_all(&self, type_name: &str, skip: u64, limit: u64) -> Result<Vec<Relationship>> {
        let name = type_name.to_string();
        let counts = {
            let name = name.clone();
            self.peered(move |shard| shard.rel_count(&name))?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let name = name.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                let type_id = shard.rel_type_id(&name);
                shard.rels_for_type(type_id, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// External ids of live relationships of one type, paged across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_ids(&self, type_name: &str, skip: u64, limit: u64) -> Result<Vec<u64>> {
        let name = type_name.to_string();
        let counts = {
            let name = name.clone();
            self.peered(move |shard| shard.rel_count(&name))?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let name = name.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                let type_id = shard.rel_type_id(&name);
                shard.rel_ids_for_type(type_id, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// All live relationships of every type, paged across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rels_all_types(&self, skip: u64, limit: u64) -> Result<Vec<Relationship>> {
        let counts = self.peered(|shard| shard.rel_live_count())?;
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let mut chunk =
                self.on_shard(shard_id, move |shard| shard.all_rels(window.0, window.1))?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    // ---- relationship properties -------------------------------------------

    /// One property of a relationship.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; missing entities read as `Null`.
    pub fn rel_property_get(&self, rel_id: u64, property: &str) -> Result<PropertyValue> {
        let shard_id = self.owner_of(rel_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.rel_property_get(rel_id, &property)
        })
    }

    /// Sets one typed property of a relationship.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; schema mismatches report `Ok(false)`.
    pub fn rel_property_set(
        &self,
        rel_id: u64,
        property: &str,
        value: PropertyValue,
    ) -> Result<bool> {
        let shard_id = self.owner_of(rel_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.rel_property_set(rel_id, &property, &value)
        })
    }

    /// Sets one property of a relationship from raw JSON.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; coercion failures report `Ok(false)`.
    pub fn rel_property_set_from_json(
        &self,
        rel_id: u64,
        property: &str,
        value: Value,
    ) -> Result<bool> {
        let shard_id = self.owner_of(rel_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.rel_property_set_from_json(rel_id, &property, &value)
        })
    }

    /// Tombstones one property of a relationship.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_property_delete(&self, rel_id: u64, property: &str) -> Result<bool> {
        let shard_id = self.owner_of(rel_id)?;
        let property = property.to_string();
        self.on_shard(shard_id, move |shard| {
            shard.rel_property_delete(rel_id, &property)
        })
    }

    /// All properties of a relationship.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_properties_get(
        &self,
        rel_id: u64,
    ) -> Result<std::collections::HashMap<String, PropertyValue>> {
        let shard_id = self.owner_of(rel_id)?;
        self.on_shard(shard_id, move |shard| shard.rel_properties_get(rel_id))
    }

    /// Applies a JSON object to a relationship's properties.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `properties` is not an object.
    pub fn rel_properties_set_from_json(&self, rel_id: u64, properties: &Value) -> Result<bool> {
        let object = properties
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("properties must be a JSON object".into()))?
            .clone();
        let shard_id = self.owner_of(rel_id)?;
        self.on_shard(shard_id, move |shard| {
            shard.rel_properties_set_from_json(rel_id, &object)
        })
    }

    /// Clears then applies a JSON object to a relationship's properties.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `properties` is not an object.
    pub fn rel_properties_reset_from_json(&self, rel_id: u64, properties: &Value) -> Result<bool> {
        let object = properties
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("properties must be a JSON object".into()))?
            .clone();
        let shard_id = self.owner_of(rel_id)?;
        self.on_shard(shard_id, move |shard| {
            shard.rel_properties_reset_from_json(rel_id, &object)
        })
    }

    /// Tombstones every property of a relationship.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn rel_properties_delete(&self, rel_id: u64) -> Result<bool> {
        let shard_id = self.owner_of(rel_id)?;
        self.on_shard(shard_id, move |shard| shard.rel_properties_delete(rel_id))
    }

    // ---- traversal ---------------------------------------------------------

    /// Degree of a node: link count in the selected direction(s) and types.
    ///
    /// # Errors
    ///
    /// Dispatch errors only; a missing node has degree 0.
    pub fn node_degree(
        &self,
        external_id: u64,
        direction: Direction,
        rel_types: &[String],
    ) -> Result<u64> {
        let shard_id = self.owner_of(external_id)?;
        let rel_types = rel_types.to_vec();
        self.on_shard(shard_id, move |shard| {
            let filter = shard.resolve_rel_types(&rel_types);
            shard.node_degree(external_id, direction, &filter)
        })
    }

    /// Degree addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_degree_by_key(
        &self,
        type_name: &str,
        key: &str,
        direction: Direction,
        rel_types: &[String],
    ) -> Result<u64> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(0);
        }
        self.node_degree(id, direction, rel_types)
    }

    /// Relationships connected to a node, in link order.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_relationships(
        &self,
        external_id: u64,
        direction: Direction,
        rel_types: &[String],
    ) -> Result<Vec<Relationship>> {
        let shard_id = self.owner_of(external_id)?;
        let rel_types = rel_types.to_vec();
        let links = self.on_shard(shard_id, move |shard| {
            let filter = shard.resolve_rel_types(&rel_types);
            shard.node_links(external_id, direction, &filter)
        })?;
        let rel_ids: Vec<u64> = links.iter().map(|link| link.rel_id).collect();
        self.rels_by_ids(&rel_ids)
    }

    /// Relationships addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_relationships_by_key(
        &self,
        type_name: &str,
        key: &str,
        direction: Direction,
        rel_types: &[String],
    ) -> Result<Vec<Relationship>> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(Vec::new());
        }
        self.node_relationships(id, direction, rel_types)
    }

    /// Opposite-endpoint nodes for each selected link, in link order.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_neighbors(
        &self,
        external_id: u64,
        direction: Direction,
        rel_types: &[String],
    ) -> Result<Vec<Node>> {
        let shard_id = self.owner_of(external_id)?;
        let rel_types = rel_types.to_vec();
        let links = self.on_shard(shard_id, move |shard| {
            let filter = shard.resolve_rel_types(&rel_types);
            shard.node_links(external_id, direction, &filter)
        })?;
        let node_ids: Vec<u64> = links.iter().map(|link| link.node_id).collect();
        self.nodes_by_ids(&node_ids)
    }

    /// Neighbors addressed by `(type, key)`.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_neighbors_by_key(
        &self,
        type_name: &str,
        key: &str,
        direction: Direction,
        rel_types: &[String],
    ) -> Result<Vec<Node>> {
        let id = self.node_id(type_name, key)?;
        if id == 0 {
            return Ok(Vec::new());
        }
        self.node_neighbors(id, direction, rel_types)
    }

    /// Relationships between `a` and `b`, answered by `a`'s shard.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn node_connected(
        &self,
        a: u64,
        b: u64,
        direction: Direction,
        rel_types: &[String],
    ) -> Result<Vec<Relationship>> {
        let shard_id = self.owner_of(a)?;
        let rel_types = rel_types.to_vec();
        let rel_ids = self.on_shard(shard_id, move |shard| {
            let filter = shard.resolve_rel_types(&rel_types);
            shard.node_connected(a, b, direction, &filter)
        })?;
        self.rels_by_ids(&rel_ids)
    }

    /// Fetches nodes by external id, preserving input order. Dead ids are
    /// dropped.
    fn nodes_by_ids(&self, ids_in_order: &[u64]) -> Result<Vec<Node>> {
        let mut by_shard: BTreeMap<u16, Vec<u64>> = BTreeMap::new();
        for id in ids_in_order {
            by_shard.entry(self.owner_of(*id)?).or_default().push(*id);
        }
        let mut found: std::collections::HashMap<u64, Node> = std::collections::HashMap::new();
        for (shard_id, ids_here) in by_shard {
            let fetched = self.on_shard(shard_id, move |shard| {
                ids_here
                    .iter()
                    .filter_map(|id| shard.node_get(*id).map(|node| (*id, node)))
                    .collect::<Vec<_>>()
            })?;
            found.extend(fetched);
        }
        Ok(ids_in_order
            .iter()
            .filter_map(|id| found.get(id).cloned())
            .collect())
    }

    /// Fetches relationships by external id, preserving input order.
    fn rels_by_ids(&self, ids_in_order: &[u64]) -> Result<Vec<Relationship>> {
        let mut by_shard: BTreeMap<u16, Vec<u64>> = BTreeMap::new();
        for id in ids_in_order {
            by_shard.entry(self.owner_of(*id)?).or_default().push(*id);
        }
        let mut found: std::collections::HashMap<u64, Relationship> =
            std::collections::HashMap::new();
        for (shard_id, ids_here) in by_shard {
            let fetched = self.on_shard(shard_id, move |shard| {
                ids_here
                    .iter()
                    .filter_map(|id| shard.rel_get(*id).map(|rel| (*id, rel)))
                    .collect::<Vec<_>>()
            })?;
            found.extend(fetched);
        }
        Ok(ids_in_order
            .iter()
            .filter_map(|id| found.get(id).cloned())
            .collect())
    }

    // ---- find -------------------------------------------------------------

    /// Counts nodes matching a predicate, across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn find_node_count(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> Result<u64> {
        let type_name = type_name.to_string();
        let property = property.to_string();
        let value = value.clone();
        let counts = self.peered(move |shard| {
            shard.find_node_count(&type_name, &property, operation, &value)
        })?;
        Ok(counts.iter().sum())
    }

    /// Ids of nodes matching a predicate, paged deterministically across
    /// shards in shard-index order.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn find_node_ids(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<u64>> {
        let counts = {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            self.peered(move |shard| {
                shard.find_node_count(&type_name, &property, operation, &value)
            })?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.find_node_ids(&type_name, &property, operation, &value, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// Nodes matching a predicate, paged across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn find_nodes(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Node>> {
        let counts = {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            self.peered(move |shard| {
                shard.find_node_count(&type_name, &property, operation, &value)
            })?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.find_nodes(&type_name, &property, operation, &value, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// Counts relationships matching a predicate, across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn find_rel_count(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> Result<u64> {
        let type_name = type_name.to_string();
        let property = property.to_string();
        let value = value.clone();
        let counts = self.peered(move |shard| {
            shard.find_rel_count(&type_name, &property, operation, &value)
        })?;
        Ok(counts.iter().sum())
    }

    /// Ids of relationships matching a predicate, paged across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn find_rel_ids(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<u64>> {
        let counts = {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            self.peered(move |shard| {
                shard.find_rel_count(&type_name, &property, operation, &value)
            })?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.find_rel_ids(&type_name, &property, operation, &value, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// Relationships matching a predicate, paged across shards.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn find_rels(
        &self,
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Relationship>> {
        let counts = {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            self.peered(move |shard| {
                shard.find_rel_count(&type_name, &property, operation, &value)
            })?
        };
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.find_rels(&type_name, &property, operation, &value, window.0, window.1)
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    // ---- filter -----------------------------------------------------------

    /// Counts ids (already scoped to a type) whose property matches.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn filter_node_count(
        &self,
        ids_in: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> Result<u64> {
        let mut total = 0;
        for (shard_id, ids_here) in self.partition_ids(ids_in)? {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            total += self.on_shard(shard_id, move |shard| {
                shard.filter_node_count(&ids_here, &type_name, &property, operation, &value)
            })?;
        }
        Ok(total)
    }

    /// Filters an id list through a predicate, paged in shard-index order.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn filter_node_ids(
        &self,
        ids_in: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<u64>> {
        let partitions = self.partition_ids(ids_in)?;
        let mut counts = vec![0u64; usize::from(self.shard_count)];
        for (shard_id, ids_here) in &partitions {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let ids_here = ids_here.clone();
            counts[usize::from(*shard_id)] = self.on_shard(*shard_id, move |shard| {
                shard.filter_node_count(&ids_here, &type_name, &property, operation, &value)
            })?;
        }
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let Some((_, ids_here)) = partitions.iter().find(|(id, _)| *id == shard_id) else {
                continue;
            };
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let ids_here = ids_here.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.filter_node_ids(
                    &ids_here, &type_name, &property, operation, &value, window.0, window.1,
                )
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// Filters an id list, returning nodes.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn filter_nodes(
        &self,
        ids_in: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Node>> {
        let partitions = self.partition_ids(ids_in)?;
        let mut counts = vec![0u64; usize::from(self.shard_count)];
        for (shard_id, ids_here) in &partitions {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let ids_here = ids_here.clone();
            counts[usize::from(*shard_id)] = self.on_shard(*shard_id, move |shard| {
                shard.filter_node_count(&ids_here, &type_name, &property, operation, &value)
            })?;
        }
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let Some((_, ids_here)) = partitions.iter().find(|(id, _)| *id == shard_id) else {
                continue;
            };
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let ids_here = ids_here.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.filter_nodes(
                    &ids_here, &type_name, &property, operation, &value, window.0, window.1,
                )
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// Counts relationship ids whose property matches.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    pub fn filter_rel_count(
        &self,
        ids_in: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
    ) -> Result<u64> {
        let mut total = 0;
        for (shard_id, ids_here) in self.partition_ids(ids_in)? {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            total += self.on_shard(shard_id, move |shard| {
                shard.filter_rel_count(&ids_here, &type_name, &property, operation, &value)
            })?;
        }
        Ok(total)
    }

    /// Filters relationship ids through a predicate with optional sorting.
    ///
    /// Unsorted results page in shard-index order; sorted results merge the
    /// shards' partial sorts, re-sort globally, and page.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    #[allow(clippy::too_many_arguments)]
    pub fn filter_rel_ids(
        &self,
        ids_in: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
        sort: SortOrder,
    ) -> Result<Vec<u64>> {
        let partitions = self.partition_ids(ids_in)?;

        // Null-check rows carry no sort value, so they page in input order.
        if sort == SortOrder::None || operation.is_null_check() {
            let mut counts = vec![0u64; usize::from(self.shard_count)];
            for (shard_id, ids_here) in &partitions {
                let type_name = type_name.to_string();
                let property = property.to_string();
                let value = value.clone();
                let ids_here = ids_here.clone();
                counts[usize::from(*shard_id)] = self.on_shard(*shard_id, move |shard| {
                    shard.filter_rel_count(&ids_here, &type_name, &property, operation, &value)
                })?;
            }
            let mut out = Vec::new();
            for (shard_id, window) in windows(&counts, skip, limit) {
                let Some((_, ids_here)) = partitions.iter().find(|(id, _)| *id == shard_id)
                else {
                    continue;
                };
                let type_name = type_name.to_string();
                let property = property.to_string();
                let value = value.clone();
                let ids_here = ids_here.clone();
                let mut chunk = self.on_shard(shard_id, move |shard| {
                    shard.filter_rel_ids(
                        &ids_here,
                        &type_name,
                        &property,
                        operation,
                        &value,
                        window.0,
                        window.1,
                        SortOrder::None,
                    )
                })?;
                out.append(&mut chunk);
            }
            return Ok(out);
        }

        // Sorted: each shard contributes its top window of (id, value)
        // pairs; the merge re-sorts and pages globally.
        let window = skip.saturating_add(limit);
        let mut pairs: Vec<(u64, PropertyValue)> = Vec::new();
        for (shard_id, ids_here) in partitions {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.filter_rel_pairs(
                    &ids_here, &type_name, &property, operation, &value, window, sort,
                )
            })?;
            pairs.append(&mut chunk);
        }
        pairs.sort_by(|a, b| match sort {
            SortOrder::Desc => compare_values(&b.1, &a.1),
            _ => compare_values(&a.1, &b.1),
        });
        Ok(pairs
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|(id, _)| id)
            .collect())
    }

    /// Filters relationship ids, returning relationships.
    ///
    /// # Errors
    ///
    /// Dispatch errors only.
    #[allow(clippy::too_many_arguments)]
    pub fn filter_rels(
        &self,
        ids_in: &[u64],
        type_name: &str,
        property: &str,
        operation: Operation,
        value: &PropertyValue,
        skip: u64,
        limit: u64,
        sort: SortOrder,
    ) -> Result<Vec<Relationship>> {
        if sort != SortOrder::None {
            let ids = self.filter_rel_ids(
                ids_in, type_name, property, operation, value, skip, limit, sort,
            )?;
            return self.rels_by_ids(&ids);
        }
        let partitions = self.partition_ids(ids_in)?;
        let mut counts = vec![0u64; usize::from(self.shard_count)];
        for (shard_id, ids_here) in &partitions {
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let ids_here = ids_here.clone();
            counts[usize::from(*shard_id)] = self.on_shard(*shard_id, move |shard| {
                shard.filter_rel_count(&ids_here, &type_name, &property, operation, &value)
            })?;
        }
        let mut out = Vec::new();
        for (shard_id, window) in windows(&counts, skip, limit) {
            let Some((_, ids_here)) = partitions.iter().find(|(id, _)| *id == shard_id) else {
                continue;
            };
            let type_name = type_name.to_string();
            let property = property.to_string();
            let value = value.clone();
            let ids_here = ids_here.clone();
            let mut chunk = self.on_shard(shard_id, move |shard| {
                shard.filter_rels(
                    &ids_here,
                    &type_name,
                    &property,
                    operation,
                    &value,
                    window.0,
                    window.1,
                    SortOrder::None,
                )
            })?;
            out.append(&mut chunk);
        }
        Ok(out)
    }

    /// Groups ids by owning shard, preserving input order within each group.
    fn partition_ids(&self, ids_in: &[u64]) -> Result<Vec<(u16, Vec<u64>)>> {
        let mut by_shard: BTreeMap<u16, Vec<u64>> = BTreeMap::new();
        for id in ids_in {
            by_shard.entry(self.owner_of(*id)?).or_default().push(*id);
        }
        Ok(by_shard.into_iter().collect())
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Splits a global `(skip, limit)` window over per-shard result counts,
/// yielding `(shard, (local_skip, local_limit))` in shard-index order.
fn windows(counts: &[u64], mut skip: u64, mut limit: u64) -> Vec<(u16, (u64, u64))> {
    let mut out = Vec::new();
    for (shard_id, count) in counts.iter().enumerate() {
        if limit == 0 {
            break;
        }
        if skip >= *count {
            skip -= count;
            continue;
        }
        let available = count - skip;
        let take = available.min(limit);
        out.push((shard_id as u16, (skip, take)));
        limit -= take;
        skip = 0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_split_across_shards() {
        // Shard counts 3, 2, 4; ask for skip 2 limit 4.
        let plan = windows(&[3, 2, 4], 2, 4);
        assert_eq!(plan, vec![(0, (2, 1)), (1, (0, 2)), (2, (0, 1))]);
    }

    #[test]
    fn test_windows_skip_past_everything() {
        assert!(windows(&[3, 2], 10, 5).is_empty());
    }

    #[test]
    fn test_windows_zero_limit() {
        assert!(windows(&[3, 2], 0, 0).is_empty());
    }

    #[test]
    fn test_windows_single_shard() {
        assert_eq!(windows(&[10], 4, 3), vec![(0, (4, 3))]);
    }
}
