//! # `CorvusDB` Core
//!
//! A sharded, in-memory property graph engine written in Rust.
//!
//! `CorvusDB` stores typed nodes and directed relationships with a columnar
//! property layer, and answers typed find/filter queries and graph
//! traversals (degree, neighbors, connected). The graph is partitioned into
//! shards, one single-threaded owner per execution context; shards
//! communicate only by message passing, and external 64-bit ids encode the
//! owning shard so every operation routes directly.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use corvusdb_core::{Graph, GraphConfig, Operation, PropertyValue};
//! use serde_json::json;
//!
//! let graph = Graph::start(GraphConfig::default().with_shards(4))?;
//! graph.node_type_add("User")?;
//! graph.node_property_add("User", "age", "integer")?;
//! let helene = graph.node_add("User", "helene", &json!({"age": 30}))?;
//!
//! let adults = graph.find_node_ids(
//!     "User", "age", Operation::Gte, &PropertyValue::Integer(18), 0, 100,
//! )?;
//! assert!(adults.contains(&helene));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod error;
pub mod graph;
pub mod ids;
pub mod join;
pub mod predicate;
pub mod properties;
mod runtime;
mod shard;
pub mod simd;
pub mod value;

pub use config::GraphConfig;
pub use error::{Error, Result};
pub use graph::{Direction, Group, Link, Node, Relationship, SortOrder};
pub use predicate::Operation;
pub use runtime::Graph;
pub use value::{DataType, PropertyValue};
