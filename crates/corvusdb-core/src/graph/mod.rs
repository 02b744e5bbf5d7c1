//! Graph storage: nodes, relationships, adjacency, and the per-shard
//! typed stores.
//!
//! Storage is arena + index: per-type vectors own the data, adjacency
//! groups and endpoint arrays reference entities by external id, and
//! compressed bitmaps track recyclable positions.

mod link;
mod node;
pub(crate) mod node_store;
mod paging;
mod relationship;
pub(crate) mod rel_store;

pub use link::{Group, Link};
pub use node::Node;
pub use relationship::Relationship;

pub(crate) use paging::Pager;

use serde::{Deserialize, Serialize};

/// Direction selector for traversal primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Incoming links only.
    In,
    /// Outgoing links only.
    Out,
    /// Both directions.
    #[default]
    Both,
}

impl Direction {
    /// True when outgoing groups participate.
    #[must_use]
    pub fn includes_out(self) -> bool {
        matches!(self, Self::Out | Self::Both)
    }

    /// True when incoming groups participate.
    #[must_use]
    pub fn includes_in(self) -> bool {
        matches!(self, Self::In | Self::Both)
    }
}

/// Sort order for the filter-by-relationship entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    /// No sorting; ids keep their input order.
    #[default]
    None,
    /// Ascending by the fetched property.
    Asc,
    /// Descending by the fetched property.
    Desc,
}

/// Relationship type filter: `None` admits every type, `Some(ids)`
/// intersects groups with the given set. Unresolvable names are dropped
/// during resolution, so asking for only unknown types matches nothing.
pub type RelTypeFilter = Option<Vec<u16>>;

/// True when a group's relationship type passes the filter.
#[must_use]
pub(crate) fn type_admitted(filter: &RelTypeFilter, rel_type_id: u16) -> bool {
    match filter {
        None => true,
        Some(ids) => ids.contains(&rel_type_id),
    }
}
