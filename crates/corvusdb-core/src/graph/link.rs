//! Adjacency primitives: links and per-relationship-type groups.

use serde::{Deserialize, Serialize};

/// A compact `(neighbor, relationship)` pair inside an adjacency group.
///
/// Both sides are external ids, so a link can point across shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// External id of the node on the other end.
    pub node_id: u64,
    /// External id of the relationship.
    pub rel_id: u64,
}

impl Link {
    /// Creates a link.
    #[must_use]
    pub fn new(node_id: u64, rel_id: u64) -> Self {
        Self { node_id, rel_id }
    }
}

/// A node's bucket of links for one relationship type, kept separately for
/// outgoing and incoming directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Relationship type id shared by every link in the bucket.
    pub rel_type_id: u16,
    /// Links in insertion order.
    pub links: Vec<Link>,
}

impl Group {
    /// Creates an empty group for a relationship type.
    #[must_use]
    pub fn new(rel_type_id: u16) -> Self {
        Self {
            rel_type_id,
            links: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_holds_insertion_order() {
        let mut group = Group::new(3);
        group.links.push(Link::new(10, 100));
        group.links.push(Link::new(11, 101));
        assert_eq!(group.links[0], Link::new(10, 100));
        assert_eq!(group.links[1], Link::new(11, 101));
    }
}
