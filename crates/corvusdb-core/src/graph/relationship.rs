//! Relationship value type returned by the public API.

use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A directed relationship, returned by value from its home shard.
///
/// An id of zero marks the empty sentinel returned by failed lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    id: u64,
    type_name: String,
    starting_node_id: u64,
    ending_node_id: u64,
    properties: HashMap<String, PropertyValue>,
}

impl Relationship {
    /// Creates a relationship value.
    #[must_use]
    pub fn new(id: u64, type_name: &str, starting_node_id: u64, ending_node_id: u64) -> Self {
        Self {
            id,
            type_name: type_name.to_string(),
            starting_node_id,
            ending_node_id,
            properties: HashMap::new(),
        }
    }

    /// Attaches properties (builder pattern).
    #[must_use]
    pub fn with_properties(mut self, properties: HashMap<String, PropertyValue>) -> Self {
        self.properties = properties;
        self
    }

    /// The external id; zero for the empty sentinel.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The relationship type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// External id of the starting node.
    #[must_use]
    pub fn starting_node_id(&self) -> u64 {
        self.starting_node_id
    }

    /// External id of the ending node.
    #[must_use]
    pub fn ending_node_id(&self) -> u64 {
        self.ending_node_id
    }

    /// All properties of this relationship.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.properties
    }

    /// One property value, if present.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// True for the zeroed sentinel returned by failed lookups.
    #[must_use]
    pub fn is_empty_sentinel(&self) -> bool {
        self.id == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_detection() {
        assert!(Relationship::default().is_empty_sentinel());
        assert!(!Relationship::new(7, "FRIEND", 1, 2).is_empty_sentinel());
    }

    #[test]
    fn test_endpoints() {
        let rel = Relationship::new(7, "FRIEND", 1, 2);
        assert_eq!(rel.starting_node_id(), 1);
        assert_eq!(rel.ending_node_id(), 2);
        assert_eq!(rel.type_name(), "FRIEND");
    }
}
