//! Universal properties exercised through the public API.

use corvusdb_core::{Direction, Graph, GraphConfig, Operation, PropertyValue, SortOrder};
use serde_json::json;

fn graph_with(shards: u16) -> Graph {
    Graph::start(GraphConfig::default().with_shards(shards)).unwrap()
}

fn seed_users(graph: &Graph, ages: &[i64]) -> Vec<u64> {
    graph.node_type_add("User").unwrap();
    graph.node_property_add("User", "age", "integer").unwrap();
    ages.iter()
        .enumerate()
        .map(|(index, age)| {
            graph
                .node_add("User", &format!("user{index}"), &json!({ "age": age }))
                .unwrap()
        })
        .collect()
}

#[test]
fn find_pagination_composes_for_any_partition() {
    let graph = graph_with(3);
    seed_users(&graph, &[5, 10, 15, 20, 25, 30, 35, 40, 45, 50]);

    let whole = graph
        .find_node_ids("User", "age", Operation::Gte, &PropertyValue::Integer(0), 0, u64::MAX)
        .unwrap();
    assert_eq!(whole.len(), 10);

    for chunk in [1u64, 2, 3, 7] {
        let mut paged = Vec::new();
        let mut skip = 0;
        loop {
            let page = graph
                .find_node_ids(
                    "User",
                    "age",
                    Operation::Gte,
                    &PropertyValue::Integer(0),
                    skip,
                    chunk,
                )
                .unwrap();
            if page.is_empty() {
                break;
            }
            skip += page.len() as u64;
            paged.extend(page);
        }
        assert_eq!(paged, whole, "partition by {chunk} must compose");
    }
}

#[test]
fn find_count_matches_id_cardinality() {
    let graph = graph_with(2);
    seed_users(&graph, &[1, 2, 3, 4, 5, 6, 7, 8]);

    for (operation, probe) in [
        (Operation::Gt, 4),
        (Operation::Lte, 3),
        (Operation::Eq, 5),
        (Operation::Neq, 5),
    ] {
        let count = graph
            .find_node_count("User", "age", operation, &PropertyValue::Integer(probe))
            .unwrap();
        let ids = graph
            .find_node_ids("User", "age", operation, &PropertyValue::Integer(probe), 0, u64::MAX)
            .unwrap();
        assert_eq!(count, ids.len() as u64);
    }
}

#[test]
fn numeric_coercion_probes_agree() {
    let graph = graph_with(2);
    graph.node_type_add("Item").unwrap();
    graph.node_property_add("Item", "weight", "double").unwrap();
    for index in 0..6 {
        graph
            .node_add(
                "Item",
                &format!("item{index}"),
                &json!({ "weight": if index % 2 == 0 { 230.0 } else { 115.5 } }),
            )
            .unwrap();
    }

    let via_integer = graph
        .find_node_ids("Item", "weight", Operation::Eq, &PropertyValue::Integer(230), 0, 100)
        .unwrap();
    let via_double = graph
        .find_node_ids("Item", "weight", Operation::Eq, &PropertyValue::Double(230.0), 0, 100)
        .unwrap();
    assert_eq!(via_integer, via_double);
    assert_eq!(via_integer.len(), 3);
}

#[test]
fn filter_respects_liveness_and_counts() {
    let graph = graph_with(2);
    let users = seed_users(&graph, &[10, 20, 30, 40]);
    graph.node_remove(users[1]).unwrap();

    let count = graph
        .filter_node_count(&users, "User", "age", Operation::Gte, &PropertyValue::Integer(0))
        .unwrap();
    assert_eq!(count, 3);

    let ids = graph
        .filter_node_ids(
            &users,
            "User",
            "age",
            Operation::Gte,
            &PropertyValue::Integer(0),
            0,
            100,
        )
        .unwrap();
    assert_eq!(ids.len(), 3);
    assert!(!ids.contains(&users[1]));
}

#[test]
fn filter_rels_sorted_across_shards() {
    let graph = graph_with(2);
    graph.node_type_add("User").unwrap();
    graph.rel_type_add("RATED").unwrap();
    graph.rel_property_add("RATED", "stars", "integer").unwrap();

    let mut rels = Vec::new();
    let mut expected: Vec<(i64, u64)> = Vec::new();
    for (index, stars) in [4i64, 1, 5, 2, 3].iter().enumerate() {
        let from = graph
            .node_add("User", &format!("from{index}"), &json!({}))
            .unwrap();
        let to = graph
            .node_add("User", &format!("to{index}"), &json!({}))
            .unwrap();
        let rel = graph
            .rel_add("RATED", from, to, &json!({ "stars": stars }))
            .unwrap();
        rels.push(rel);
        expected.push((*stars, rel));
    }

    let ascending = graph
        .filter_rel_ids(
            &rels,
            "RATED",
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(0),
            0,
            100,
            SortOrder::Asc,
        )
        .unwrap();
    expected.sort();
    let expected_ids: Vec<u64> = expected.iter().map(|(_, rel)| *rel).collect();
    assert_eq!(ascending, expected_ids);

    // Paging after sort: skip the two lowest, take two.
    let middle = graph
        .filter_rel_ids(
            &rels,
            "RATED",
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(0),
            2,
            2,
            SortOrder::Asc,
        )
        .unwrap();
    assert_eq!(middle, expected_ids[2..4].to_vec());
}

#[test]
fn cascading_delete_leaves_no_dangling_links() {
    let graph = graph_with(3);
    graph.node_type_add("User").unwrap();
    let hub = graph.node_add("User", "hub", &json!({})).unwrap();
    let mut spokes = Vec::new();
    for index in 0..6 {
        let spoke = graph
            .node_add("User", &format!("spoke{index}"), &json!({}))
            .unwrap();
        if index % 2 == 0 {
            graph.rel_add("FRIEND", hub, spoke, &json!({})).unwrap();
        } else {
            graph.rel_add("FRIEND", spoke, hub, &json!({})).unwrap();
        }
        spokes.push(spoke);
    }
    assert_eq!(graph.node_degree(hub, Direction::Both, &[]).unwrap(), 6);

    assert!(graph.node_remove(hub).unwrap());
    for spoke in spokes {
        assert_eq!(graph.node_degree(spoke, Direction::Both, &[]).unwrap(), 0);
        assert!(graph
            .node_relationships(spoke, Direction::Both, &[])
            .unwrap()
            .is_empty());
    }
    assert_eq!(graph.rel_counts().unwrap().get("FRIEND"), Some(&0));
}

#[test]
fn unset_column_counts_as_null_everywhere() {
    let graph = graph_with(2);
    seed_users(&graph, &[1, 2, 3]);
    graph.node_property_add("User", "height", "double").unwrap();

    let not_null = graph
        .find_node_count("User", "height", Operation::NotIsNull, &PropertyValue::Null)
        .unwrap();
    assert_eq!(not_null, 0);
    let null = graph
        .find_node_count("User", "height", Operation::IsNull, &PropertyValue::Null)
        .unwrap();
    assert_eq!(null, 3);
}

#[test]
fn unknown_operation_matches_nothing() {
    let graph = graph_with(1);
    seed_users(&graph, &[1, 2, 3]);
    let found = graph
        .find_node_ids("User", "age", Operation::Unknown, &PropertyValue::Integer(1), 0, 10)
        .unwrap();
    assert!(found.is_empty());
    // String operators against an integer column match nothing either.
    let found = graph
        .find_node_ids(
            "User",
            "age",
            Operation::StartsWith,
            &PropertyValue::Integer(1),
            0,
            10,
        )
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn json_coercion_failures_are_local() {
    let graph = graph_with(1);
    graph.node_type_add("User").unwrap();
    graph.node_property_add("User", "age", "integer").unwrap();
    graph.node_property_add("User", "name", "string").unwrap();

    // A bad age does not prevent the node (or the clean name) from landing.
    let id = graph
        .node_add("User", "helene", &json!({"age": "thirty", "name": "helene"}))
        .unwrap();
    assert_eq!(
        graph.node_property_get(id, "name").unwrap(),
        PropertyValue::String("helene".into())
    );
    assert_eq!(graph.node_property_get(id, "age").unwrap(), PropertyValue::Null);
}

#[test]
fn date_properties_flow_through_json() {
    let graph = graph_with(1);
    graph.node_type_add("Event").unwrap();
    graph.node_property_add("Event", "at", "date").unwrap();

    let id = graph
        .node_add("Event", "launch", &json!({"at": "2021-04-01T00:00:00-05:00"}))
        .unwrap();
    let stored = graph.node_property_get(id, "at").unwrap();
    assert_eq!(stored, PropertyValue::Double(1_617_253_200.0));

    // Dates compare as doubles, with integer probes promoted.
    let found = graph
        .find_node_count(
            "Event",
            "at",
            Operation::Gt,
            &PropertyValue::Integer(1_600_000_000),
        )
        .unwrap();
    assert_eq!(found, 1);
}
