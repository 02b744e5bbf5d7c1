//! End-to-end scenarios through the public `Graph` API.

use corvusdb_core::{Direction, Graph, GraphConfig, Operation, PropertyValue};
use serde_json::json;

fn single_shard() -> Graph {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    Graph::start(GraphConfig::default().with_shards(1)).unwrap()
}

/// Finds a key that hashes to the wanted shard, with a stable prefix so
/// test failures stay readable.
fn key_on_shard(prefix: &str, shard: u16, shard_count: u16) -> String {
    (0..)
        .map(|n| format!("{prefix}{n}"))
        .find(|key| corvusdb_core::ids::shard_for_key(key, shard_count) == shard)
        .unwrap()
}

#[test]
fn add_and_fetch() {
    let graph = single_shard();
    let id = graph.node_add("User", "helene", &json!({})).unwrap();
    assert!(id > 0);

    let by_id = graph.node_get(id).unwrap();
    assert_eq!(by_id.key(), "helene");
    assert_eq!(by_id.type_name(), "User");

    let by_key = graph.node_get_by_key("User", "helene").unwrap();
    assert_eq!(by_key.id(), id);
}

#[test]
fn deletion_and_reuse() {
    let graph = single_shard();
    graph.node_type_add("Node").unwrap();
    let mut added = Vec::new();
    for key in ["zero", "one", "two", "three", "four", "five"] {
        added.push(graph.node_add_empty("Node", key).unwrap());
    }
    let third = added[3];
    assert_eq!(corvusdb_core::ids::position_of(third), 3);
    assert!(graph.node_remove(third).unwrap());

    let seven = graph.node_add_empty("Node", "seven").unwrap();
    assert_eq!(corvusdb_core::ids::position_of(seven), 3);
}

#[test]
fn find_with_skip_limit() {
    let graph = single_shard();
    graph.node_type_add("User").unwrap();
    graph.node_property_add("User", "age", "integer").unwrap();

    let mut inserted = Vec::new();
    for (index, age) in [10, 20, 30, 40, 50].iter().enumerate() {
        inserted.push(
            graph
                .node_add("User", &format!("user{index}"), &json!({ "age": age }))
                .unwrap(),
        );
    }

    let found = graph
        .find_node_ids("User", "age", Operation::Gt, &PropertyValue::Integer(15), 1, 2)
        .unwrap();
    assert_eq!(found, vec![inserted[2], inserted[3]]);
}

#[test]
fn is_null_counting() {
    let graph = single_shard();
    graph.node_type_add("User").unwrap();
    graph.node_property_add("User", "age", "integer").unwrap();

    let mut users = Vec::new();
    for index in 0..5 {
        users.push(
            graph
                .node_add("User", &format!("user{index}"), &json!({ "age": 20 + index }))
                .unwrap(),
        );
    }
    // Unset age on two users, delete a third outright.
    assert!(graph.node_property_delete(users[0], "age").unwrap());
    assert!(graph.node_property_delete(users[1], "age").unwrap());
    assert!(graph.node_remove(users[4]).unwrap());

    let nulls = graph
        .find_node_count("User", "age", Operation::IsNull, &PropertyValue::Null)
        .unwrap();
    assert_eq!(nulls, 2);

    let not_nulls = graph
        .find_node_count("User", "age", Operation::NotIsNull, &PropertyValue::Null)
        .unwrap();
    let total_live = 4;
    assert_eq!(not_nulls, total_live - 2);
}

#[test]
fn adjacency_consistency() {
    let graph = single_shard();
    let u = graph.node_add("User", "u", &json!({})).unwrap();
    let v = graph.node_add("User", "v", &json!({})).unwrap();

    let rel = graph.rel_add("FRIEND", u, v, &json!({})).unwrap();
    let friend = vec!["FRIEND".to_string()];
    assert_eq!(graph.node_degree(u, Direction::Out, &friend).unwrap(), 1);
    assert_eq!(graph.node_degree(v, Direction::In, &friend).unwrap(), 1);

    assert!(graph.rel_remove(rel).unwrap());
    assert_eq!(graph.node_degree(u, Direction::Out, &friend).unwrap(), 0);
    assert_eq!(graph.node_degree(v, Direction::In, &friend).unwrap(), 0);
}

#[test]
fn cross_shard_connected() {
    let graph = Graph::start(GraphConfig::default().with_shards(2)).unwrap();
    let key_a = key_on_shard("a", 0, 2);
    let key_b = key_on_shard("b", 1, 2);

    let a = graph.node_add("User", &key_a, &json!({})).unwrap();
    let b = graph.node_add("User", &key_b, &json!({})).unwrap();
    assert_eq!(corvusdb_core::ids::shard_of(a), 0);
    assert_eq!(corvusdb_core::ids::shard_of(b), 1);

    graph.rel_add("FOLLOWS", a, b, &json!({})).unwrap();
    graph.rel_add("FOLLOWS", a, b, &json!({})).unwrap();

    let follows = vec!["FOLLOWS".to_string()];
    let forward = graph.node_connected(a, b, Direction::Out, &follows).unwrap();
    assert_eq!(forward.len(), 2);
    let backward = graph.node_connected(b, a, Direction::Out, &follows).unwrap();
    assert!(backward.is_empty());
    // Seen from b, both relationships are incoming.
    let incoming = graph.node_connected(b, a, Direction::In, &follows).unwrap();
    assert_eq!(incoming.len(), 2);
}

#[test]
fn cross_shard_node_remove_cascades() {
    let graph = Graph::start(GraphConfig::default().with_shards(2)).unwrap();
    let key_a = key_on_shard("left", 0, 2);
    let key_b = key_on_shard("right", 1, 2);

    let a = graph.node_add("User", &key_a, &json!({})).unwrap();
    let b = graph.node_add("User", &key_b, &json!({})).unwrap();
    let rel = graph.rel_add("FRIEND", a, b, &json!({})).unwrap();

    assert!(graph.node_remove(b).unwrap());
    assert!(graph.rel_get(rel).is_err());
    assert_eq!(graph.node_degree(a, Direction::Both, &[]).unwrap(), 0);
    // The surviving node is untouched otherwise.
    assert_eq!(graph.node_get(a).unwrap().key(), key_a);
}

#[test]
fn neighbors_and_relationships() {
    let graph = single_shard();
    let a = graph.node_add("User", "a", &json!({})).unwrap();
    let b = graph.node_add("User", "b", &json!({})).unwrap();
    let c = graph.node_add("User", "c", &json!({})).unwrap();
    graph.rel_add("FRIEND", a, b, &json!({})).unwrap();
    graph.rel_add("FRIEND", c, a, &json!({})).unwrap();

    let out_neighbors = graph.node_neighbors(a, Direction::Out, &[]).unwrap();
    assert_eq!(out_neighbors.len(), 1);
    assert_eq!(out_neighbors[0].key(), "b");

    let all_neighbors = graph.node_neighbors(a, Direction::Both, &[]).unwrap();
    assert_eq!(all_neighbors.len(), 2);

    let rels = graph.node_relationships(a, Direction::Both, &[]).unwrap();
    assert_eq!(rels.len(), 2);
    assert!(rels.iter().all(|rel| rel.type_name() == "FRIEND"));
}

#[test]
fn schema_round_trip() {
    let graph = single_shard();
    assert!(graph.node_type_add("User").unwrap());
    assert!(!graph.node_type_add("User").unwrap());
    graph.node_property_add("User", "age", "integer").unwrap();
    graph.node_property_add("User", "born", "date").unwrap();

    assert_eq!(graph.node_types_list().unwrap(), vec!["User"]);
    let schema = graph.node_type_get("User").unwrap();
    assert_eq!(schema["age"], "integer");
    assert_eq!(schema["born"], "date");

    // Conflicting redeclaration fails, idempotent one succeeds.
    assert!(graph.node_property_add("User", "age", "double").is_err());
    assert!(graph.node_property_add("User", "age", "integer").is_ok());

    assert!(graph.node_property_delete("User", "born").unwrap());
    assert!(!graph.node_type_get("User").unwrap().contains_key("born"));

    // Type delete refuses while nodes are live.
    graph.node_add("User", "x", &json!({})).unwrap();
    assert!(!graph.node_type_delete("User").unwrap());
    graph.node_remove_by_key("User", "x").unwrap();
    assert!(graph.node_type_delete("User").unwrap());
}

#[test]
fn rel_add_by_keys_and_all_listing() {
    let graph = single_shard();
    graph.node_add("User", "u", &json!({})).unwrap();
    graph.node_add("User", "v", &json!({})).unwrap();
    let rel = graph
        .rel_add_by_keys("FRIEND", ("User", "u"), ("User", "v"), &json!({}))
        .unwrap();
    assert!(rel > 0);
    assert!(graph
        .rel_add_by_keys("FRIEND", ("User", "u"), ("User", "ghost"), &json!({}))
        .is_err());

    assert_eq!(graph.rels_all("FRIEND", 0, 10).unwrap().len(), 1);
    assert_eq!(graph.rels_all_types(0, 10).unwrap().len(), 1);
    assert_eq!(graph.rel_ids("FRIEND", 0, 10).unwrap(), vec![rel]);
    assert_eq!(graph.rel_counts().unwrap()["FRIEND"], 1);
    assert_eq!(graph.node_ids("User", 0, 10).unwrap().len(), 2);
}

#[test]
fn nodes_all_pages_across_shards() {
    let graph = Graph::start(GraphConfig::default().with_shards(2)).unwrap();
    graph.node_type_add("User").unwrap();
    for index in 0..10 {
        graph
            .node_add_empty("User", &format!("user{index}"))
            .unwrap();
    }
    let total = graph.nodes_all("User", 0, 100).unwrap();
    assert_eq!(total.len(), 10);

    // Pages concatenate to the whole, in the same order.
    let mut paged = Vec::new();
    let mut skip = 0;
    loop {
        let page = graph.nodes_all("User", skip, 3).unwrap();
        if page.is_empty() {
            break;
        }
        skip += page.len() as u64;
        paged.extend(page);
    }
    let whole_ids: Vec<u64> = total.iter().map(corvusdb_core::Node::id).collect();
    let paged_ids: Vec<u64> = paged.iter().map(corvusdb_core::Node::id).collect();
    assert_eq!(paged_ids, whole_ids);
}

#[test]
fn by_key_entry_points() {
    let graph = single_shard();
    graph.node_type_add("User").unwrap();
    graph.node_property_add("User", "age", "integer").unwrap();
    let u = graph.node_add("User", "u", &json!({"age": 30})).unwrap();
    let v = graph.node_add("User", "v", &json!({"age": 40})).unwrap();
    graph.rel_add("FRIEND", u, v, &json!({})).unwrap();

    assert_eq!(
        graph.node_degree_by_key("User", "u", Direction::Out, &[]).unwrap(),
        1
    );
    assert_eq!(
        graph
            .node_neighbors_by_key("User", "u", Direction::Out, &[])
            .unwrap()[0]
            .key(),
        "v"
    );
    assert_eq!(
        graph
            .node_relationships_by_key("User", "v", Direction::In, &[])
            .unwrap()
            .len(),
        1
    );

    assert_eq!(
        graph.node_property_get_by_key("User", "u", "age").unwrap(),
        PropertyValue::Integer(30)
    );
    assert!(graph
        .node_property_set_by_key("User", "u", "age", PropertyValue::Integer(31))
        .unwrap());
    assert!(graph.node_property_delete_by_key("User", "v", "age").unwrap());
    assert!(graph
        .node_properties_get_by_key("User", "v")
        .unwrap()
        .is_empty());

    assert!(graph
        .node_properties_set_by_key("User", "u", &json!({"age": 35}))
        .unwrap());
    assert!(graph
        .node_properties_reset_by_key("User", "v", &json!({"age": 41}))
        .unwrap());
    assert!(graph.node_properties_delete_by_key("User", "v").unwrap());

    // Missing keys degrade to empty results, never errors.
    assert_eq!(
        graph.node_degree_by_key("User", "ghost", Direction::Both, &[]).unwrap(),
        0
    );
    assert_eq!(
        graph.node_property_get_by_key("User", "ghost", "age").unwrap(),
        PropertyValue::Null
    );
    assert!(!graph.node_properties_delete_by_key("User", "ghost").unwrap());
}

#[test]
fn bulk_property_fetch_and_find_rels() {
    let graph = Graph::start(GraphConfig::default().with_shards(2)).unwrap();
    graph.node_type_add("User").unwrap();
    graph.node_property_add("User", "age", "integer").unwrap();
    graph.rel_type_add("RATED").unwrap();
    graph.rel_property_add("RATED", "stars", "integer").unwrap();

    let mut users = Vec::new();
    for index in 0..4 {
        users.push(
            graph
                .node_add("User", &format!("user{index}"), &json!({"age": 20 + index}))
                .unwrap(),
        );
    }
    let ages = graph.node_property_for_ids(&users, "age").unwrap();
    assert_eq!(ages.len(), 4);
    assert_eq!(ages[&users[0]], PropertyValue::Integer(20));

    let rows = graph.node_properties_for_ids(&users).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[&users[1]]["age"], PropertyValue::Integer(21));
    assert_eq!(graph.node_count("User").unwrap(), 4);

    let mut rels = Vec::new();
    for pair in users.windows(2) {
        rels.push(
            graph
                .rel_add("RATED", pair[0], pair[1], &json!({"stars": 5}))
                .unwrap(),
        );
    }
    let stars = graph.rel_property_for_ids(&rels, "stars").unwrap();
    assert_eq!(stars.len(), 3);
    let rel_rows = graph.rel_properties_for_ids(&rels).unwrap();
    assert_eq!(rel_rows.len(), 3);
    assert_eq!(graph.rel_count("RATED").unwrap(), 3);

    let found = graph
        .find_rels("RATED", "stars", Operation::Eq, &PropertyValue::Integer(5), 0, 10)
        .unwrap();
    assert_eq!(found.len(), 3);
    let count = graph
        .find_rel_count("RATED", "stars", Operation::Eq, &PropertyValue::Integer(5))
        .unwrap();
    assert_eq!(count, 3);

    let filtered = graph
        .filter_rels(
            &rels,
            "RATED",
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(1),
            0,
            10,
            corvusdb_core::SortOrder::None,
        )
        .unwrap();
    assert_eq!(filtered.len(), 3);
}

#[test]
fn duplicate_key_rejected() {
    let graph = single_shard();
    graph.node_add("User", "helene", &json!({})).unwrap();
    let second = graph.node_add("User", "helene", &json!({}));
    assert!(matches!(second, Err(corvusdb_core::Error::AlreadyExists(_))));
}
