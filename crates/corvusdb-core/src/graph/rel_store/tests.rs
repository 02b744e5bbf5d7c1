use super::*;
use crate::graph::SortOrder;
use crate::predicate::Operation;
use crate::value::DataType;

fn store_with_ratings() -> (RelationshipStore, u16) {
    let mut store = RelationshipStore::new(0);
    let type_id = store.insert_or_get_type_id("RATED");
    store
        .property_store_mut(type_id)
        .set_property_type("stars", DataType::Integer)
        .unwrap();
    (store, type_id)
}

fn add_rated(store: &mut RelationshipStore, type_id: u16, stars: i64) -> u64 {
    let id = store.add(type_id, 1000, 2000).unwrap();
    store
        .property_store_mut(type_id)
        .set_integer("stars", ids::position_of(id), stars);
    id
}

#[test]
fn test_add_stores_endpoints() {
    let (mut store, type_id) = store_with_ratings();
    let id = store.add(type_id, 11, 22).unwrap();
    let position = ids::position_of(id);
    assert_eq!(store.starting_node_id(type_id, position), 11);
    assert_eq!(store.ending_node_id(type_id, position), 22);
    let rel = store.relationship_at(type_id, position).unwrap();
    assert_eq!(rel.starting_node_id(), 11);
    assert_eq!(rel.ending_node_id(), 22);
    assert_eq!(rel.type_name(), "RATED");
}

#[test]
fn test_remove_recycles_minimum_position() {
    let (mut store, type_id) = store_with_ratings();
    let ids_added: Vec<u64> = (0..4).map(|_| store.add(type_id, 1, 2).unwrap()).collect();
    assert!(store.remove(type_id, ids::position_of(ids_added[1])));
    assert!(store.remove(type_id, ids::position_of(ids_added[3])));
    assert_eq!(store.count(type_id), 2);

    let reused = store.add(type_id, 3, 4).unwrap();
    assert_eq!(ids::position_of(reused), ids::position_of(ids_added[1]));
}

#[test]
fn test_recycled_slot_is_scrubbed() {
    let (mut store, type_id) = store_with_ratings();
    let id = add_rated(&mut store, type_id, 5);
    let position = ids::position_of(id);
    assert!(store.remove(type_id, position));

    let recycled = store.add(type_id, 7, 8).unwrap();
    assert_eq!(ids::position_of(recycled), position);
    assert_eq!(
        store.relationship_property(type_id, position, "stars"),
        PropertyValue::Null
    );
}

#[test]
fn test_count_subtracts_deleted() {
    let (mut store, type_id) = store_with_ratings();
    let a = store.add(type_id, 1, 2).unwrap();
    store.add(type_id, 1, 2).unwrap();
    assert_eq!(store.count(type_id), 2);
    store.remove(type_id, ids::position_of(a));
    assert_eq!(store.count(type_id), 1);
}

#[test]
fn test_paged_rel_ids() {
    let (mut store, type_id) = store_with_ratings();
    let added: Vec<u64> = (0..5).map(|_| store.add(type_id, 1, 2).unwrap()).collect();
    store.remove(type_id, ids::position_of(added[0]));
    assert_eq!(store.rel_ids(type_id, 1, 2), vec![added[2], added[3]]);
    assert_eq!(store.all_rel_ids(0, 100).len(), 4);
}

#[test]
fn test_delete_type_only_when_empty() {
    let (mut store, type_id) = store_with_ratings();
    let id = store.add(type_id, 1, 2).unwrap();
    assert!(!store.delete_type_id("RATED"));
    store.remove(type_id, ids::position_of(id));
    assert!(store.delete_type_id("RATED"));
    assert_eq!(store.type_id("RATED"), 0);
}

mod find {
    use super::*;

    #[test]
    fn test_find_ids_and_count_agree() {
        let (mut store, type_id) = store_with_ratings();
        let ids_added: Vec<u64> = [1, 3, 5, 3]
            .iter()
            .map(|stars| add_rated(&mut store, type_id, *stars))
            .collect();

        let found = store.find_ids(
            type_id,
            "stars",
            Operation::Eq,
            &PropertyValue::Integer(3),
            0,
            10,
        );
        assert_eq!(found, vec![ids_added[1], ids_added[3]]);
        assert_eq!(
            store.find_count(type_id, "stars", Operation::Eq, &PropertyValue::Integer(3)),
            2
        );
    }

    #[test]
    fn test_null_checks_use_bitmaps() {
        let (mut store, type_id) = store_with_ratings();
        let with_stars = add_rated(&mut store, type_id, 4);
        let without = store.add(type_id, 1, 2).unwrap();

        assert_eq!(
            store.find_count(type_id, "stars", Operation::IsNull, &PropertyValue::Null),
            1
        );
        let nulls = store.find_ids(type_id, "stars", Operation::IsNull, &PropertyValue::Null, 0, 10);
        assert_eq!(nulls, vec![without]);
        let written =
            store.find_ids(type_id, "stars", Operation::NotIsNull, &PropertyValue::Null, 0, 10);
        assert_eq!(written, vec![with_stars]);
    }

    #[test]
    fn test_date_column_accepts_integer_probe() {
        let (mut store, type_id) = store_with_ratings();
        store
            .property_store_mut(type_id)
            .set_property_type("since", DataType::Date)
            .unwrap();
        let id = store.add(type_id, 1, 2).unwrap();
        store
            .property_store_mut(type_id)
            .set_double("since", ids::position_of(id), 86_400.0);

        let found = store.find_ids(
            type_id,
            "since",
            Operation::Eq,
            &PropertyValue::Integer(86_400),
            0,
            10,
        );
        assert_eq!(found, vec![id]);
    }
}

mod filter {
    use super::*;

    #[test]
    fn test_filter_respects_input_order_without_sort() {
        let (mut store, type_id) = store_with_ratings();
        let a = add_rated(&mut store, type_id, 3);
        let b = add_rated(&mut store, type_id, 1);
        let c = add_rated(&mut store, type_id, 2);

        let kept = store.filter_ids(
            &[c, a, b],
            type_id,
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(1),
            0,
            10,
            SortOrder::None,
        );
        assert_eq!(kept, vec![c, a, b]);
    }

    #[test]
    fn test_filter_sort_ascending_and_descending() {
        let (mut store, type_id) = store_with_ratings();
        let a = add_rated(&mut store, type_id, 3);
        let b = add_rated(&mut store, type_id, 1);
        let c = add_rated(&mut store, type_id, 2);

        let ascending = store.filter_ids(
            &[a, b, c],
            type_id,
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(0),
            0,
            10,
            SortOrder::Asc,
        );
        assert_eq!(ascending, vec![b, c, a]);

        let descending = store.filter_ids(
            &[a, b, c],
            type_id,
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(0),
            0,
            10,
            SortOrder::Desc,
        );
        assert_eq!(descending, vec![a, c, b]);
    }

    #[test]
    fn test_sorted_filter_pages_after_sorting() {
        let (mut store, type_id) = store_with_ratings();
        let added: Vec<u64> = [5, 1, 4, 2, 3]
            .iter()
            .map(|stars| add_rated(&mut store, type_id, *stars))
            .collect();

        let page = store.filter_ids(
            &added,
            type_id,
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(0),
            1,
            2,
            SortOrder::Asc,
        );
        // Sorted by stars: 1,2,3,4,5 -> skip 1, take 2 -> stars 2 and 3.
        assert_eq!(page, vec![added[3], added[4]]);
    }

    #[test]
    fn test_sorted_filter_excludes_null_rows() {
        let (mut store, type_id) = store_with_ratings();
        let rated = add_rated(&mut store, type_id, 2);
        let unrated = store.add(type_id, 1, 2).unwrap();

        let sorted = store.filter_ids(
            &[unrated, rated],
            type_id,
            "stars",
            Operation::Gte,
            &PropertyValue::Integer(0),
            0,
            10,
            SortOrder::Asc,
        );
        assert_eq!(sorted, vec![rated]);
    }

    #[test]
    fn test_filter_count_drops_dead_ids() {
        let (mut store, type_id) = store_with_ratings();
        let a = add_rated(&mut store, type_id, 3);
        let b = add_rated(&mut store, type_id, 4);
        store.remove(type_id, ids::position_of(b));

        assert_eq!(
            store.filter_count(&[a, b], type_id, "stars", Operation::Gte, &PropertyValue::Integer(0)),
            1
        );
    }
}
