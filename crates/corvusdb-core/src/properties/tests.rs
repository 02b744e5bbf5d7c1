use super::*;
use crate::value::DataType;
use serde_json::json;

fn store_with(key: &str, tag: DataType) -> PropertyStore {
    let mut store = PropertyStore::new();
    store.set_property_type(key, tag).unwrap();
    store
}

#[test]
fn test_set_property_type_is_idempotent() {
    let mut store = PropertyStore::new();
    assert_eq!(
        store.set_property_type("age", DataType::Integer),
        Some(DataType::Integer)
    );
    assert_eq!(
        store.set_property_type("age", DataType::Integer),
        Some(DataType::Integer)
    );
    // A conflicting redeclaration fails and leaves the column alone.
    assert_eq!(store.set_property_type("age", DataType::Double), None);
    assert_eq!(store.property_type("age"), Some(DataType::Integer));
}

#[test]
fn test_remove_property_type_drops_the_column() {
    let mut store = store_with("age", DataType::Integer);
    store.set_integer("age", 0, 44);
    assert!(store.remove_property_type("age"));
    assert!(!store.remove_property_type("age"));
    assert_eq!(store.get_property("age", 0), PropertyValue::Null);
}

#[test]
fn test_typed_setter_rejects_wrong_column() {
    let mut store = store_with("age", DataType::Integer);
    assert!(!store.set_boolean("age", 0, true));
    assert!(!store.set_integer("name", 0, 1));
    assert!(store.set_integer("age", 0, 30));
}

#[test]
fn test_grow_on_write_and_out_of_range_reads() {
    let mut store = store_with("age", DataType::Integer);
    assert!(store.set_integer("age", 5, 99));
    assert_eq!(store.integers("age").unwrap().len(), 6);
    assert_eq!(store.get_property("age", 5), PropertyValue::Integer(99));
    // Positions past the end read as null.
    assert_eq!(store.get_property("age", 6), PropertyValue::Null);
}

#[test]
fn test_tombstone_soundness() {
    let mut store = store_with("age", DataType::Integer);
    store.set_integer("age", 2, 30);
    assert!(store.delete_property("age", 2));
    assert!(store.is_deleted("age", 2));
    // The vector still holds the value, but reads see null.
    assert_eq!(store.integers("age").unwrap()[2], 30);
    assert_eq!(store.get_property("age", 2), PropertyValue::Null);
}

#[test]
fn test_set_clears_the_tombstone() {
    let mut store = store_with("age", DataType::Integer);
    store.delete_property("age", 1);
    assert!(store.is_deleted("age", 1));
    store.set_integer("age", 1, 20);
    assert!(!store.is_deleted("age", 1));
    assert_eq!(store.deleted_count("age"), 0);
}

#[test]
fn test_delete_row_hits_every_column() {
    let mut store = store_with("age", DataType::Integer);
    store.set_property_type("name", DataType::String).unwrap();
    store.set_integer("age", 0, 30);
    store.set_string("name", 0, "helene".into());
    store.delete_row(0);
    assert!(store.get_all(0).is_empty());
}

#[test]
fn test_get_all_skips_deleted_slots() {
    let mut store = store_with("age", DataType::Integer);
    store.set_property_type("name", DataType::String).unwrap();
    store.set_integer("age", 0, 30);
    store.set_string("name", 0, "helene".into());
    store.delete_property("age", 0);
    let row = store.get_all(0);
    assert_eq!(row.len(), 1);
    assert_eq!(row["name"], PropertyValue::String("helene".into()));
}

#[test]
fn test_set_value_dispatches_by_declared_type() {
    let mut store = store_with("score", DataType::Double);
    assert!(store.set_value("score", 0, &PropertyValue::Double(9.5)));
    assert!(store.set_value("score", 1, &PropertyValue::Integer(7)));
    assert_eq!(store.get_property("score", 1), PropertyValue::Double(7.0));
    assert!(!store.set_value("score", 2, &PropertyValue::String("no".into())));
}

#[test]
fn test_date_columns_store_doubles() {
    let mut store = store_with("born", DataType::Date);
    assert!(store.set_double("born", 0, 1_617_253_200.0));
    assert_eq!(
        store.get_property("born", 0),
        PropertyValue::Double(1_617_253_200.0)
    );
    assert_eq!(store.property_types()["born"], "date");
}

mod json_ingestion {
    use super::*;

    #[test]
    fn test_boolean_accepts_json_bool_only() {
        let mut store = store_with("flag", DataType::Boolean);
        assert!(store.set_property_from_json("flag", 0, &json!(true)));
        assert!(!store.set_property_from_json("flag", 1, &json!("true")));
        assert!(store.is_deleted("flag", 1));
    }

    #[test]
    fn test_integer_bitcasts_large_unsigned() {
        let mut store = store_with("n", DataType::Integer);
        assert!(store.set_property_from_json("n", 0, &json!(u64::MAX)));
        assert_eq!(store.get_property("n", 0), PropertyValue::Integer(-1));
    }

    #[test]
    fn test_double_accepts_integers_and_floats() {
        let mut store = store_with("d", DataType::Double);
        assert!(store.set_property_from_json("d", 0, &json!(230)));
        assert!(store.set_property_from_json("d", 1, &json!(230.5)));
        assert_eq!(store.get_property("d", 0), PropertyValue::Double(230.0));
        assert!(!store.set_property_from_json("d", 2, &json!("230")));
    }

    #[test]
    fn test_date_accepts_numbers_and_iso_strings() {
        let mut store = store_with("born", DataType::Date);
        assert!(store.set_property_from_json("born", 0, &json!(86400)));
        assert!(store.set_property_from_json("born", 1, &json!("2021-04-01T00:00:00-05:00")));
        assert_eq!(
            store.get_property("born", 1),
            PropertyValue::Double(1_617_253_200.0)
        );
        assert!(!store.set_property_from_json("born", 2, &json!("yesterday")));
        assert!(store.is_deleted("born", 2));
    }

    #[test]
    fn test_lists_skip_wrong_shaped_elements() {
        let mut store = store_with("tags", DataType::StringList);
        assert!(store.set_property_from_json("tags", 0, &json!(["a", 1, "b", null])));
        assert_eq!(
            store.get_property("tags", 0),
            PropertyValue::StringList(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_list_rejects_non_array() {
        let mut store = store_with("tags", DataType::StringList);
        assert!(!store.set_property_from_json("tags", 0, &json!("a")));
        assert!(store.is_deleted("tags", 0));
    }

    #[test]
    fn test_unknown_property_fails_without_side_effects() {
        let mut store = store_with("age", DataType::Integer);
        assert!(!store.set_property_from_json("height", 0, &json!(1)));
        assert!(!store.is_deleted("height", 0));
    }

    #[test]
    fn test_object_batch_reports_any_failure() {
        let mut store = store_with("age", DataType::Integer);
        store.set_property_type("name", DataType::String).unwrap();

        let good = json!({"age": 30, "name": "helene"});
        assert!(store.set_properties_from_json(0, good.as_object().unwrap()));

        let bad = json!({"age": "thirty", "name": "max"});
        assert!(!store.set_properties_from_json(1, bad.as_object().unwrap()));
        // The clean entry still applied.
        assert_eq!(store.get_property("name", 1), PropertyValue::String("max".into()));
        assert!(store.is_deleted("age", 1));
    }

    #[test]
    fn test_unknown_key_in_batch_fails_the_batch() {
        let mut store = store_with("age", DataType::Integer);
        let object = json!({"age": 30, "height": 180});
        assert!(!store.set_properties_from_json(0, object.as_object().unwrap()));
        assert_eq!(store.get_property("age", 0), PropertyValue::Integer(30));
    }
}
