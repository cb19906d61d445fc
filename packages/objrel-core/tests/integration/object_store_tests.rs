//! JSON object store with attribute-path indexes.

use ntest::timeout;
use pretty_assertions::assert_eq;

use objrel_core::error::MarshalError;
use objrel_core::{Database, Persist, Value};

use super::helpers::*;

#[test]
#[timeout(10000)]
fn test_insert_fetch() {
    let db = Database::in_memory().unwrap();
    let store = db.object_store::<Person>().unwrap();
    assert_eq!(store.table(), "objects");

    let ada = person("Ada", "London");
    let id = store.insert(&ada.to_value()).unwrap();
    assert_eq!(Person::from_value(store.fetch(id).unwrap()).unwrap(), ada);
    assert!(matches!(store.fetch(id + 1), Err(MarshalError::NotFound { .. })));
}

#[test]
#[timeout(10000)]
fn test_filter_by_indexed_path() {
    let db = Database::in_memory().unwrap();
    let mut store = db.object_store_in::<Person>("people").unwrap();
    for (name, town) in [("Ada", "London"), ("Bob", "Leeds"), ("Cy", "London")] {
        store.insert(&person(name, town).to_value()).unwrap();
    }

    assert!(store.ensure_index("address.town").unwrap());
    // Duplicate request is a no-op
    assert!(!store.ensure_index("address.town").unwrap());
    assert_eq!(store.indexes(), ["address.town".to_string()]);

    let londoners: Vec<String> = store
        .filter("address.town", &Value::Text("London".into()))
        .unwrap()
        .into_iter()
        .map(|v| Person::from_value(v).unwrap().name)
        .collect();
    assert_eq!(londoners, vec!["Ada", "Cy"]);

    let active = store.filter("active", &Value::Boolean(true)).unwrap();
    assert_eq!(active.len(), 3);
    assert_eq!(store.fetch_all().unwrap().len(), 3);
}

#[test]
#[timeout(10000)]
fn test_invalid_paths() {
    let db = Database::in_memory().unwrap();
    let mut store = db.object_store::<Person>().unwrap();
    assert!(matches!(
        store.ensure_index("tags"),
        Err(MarshalError::InvalidPath { .. })
    ));
    assert!(matches!(
        store.ensure_index("address.country"),
        Err(MarshalError::InvalidPath { .. })
    ));
    assert!(matches!(
        store.filter("age", &Value::Text("old".into())),
        Err(MarshalError::TypeMismatch { .. })
    ));
    assert!(store.indexes().is_empty());
}
