//! Failure modes: corruption, missing rows, unrepresentable values, rollback.

use std::collections::BTreeMap;

use ntest::timeout;

use objrel_core::error::MarshalError;
use objrel_core::storage::{SqlValue, Storage};
use objrel_core::types::{ScalarKind, TypeDescriptor};
use objrel_core::{Database, Value};

use super::helpers::*;

#[test]
#[timeout(10000)]
fn test_duplicate_scalar_row_is_corruption() {
    let db = Database::in_memory().unwrap();
    let groups = db.collection::<Group>("Group").unwrap();
    let id = groups
        .insert(&Group {
            members: vec!["a".into(), "b".into()],
        })
        .unwrap();

    db.storage()
        .execute(
            "INSERT INTO \"Group$members\" (\"Group$id\", \"index$0\", \"value\") VALUES (?, ?, ?)",
            &[SqlValue::Integer(id), SqlValue::Integer(0), "dup".into()],
        )
        .unwrap();

    match groups.get(id) {
        Err(MarshalError::Corruption { table, rows, .. }) => {
            assert_eq!(table, "Group$members");
            assert_eq!(rows, 2);
        }
        other => panic!("expected corruption, got {:?}", other),
    }
}

#[test]
#[timeout(10000)]
fn test_missing_record_is_not_found() {
    let db = Database::in_memory().unwrap();
    let points = db.collection::<Point>("Point").unwrap();
    assert!(matches!(
        points.get(99),
        Err(MarshalError::NotFound { .. })
    ));
}

#[test]
#[timeout(10000)]
fn test_nested_empty_map_is_unrepresentable() {
    let db = Database::in_memory().unwrap();
    let outers = db.collection::<Outer>("Outer").unwrap();
    let result = outers.insert(&Outer {
        inner: vec![BTreeMap::from([("a".to_string(), 1)]), BTreeMap::new()],
    });
    assert!(matches!(result, Err(MarshalError::Unrepresentable { .. })));
}

#[test]
#[timeout(10000)]
fn test_failed_insert_leaves_no_partial_group() {
    let db = Database::in_memory().unwrap();
    let outers = db.collection::<Outer>("Outer").unwrap();
    outers
        .insert(&Outer {
            inner: vec![BTreeMap::new(), BTreeMap::from([("a".to_string(), 1)])],
        })
        .unwrap_err();

    assert_eq!(row_count(&db, "Outer"), 0);
    assert_eq!(row_count(&db, "Outer$inner"), 0);
}

#[test]
#[timeout(10000)]
fn test_wrong_shape_is_type_mismatch() {
    let db = Database::in_memory().unwrap();
    let point = db.type_registry().resolve_persist::<Point>().unwrap();
    db.compile(&point, "Point").unwrap();

    let result = db.insert_value(
        &point,
        "Point",
        &Value::Record(vec![
            ("x".into(), Value::Integer(1)),
            ("y".into(), Value::Boolean(true)),
        ]),
    );
    assert!(matches!(result, Err(MarshalError::TypeMismatch { .. })));
    assert_eq!(row_count(&db, "Point"), 0);
}

#[test]
#[timeout(10000)]
fn test_wrong_storage_type_is_type_mismatch() {
    let db = Database::in_memory().unwrap();
    let flag = TypeDescriptor::Scalar(ScalarKind::Boolean);
    db.compile(&flag, "flags").unwrap();
    db.storage()
        .execute("INSERT INTO \"flags\" (\"value\") VALUES (7)", &[])
        .unwrap();
    let id = db.storage().last_insert_id();

    assert!(matches!(
        db.get_value(&flag, "flags", id),
        Err(MarshalError::TypeMismatch { .. })
    ));
}
