//! Schema compilation against a live store.

use ntest::timeout;
use pretty_assertions::assert_eq;

use objrel_core::error::MarshalError;
use objrel_core::storage::{SqlValue, Storage};
use objrel_core::types::{DeclarationParser, TypeError};
use objrel_core::Database;

use super::helpers::*;

const DECLARATIONS: &str = r#"
    [types.Line]
    fields = [
        { name = "sku", type = "str" },
        { name = "qty", type = "int" },
    ]

    [types.Order]
    fields = [
        { name = "number", type = "int" },
        { name = "lines", type = "list<Line>" },
        { name = "notes", type = "map<str, list<str>>" },
    ]

    [types.Bad]
    fields = [
        { name = "id", type = "int" },
        { name = "either", type = "int | str" },
    ]
"#;

#[test]
#[timeout(10000)]
fn test_compile_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let first = db.collection::<Person>("people").unwrap().plan().clone();
    let tables = table_names(&db);
    let second = db.collection::<Person>("people").unwrap().plan().clone();

    assert_eq!(first, second);
    assert_eq!(table_names(&db), tables);
}

#[test]
#[timeout(10000)]
fn test_declared_types_compile() {
    let db = Database::in_memory().unwrap();
    assert_eq!(
        DeclarationParser::load_into(db.type_registry(), DECLARATIONS).unwrap(),
        3
    );
    let order = db.type_registry().resolve_named("Order").unwrap();
    let plan = db.compile(&order, "orders").unwrap();

    assert_eq!(
        plan.table_names(),
        vec!["orders", "orders$lines", "orders$notes"]
    );
    assert_eq!(
        db.storage().table_columns("orders$lines").unwrap(),
        vec!["orders$lines$id", "orders$id", "index$0", "sku", "qty"]
    );
    assert_eq!(
        db.storage().table_columns("orders$notes").unwrap(),
        vec!["orders$notes$id", "orders$id", "key$0", "index$1", "value"]
    );
    assert_eq!(table_names(&db), vec!["orders", "orders$lines", "orders$notes"]);
}

#[test]
#[timeout(10000)]
fn test_union_fails_before_any_table() {
    let db = Database::in_memory().unwrap();
    DeclarationParser::load_into(db.type_registry(), DECLARATIONS).unwrap();

    let result = db
        .type_registry()
        .resolve_named("Bad")
        .map_err(MarshalError::from)
        .and_then(|descriptor| db.compile(&descriptor, "bad"));
    match result {
        Err(MarshalError::Type(TypeError::Unsupported { path, .. })) => {
            assert_eq!(path, "Bad.either");
        }
        other => panic!("expected unsupported type, got {:?}", other.map(|p| p.root)),
    }
    assert!(table_names(&db).is_empty());
}

#[test]
#[timeout(10000)]
fn test_secondary_index_created_once() {
    let db = Database::in_memory().unwrap();
    db.collection::<Group>("Group").unwrap();
    db.collection::<Group>("Group").unwrap();

    let rows = db
        .storage()
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?",
            &[SqlValue::from("Group$members")],
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&SqlValue::from("Group$members$$keys")));
}
