//! Round trips through the relational layout.

use std::collections::BTreeMap;

use ntest::timeout;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use objrel_core::persist_record;
use objrel_core::storage::{SqlValue, Storage};
use objrel_core::Database;

use super::helpers::*;

/// Scenario A: a flat record
#[test]
#[timeout(10000)]
fn test_flat_record_get_all() {
    let db = Database::in_memory().unwrap();
    let points = db.collection::<Point>("Point").unwrap();
    points.insert(&Point { x: 3, y: 4 }).unwrap();

    assert_eq!(points.get_all().unwrap(), vec![Point { x: 3, y: 4 }]);
    assert_eq!(points.plan().table_names(), vec!["Point"]);
}

/// Scenario B: list order is kept
#[test]
#[timeout(10000)]
fn test_list_keeps_order() {
    let db = Database::in_memory().unwrap();
    let groups = db.collection::<Group>("Group").unwrap();
    let group = Group {
        members: vec!["a".into(), "b".into(), "c".into()],
    };
    let id = groups.insert(&group).unwrap();
    assert_eq!(groups.get(id).unwrap(), group);

    let rows = db
        .storage()
        .query(
            "SELECT \"index$0\", \"value\" FROM \"Group$members\" ORDER BY \"index$0\"",
            &[],
        )
        .unwrap();
    let stored: Vec<(SqlValue, SqlValue)> = rows
        .iter()
        .map(|r| (r.values()[0].clone(), r.values()[1].clone()))
        .collect();
    assert_eq!(
        stored,
        vec![
            (SqlValue::Integer(0), "a".into()),
            (SqlValue::Integer(1), "b".into()),
            (SqlValue::Integer(2), "c".into()),
        ]
    );
}

/// Scenario C: map membership is kept
#[test]
#[timeout(10000)]
fn test_map_roundtrip() {
    let db = Database::in_memory().unwrap();
    let registries = db.collection::<Registry>("Registry").unwrap();
    let registry = Registry {
        entries: BTreeMap::from([("x".to_string(), 1), ("y".to_string(), 2)]),
    };
    let id = registries.insert(&registry).unwrap();
    assert_eq!(registries.get(id).unwrap(), registry);
    assert_eq!(row_count(&db, "Registry$entries"), 2);
}

/// Scenario D: list of maps disambiguated by ordinal and key
#[test]
#[timeout(10000)]
fn test_list_of_maps_leaf_rows() {
    let db = Database::in_memory().unwrap();
    let outers = db.collection::<Outer>("Outer").unwrap();
    let outer = Outer {
        inner: vec![
            BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]),
            BTreeMap::from([("a".to_string(), 3), ("c".to_string(), 4)]),
        ],
    };
    let id = outers.insert(&outer).unwrap();

    let rows = db
        .storage()
        .query(
            "SELECT \"Outer$id\", \"index$0\", \"key$1\", \"value\" FROM \"Outer$inner\" \
             ORDER BY \"index$0\", \"key$1\"",
            &[],
        )
        .unwrap();
    let leaves: Vec<Vec<SqlValue>> = rows.iter().map(|r| r.values().to_vec()).collect();
    assert_eq!(
        leaves,
        vec![
            vec![SqlValue::Integer(id), SqlValue::Integer(0), "a".into(), SqlValue::Integer(1)],
            vec![SqlValue::Integer(id), SqlValue::Integer(0), "b".into(), SqlValue::Integer(2)],
            vec![SqlValue::Integer(id), SqlValue::Integer(1), "a".into(), SqlValue::Integer(3)],
            vec![SqlValue::Integer(id), SqlValue::Integer(1), "c".into(), SqlValue::Integer(4)],
        ]
    );
    assert_eq!(outers.get(id).unwrap(), outer);
}

#[test]
#[timeout(10000)]
fn test_nested_record_roundtrip() {
    let (_dir, db) = file_db();
    let people = db.collection::<Person>("people").unwrap();
    let ada = person("Ada", "London");
    let bob = person("Bob", "Leeds");
    let ada_id = people.insert(&ada).unwrap();
    let bob_id = people.insert(&bob).unwrap();

    assert_eq!(people.get(ada_id).unwrap(), ada);
    assert_eq!(people.get(bob_id).unwrap(), bob);
    assert_eq!(people.get_all().unwrap(), vec![ada, bob]);
}

#[test]
#[timeout(10000)]
fn test_ordinals_scoped_per_parent() {
    let db = Database::in_memory().unwrap();
    let groups = db.collection::<Group>("Group").unwrap();
    let first = groups
        .insert(&Group {
            members: vec!["a".into(), "b".into()],
        })
        .unwrap();
    let second = groups
        .insert(&Group {
            members: vec!["c".into(), "d".into(), "e".into()],
        })
        .unwrap();

    for (id, expected) in [(first, vec![0, 1]), (second, vec![0, 1, 2])] {
        let rows = db
            .storage()
            .query(
                "SELECT \"index$0\" FROM \"Group$members\" WHERE \"Group$id\" = ? ORDER BY 1",
                &[SqlValue::Integer(id)],
            )
            .unwrap();
        let ordinals: Vec<SqlValue> = rows.iter().map(|r| r.values()[0].clone()).collect();
        let expected: Vec<SqlValue> = expected.into_iter().map(SqlValue::Integer).collect();
        assert_eq!(ordinals, expected);
    }
}

#[test]
#[timeout(10000)]
fn test_empty_collections_under_record() {
    let db = Database::in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();
    let mut loner = person("Cy", "York");
    loner.tags.clear();
    loner.scores.clear();
    let id = people.insert(&loner).unwrap();

    assert_eq!(people.get(id).unwrap(), loner);
    assert_eq!(row_count(&db, "people$tags"), 0);
}

#[test]
#[timeout(10000)]
fn test_delete_cascades_through_row_group() {
    let db = Database::in_memory().unwrap();
    let people = db.collection::<Person>("people").unwrap();
    let ada_id = people.insert(&person("Ada", "London")).unwrap();
    let bob_id = people.insert(&person("Bob", "Leeds")).unwrap();
    let before: Vec<i64> = people
        .plan()
        .table_names()
        .into_iter()
        .map(|table| row_count(&db, table))
        .collect();

    assert!(people.delete(ada_id).unwrap());
    for (table, count) in people.plan().table_names().into_iter().zip(before) {
        assert_eq!(row_count(&db, table), count / 2, "table {}", table);
    }
    assert_eq!(people.ids().unwrap(), vec![bob_id]);
}

#[test]
#[timeout(10000)]
fn test_reused_root_id_starts_clean() {
    let (_dir, db) = file_db();
    let groups = db.collection::<Group>("Group").unwrap();
    let old = groups
        .insert(&Group {
            members: vec!["old".into()],
        })
        .unwrap();
    assert!(groups.delete(old).unwrap());

    let fresh = Group {
        members: vec!["new".into()],
    };
    let id = groups.insert(&fresh).unwrap();
    assert_eq!(id, old);
    assert_eq!(groups.get(id).unwrap(), fresh);
    assert_eq!(row_count(&db, "Group$members"), 1);
}

#[test]
#[timeout(10000)]
fn test_data_survives_reopen() {
    let (dir, db) = file_db();
    let id = db
        .collection::<Group>("Group")
        .unwrap()
        .insert(&Group {
            members: vec!["x".into()],
        })
        .unwrap();
    let config = db.config().clone();
    drop(db);

    let db = Database::open(config).unwrap();
    let groups = db.collection::<Group>("Group").unwrap();
    assert_eq!(
        groups.get(id).unwrap(),
        Group {
            members: vec!["x".into()]
        }
    );
    drop(dir);
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    sku: String,
    tags: Vec<String>,
}

persist_record!(Line {
    sku: String,
    tags: Vec<String>,
});

#[derive(Debug, Clone, PartialEq)]
struct Order {
    number: i64,
    lines: Vec<Line>,
    by: BTreeMap<String, Line>,
}

persist_record!(Order {
    number: i64,
    lines: Vec<Line>,
    by: BTreeMap<String, Line>,
});

fn line(sku: &str, tags: &[&str]) -> Line {
    Line {
        sku: sku.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[test]
#[timeout(10000)]
fn test_records_inside_collections_roundtrip() {
    let db = Database::in_memory().unwrap();
    let orders = db.collection::<Order>("orders").unwrap();
    assert_eq!(
        orders.plan().table_names(),
        vec![
            "orders",
            "orders$lines",
            "orders$lines$tags",
            "orders$by",
            "orders$by$tags",
        ]
    );

    let first = Order {
        number: 1,
        lines: vec![line("a", &["red", "big"]), line("b", &[]), line("c", &["x"])],
        by: BTreeMap::from([
            ("alice".to_string(), line("a", &["gift"])),
            ("bob".to_string(), line("d", &["p", "q", "r"])),
        ]),
    };
    let second = Order {
        number: 2,
        lines: vec![line("e", &["blue"])],
        by: BTreeMap::from([("carol".to_string(), line("f", &[]))]),
    };
    let first_id = orders.insert(&first).unwrap();
    let second_id = orders.insert(&second).unwrap();

    assert_eq!(orders.get(first_id).unwrap(), first);
    assert_eq!(orders.get(second_id).unwrap(), second);
    assert_eq!(orders.get_all().unwrap(), vec![first, second]);

    // Tag ordinals restart under every line row
    let rows = db
        .storage()
        .query(
            "SELECT \"index$0\" FROM \"orders$lines$tags\" ORDER BY \"orders$lines$tags$id\"",
            &[],
        )
        .unwrap();
    let ordinals: Vec<SqlValue> = rows.iter().map(|r| r.values()[0].clone()).collect();
    assert_eq!(
        ordinals,
        vec![
            SqlValue::Integer(0),
            SqlValue::Integer(1),
            SqlValue::Integer(0),
            SqlValue::Integer(0),
        ]
    );
    assert_eq!(row_count(&db, "orders$by$tags"), 4);
}

#[derive(Debug, Clone, PartialEq)]
struct Document {
    title: String,
    rating: f64,
    flags: Vec<bool>,
    counts: BTreeMap<String, i64>,
    sections: Vec<BTreeMap<String, Vec<i64>>>,
}

persist_record!(Document {
    title: String,
    rating: f64,
    flags: Vec<bool>,
    counts: BTreeMap<String, i64>,
    sections: Vec<BTreeMap<String, Vec<i64>>>,
});

fn document_strategy() -> impl Strategy<Value = Document> {
    (
        "[a-zA-Z0-9 ]{0,12}",
        -1.0e9f64..1.0e9f64,
        prop::collection::vec(any::<bool>(), 0..5),
        prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..4),
        prop::collection::vec(
            prop::collection::btree_map(
                "[a-z]{1,4}",
                prop::collection::vec(any::<i64>(), 1..4),
                1..3,
            ),
            0..3,
        ),
    )
        .prop_map(|(title, rating, flags, counts, sections)| Document {
            title,
            rating,
            flags,
            counts,
            sections,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_document_roundtrip(doc in document_strategy()) {
        let db = Database::in_memory().unwrap();
        let docs = db.collection::<Document>("docs").unwrap();
        let id = docs.insert(&doc).unwrap();
        prop_assert_eq!(docs.get(id).unwrap(), doc);
    }
}
