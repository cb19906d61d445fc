//! Shared record types and database setup for the integration suite.

use std::collections::BTreeMap;

use objrel_core::config::EngineConfig;
use objrel_core::persist_record;
use objrel_core::storage::{SqlValue, Storage};
use objrel_core::Database;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

persist_record!(Point { x: i64, y: i64 });

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub members: Vec<String>,
}

persist_record!(Group { members: Vec<String> });

#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    pub entries: BTreeMap<String, i64>,
}

persist_record!(Registry {
    entries: BTreeMap<String, i64>,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Outer {
    pub inner: Vec<BTreeMap<String, i64>>,
}

persist_record!(Outer {
    inner: Vec<BTreeMap<String, i64>>,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub town: String,
}

persist_record!(Address {
    street: String,
    town: String,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i64,
    pub active: bool,
    pub address: Address,
    pub tags: Vec<String>,
    pub scores: BTreeMap<String, f64>,
}

persist_record!(Person {
    name: String,
    age: i64,
    active: bool,
    address: Address,
    tags: Vec<String>,
    scores: BTreeMap<String, f64>,
});

pub fn person(name: &str, town: &str) -> Person {
    Person {
        name: name.to_string(),
        age: 36,
        active: true,
        address: Address {
            street: "1 Main St".to_string(),
            town: town.to_string(),
        },
        tags: vec!["admin".to_string(), "ops".to_string()],
        scores: BTreeMap::from([("q1".to_string(), 0.5), ("q2".to_string(), 0.75)]),
    }
}

/// File-backed database in a temporary directory.
pub fn file_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        database_path: dir.path().join("objrel.db"),
        ..EngineConfig::default()
    };
    let db = Database::open(config).unwrap();
    (dir, db)
}

/// Number of rows in `table`.
pub fn row_count(db: &Database, table: &str) -> i64 {
    let rows = db
        .storage()
        .query(&format!("SELECT COUNT(*) AS n FROM \"{}\"", table), &[])
        .unwrap();
    match rows[0].get("n") {
        Some(SqlValue::Integer(n)) => *n,
        other => panic!("unexpected count {:?}", other),
    }
}

/// Names of all tables in the store, sorted.
pub fn table_names(db: &Database) -> Vec<String> {
    db.storage()
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            &[],
        )
        .unwrap()
        .iter()
        .filter_map(|row| match row.get("name") {
            Some(SqlValue::Text(name)) => Some(name.clone()),
            _ => None,
        })
        .collect()
}
