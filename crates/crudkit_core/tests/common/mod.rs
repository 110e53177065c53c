#![allow(dead_code)]

use crudkit_core::{Entity, PersistenceUnit, TestDatabase};
use rusqlite::types::Value;
use rusqlite::Row;

pub const SCHEMA: &str = "activity";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vessel {
    pub id: Option<i64>,
    pub cfr: String,
    pub name: String,
    pub flag_state: String,
}

impl Vessel {
    pub fn new(cfr: &str, name: &str, flag_state: &str) -> Self {
        Self {
            id: None,
            cfr: cfr.to_string(),
            name: name.to_string(),
            flag_state: flag_state.to_string(),
        }
    }
}

impl Entity for Vessel {
    type Id = i64;
    const NAME: &'static str = "Vessel";
    const TABLE: &'static str = "activity.vessels";
    const COLUMNS: &'static [&'static str] = &["cfr", "name", "flag_state"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.cfr.clone()),
            Value::Text(self.name.clone()),
            Value::Text(self.flag_state.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            cfr: row.get("cfr")?,
            name: row.get("name")?,
            flag_state: row.get("flag_state")?,
        })
    }

    fn assign_generated_id(&mut self, rowid: i64) {
        self.id = Some(rowid);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub code: String,
    pub name: String,
}

impl Entity for Port {
    type Id = String;
    const NAME: &'static str = "Port";
    const TABLE: &'static str = "activity.ports";
    const ID_COLUMN: &'static str = "code";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn id(&self) -> Option<String> {
        Some(self.code.clone())
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get("code")?,
            name: row.get("name")?,
        })
    }
}

/// Entity mapped to a table the unit never creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ghost {
    pub id: i64,
}

impl Entity for Ghost {
    type Id = i64;
    const NAME: &'static str = "Ghost";
    const TABLE: &'static str = "activity.ghosts";
    const COLUMNS: &'static [&'static str] = &[];

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn values(&self) -> Vec<Value> {
        Vec::new()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { id: row.get("id")? })
    }
}

pub fn activity_unit() -> PersistenceUnit {
    PersistenceUnit::new("activity-test")
        .with_ddl(
            1,
            "CREATE TABLE activity.vessels (
                id INTEGER PRIMARY KEY,
                cfr TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                flag_state TEXT NOT NULL
            );",
        )
        .with_ddl(
            2,
            "CREATE TABLE activity.ports (
                code TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL
            );",
        )
        .with_named_query(
            "Vessel.findByFlagState",
            "select v from Vessel v where v.flag_state = :flag order by v.cfr",
        )
        .with_named_query("Vessel.findAllOrdered", "from Vessel v order by v.cfr")
        .with_named_native_query(
            "Vessel.nativeByName",
            "SELECT id, cfr, name, flag_state FROM activity.vessels WHERE name = :name",
        )
        .with_named_query(
            "Vessel.findAllCommented",
            "from Vessel v order by v.cfr -- oldest registration first",
        )
        .with_named_native_query(
            "Vessel.nativeFirstThree",
            "SELECT id, cfr, name, flag_state FROM activity.vessels ORDER BY cfr LIMIT 3;",
        )
}

pub fn test_db() -> TestDatabase {
    TestDatabase::builder(SCHEMA, activity_unit())
        .build()
        .unwrap()
}

pub fn vessel_count(db: &TestDatabase) -> i64 {
    db.session()
        .connection()
        .query_row("SELECT COUNT(*) FROM activity.vessels;", [], |row| row.get(0))
        .unwrap()
}
