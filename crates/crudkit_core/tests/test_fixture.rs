mod common;

use common::{activity_unit, test_db, vessel_count, Port, Vessel, SCHEMA};
use crudkit_core::db::schema::current_user_version;
use crudkit_core::{
    ConnectionSettings, DataSource, DbError, DbSetup, PersistenceUnit, Repository,
    SessionFactory, SetupOperation, TestDatabase,
};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::time::Duration;

fn two_vessels() -> DbSetup {
    DbSetup::new(
        "two-vessels",
        vec![
            SetupOperation::delete_all_from(&["activity.vessels"]),
            SetupOperation::insert_into("activity.vessels", &["id", "cfr", "name", "flag_state"])
                .values(vec![
                    Value::Integer(10),
                    Value::Text("EST000000010".to_string()),
                    Value::Text("Virve".to_string()),
                    Value::Text("EST".to_string()),
                ])
                .values(vec![
                    Value::Integer(11),
                    Value::Text("EST000000011".to_string()),
                    Value::Text("Kihnu".to_string()),
                    Value::Text("EST".to_string()),
                ])
                .build(),
        ],
    )
}

fn attached_schemas(conn: &Connection) -> Vec<String> {
    let mut stmt = conn.prepare("PRAGMA database_list;").unwrap();
    stmt.query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

#[test]
fn fixture_attaches_schema_and_generates_unit_tables() {
    let db = test_db();

    assert_eq!(db.schema(), SCHEMA);
    assert_eq!(db.session().unit_name(), "activity-test");
    assert!(attached_schemas(db.session().connection()).contains(&SCHEMA.to_string()));
    assert_eq!(vessel_count(&db), 0);
    assert!(db.data_source().is_in_memory());
}

#[test]
fn builder_applies_connection_settings_to_every_session() {
    let settings = ConnectionSettings {
        busy_timeout: Duration::from_millis(250),
        foreign_keys: false,
    };
    let db = TestDatabase::builder(SCHEMA, activity_unit())
        .settings(settings.clone())
        .build()
        .unwrap();

    assert_eq!(db.data_source().settings(), &settings);
    let foreign_keys: i64 = db
        .session()
        .connection()
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 0);
}

#[test]
fn fixtures_are_isolated_from_each_other() {
    let first = test_db();
    let second = test_db();

    first
        .repository::<Vessel>()
        .create(Vessel::new("LTU000000001", "Aukstaitija", "LTU"))
        .unwrap();

    assert_eq!(vessel_count(&first), 1);
    assert_eq!(vessel_count(&second), 0);
    assert_ne!(first.data_source().url(), second.data_source().url());
}

#[test]
fn sessions_from_one_factory_share_the_database() {
    let db = test_db();
    db.repository::<Port>()
        .create(Port {
            code: "LVRIX".to_string(),
            name: "Riga".to_string(),
        })
        .unwrap();

    let other = db.factory().create_session().unwrap();
    let count: i64 = other
        .connection()
        .query_row("SELECT COUNT(*) FROM activity.ports;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn setup_is_launched_and_visible_to_the_session() {
    let mut db = test_db();

    assert!(db.launch(&two_vessels()).unwrap());
    let loaded = db.repository::<Vessel>().find_by_id(&11).unwrap().unwrap();
    assert_eq!(loaded.name, "Kihnu");
    assert_eq!(vessel_count(&db), 2);
}

#[test]
fn tracker_skips_relaunch_only_after_skip_next_launch() {
    let mut db = test_db();
    let setup = two_vessels();

    assert!(db.launch(&setup).unwrap());
    db.tracker().skip_next_launch();
    assert!(!db.launch(&setup).unwrap());

    // The skip is consumed by one launch.
    assert!(db.launch(&setup).unwrap());

    db.tracker().skip_next_launch();
    let other = DbSetup::new("empty", vec![SetupOperation::delete_all_from(&["activity.vessels"])]);
    assert!(db.launch(&other).unwrap());
    assert_eq!(vessel_count(&db), 0);
}

#[test]
fn failed_setup_commits_nothing() {
    let mut db = test_db();
    let broken = DbSetup::new(
        "broken",
        vec![
            SetupOperation::insert_into("activity.ports", &["code", "name"])
                .values(vec![
                    Value::Text("EETLL".to_string()),
                    Value::Text("Tallinn".to_string()),
                ])
                .into(),
            SetupOperation::sql("INSERT INTO activity.harbours (code) VALUES ('x');"),
        ],
    );

    let err = db.launch(&broken).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
    assert!(db.repository::<Port>().find_all().unwrap().is_empty());
}

#[test]
fn schema_generation_is_idempotent_for_one_data_source() {
    let source = DataSource::unique_in_memory("factory-test")
        .with_schema(SCHEMA)
        .unwrap();

    let first = SessionFactory::build(activity_unit(), source.clone()).unwrap();
    let session = first.create_session().unwrap();
    let repo = crudkit_core::SessionRepository::<Vessel>::new(&session);
    repo.create(Vessel::new("FIN000000001", "Aallotar", "FIN"))
        .unwrap();

    let second = SessionFactory::build(activity_unit(), source).unwrap();
    let other = second.create_session().unwrap();
    assert_eq!(current_user_version(other.connection()).unwrap(), 2);
    let still_there = crudkit_core::SessionRepository::<Vessel>::new(&other)
        .find_all()
        .unwrap();
    assert_eq!(still_there.len(), 1);
}

#[test]
fn schema_newer_than_unit_is_rejected() {
    let source = DataSource::unique_in_memory("factory-test")
        .with_schema(SCHEMA)
        .unwrap();
    let _current = SessionFactory::build(activity_unit(), source.clone()).unwrap();

    let older_unit = PersistenceUnit::new("activity-legacy").with_ddl(
        1,
        "CREATE TABLE activity.vessels (id INTEGER PRIMARY KEY);",
    );
    let err = SessionFactory::build(older_unit, source).err().unwrap();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion {
            db_version: 2,
            latest_supported: 1
        }
    ));
}

#[test]
fn file_backed_data_source_persists_across_factories() {
    let dir = tempfile::tempdir().unwrap();
    let source = DataSource::file(dir.path().join("vms.sqlite3"))
        .with_schema(SCHEMA)
        .unwrap();

    {
        let factory = SessionFactory::build(activity_unit(), source.clone()).unwrap();
        let session = factory.create_session().unwrap();
        crudkit_core::SessionRepository::<Port>::new(&session)
            .create(Port {
                code: "PLGDY".to_string(),
                name: "Gdynia".to_string(),
            })
            .unwrap();
    }

    let factory = SessionFactory::build(activity_unit(), source).unwrap();
    let session = factory.create_session().unwrap();
    let ports = crudkit_core::SessionRepository::<Port>::new(&session)
        .find_all()
        .unwrap();
    assert_eq!(ports.len(), 1);
    assert!(dir.path().join("vms.activity.db").exists());
}
