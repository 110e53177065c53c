//! Schema generation from persistence-unit DDL scripts.
//!
//! # Responsibility
//! - Apply pending DDL scripts atomically, in ascending version order.
//! - Refuse databases generated by a newer persistence unit.
//!
//! # Invariants
//! - `version` values are strictly increasing within one script list.
//! - The last applied version is mirrored to `PRAGMA user_version` of the main
//!   database, so re-running generation against the same database is a no-op.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One versioned DDL batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlScript {
    pub version: u32,
    pub sql: String,
}

/// Returns the highest version in `scripts`, or `0` when there are none.
pub fn latest_version(scripts: &[DdlScript]) -> u32 {
    scripts.last().map_or(0, |script| script.version)
}

/// Applies every script newer than the database's current version.
pub fn apply_schema(conn: &mut Connection, scripts: &[DdlScript]) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version(scripts);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for script in scripts {
        if script.version <= current_version {
            continue;
        }

        tx.execute_batch(&script.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", script.version))?;
    }
    tx.commit()?;

    info!(
        "event=schema_generate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(())
}

/// Reads `PRAGMA user_version` of the main database.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
