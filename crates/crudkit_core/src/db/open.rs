//! Connection bootstrap for data sources.
//!
//! # Responsibility
//! - Open file or shared-cache in-memory SQLite connections.
//! - Apply connection pragmas and attach the data source schemas.
//!
//! # Invariants
//! - Returned connections honor `ConnectionSettings`.
//! - Every schema of the data source is attached before the connection is
//!   handed out.

use super::{DataSource, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

/// Opens one connection to `source` with settings applied and schemas
/// attached.
///
/// # Side effects
/// - Creates the database (and attached schema databases) when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_connection(source: &DataSource) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = source.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match Connection::open(source.url()) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, source) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} schemas={} duration_ms={}",
                source.schemas().len(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection, source: &DataSource) -> DbResult<()> {
    let settings = source.settings();
    let foreign_keys = if settings.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(settings.busy_timeout)?;

    for schema in source.schemas() {
        if is_attached(conn, schema)? {
            continue;
        }
        // Schema names are validated identifiers, so they can be spliced in.
        conn.execute(
            &format!("ATTACH DATABASE ?1 AS {schema};"),
            [source.schema_url(schema)],
        )?;
    }
    Ok(())
}

fn is_attached(conn: &Connection, schema: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare("PRAGMA database_list;")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name.eq_ignore_ascii_case(schema) {
            return Ok(true);
        }
    }
    Ok(false)
}
