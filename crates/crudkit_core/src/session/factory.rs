//! Session factory bound to one persistence unit and one data source.

use super::{PersistenceUnit, Session};
use crate::db::schema::apply_schema;
use crate::db::{open_connection, DataSource, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::sync::Arc;

/// Creates sessions for a persistence unit.
///
/// Building the factory generates the unit's schema. The factory keeps one
/// connection open for its whole lifetime, which also keeps shared-cache
/// in-memory databases alive between sessions.
pub struct SessionFactory {
    unit: Arc<PersistenceUnit>,
    data_source: DataSource,
    _anchor: Connection,
}

impl SessionFactory {
    /// Opens the data source and applies the unit's pending DDL.
    pub fn build(unit: PersistenceUnit, data_source: DataSource) -> DbResult<Self> {
        info!(
            "event=session_factory_build module=session status=start unit={} mode={}",
            unit.name(),
            data_source.mode()
        );

        let mut anchor = open_connection(&data_source)?;
        if let Err(err) = apply_schema(&mut anchor, unit.ddl()) {
            error!(
                "event=session_factory_build module=session status=error unit={} error_code=schema_generation_failed error={}",
                unit.name(),
                err
            );
            return Err(err);
        }

        info!(
            "event=session_factory_build module=session status=ok unit={}",
            unit.name()
        );
        Ok(Self {
            unit: Arc::new(unit),
            data_source,
            _anchor: anchor,
        })
    }

    /// Opens a new session on its own connection.
    pub fn create_session(&self) -> DbResult<Session> {
        let conn = open_connection(&self.data_source)?;
        Ok(Session::new(conn, Arc::clone(&self.unit)))
    }

    pub fn unit(&self) -> &PersistenceUnit {
        &self.unit
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }
}
