//! In-memory database fixture for repository unit tests.
//!
//! # Responsibility
//! - Provision an isolated shared-cache in-memory database with a named
//!   schema attached, per fixture.
//! - Build a session factory for a persistence unit and hand out a ready
//!   session, a setup tracker and repositories.
//!
//! # Invariants
//! - Two fixtures never share a database, even when built in parallel.
//! - Dropping the fixture closes every connection it opened, which discards
//!   the in-memory database.

use crate::db::{ConnectionSettings, DataSource, DbResult};
use crate::logging::init_test_logging;
use crate::model::entity::Entity;
use crate::repo::generic_repo::SessionRepository;
use crate::session::{PersistenceUnit, Session, SessionFactory};
use log::info;

mod setup;

pub use setup::{DbSetup, InsertBuilder, SetupOperation, SetupTracker};

const TEST_DB_PREFIX: &str = "testdb";

/// Builder for [`TestDatabase`].
pub struct TestDatabaseBuilder {
    schema: String,
    unit: PersistenceUnit,
    settings: ConnectionSettings,
}

impl TestDatabaseBuilder {
    pub fn settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Creates the database, generates the unit schema and opens the session.
    pub fn build(self) -> DbResult<TestDatabase> {
        init_test_logging();
        info!(
            "event=test_db_build module=testing status=start schema={} unit={}",
            self.schema,
            self.unit.name()
        );

        let data_source = DataSource::unique_in_memory(TEST_DB_PREFIX)
            .with_schema(&self.schema)?
            .with_settings(self.settings);
        let factory = SessionFactory::build(self.unit, data_source)?;
        let session = factory.create_session()?;

        Ok(TestDatabase {
            schema: self.schema,
            session,
            factory,
            tracker: SetupTracker::new(),
        })
    }
}

/// Live test database with one open session.
pub struct TestDatabase {
    schema: String,
    // Field order is drop order: the session closes before the factory drops
    // the last connection keeping the database alive.
    session: Session,
    factory: SessionFactory,
    tracker: SetupTracker,
}

impl TestDatabase {
    /// Starts a fixture attaching `schema` and built for `unit`.
    pub fn builder(schema: impl Into<String>, unit: PersistenceUnit) -> TestDatabaseBuilder {
        TestDatabaseBuilder {
            schema: schema.into(),
            unit,
            settings: ConnectionSettings::default(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    pub fn data_source(&self) -> &DataSource {
        self.factory.data_source()
    }

    pub fn tracker(&mut self) -> &mut SetupTracker {
        &mut self.tracker
    }

    /// Repository over the fixture session.
    pub fn repository<T: Entity>(&self) -> SessionRepository<'_, T> {
        SessionRepository::new(&self.session)
    }

    /// Launches `setup` through the tracker. Returns whether it ran.
    pub fn launch(&mut self, setup: &DbSetup) -> DbResult<bool> {
        self.tracker
            .launch_if_necessary(setup, self.factory.data_source())
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        info!(
            "event=test_db_release module=testing status=ok schema={} unit={}",
            self.schema,
            self.session.unit_name()
        );
    }
}
