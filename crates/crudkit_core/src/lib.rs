//! Generic data-access plumbing over SQLite.
//!
//! Provides a CRUD and query repository for any mapped entity type, a REST
//! response envelope, and an in-memory database fixture for unit tests.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod rest;
pub mod session;
pub mod testing;

pub use db::{ConnectionSettings, DataSource, DbError, DbResult};
pub use logging::{init_logging, init_test_logging, logging_status};
pub use model::entity::{Entity, NamedParams, PositionalParams};
pub use repo::error::{FailureKind, Operation, PersistenceError, RepoResult};
pub use repo::generic_repo::{Repository, SessionRepository};
pub use rest::response::{
    error_response, error_response_with_code, success_response, success_response_with, Envelope,
};
pub use session::{
    NamedQuery, PersistenceUnit, Query, Session, SessionError, SessionFactory, SessionResult,
};
pub use testing::{DbSetup, InsertBuilder, SetupOperation, SetupTracker, TestDatabase};
