//! Caller-facing repository error.
//!
//! Every repository failure surfaces as one `PersistenceError` whose message
//! says nothing about the cause. The detailed `SessionError` stays reachable
//! through `source()`/`cause()` and a coarse `failure_kind()` for callers that
//! want to branch on it.

use crate::db::DbError;
use crate::session::SessionError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, PersistenceError>;

/// Repository operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    FindById,
    RawQuery,
    QueryLanguage,
    NamedQuery,
    FindAll,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::FindById => "find_by_id",
            Self::RawQuery => "raw_query",
            Self::QueryLanguage => "query_language",
            Self::NamedQuery => "named_query",
            Self::FindAll => "find_all",
            Self::Delete => "delete",
        }
    }
}

/// Coarse classification of the underlying cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Constraint,
    Connectivity,
    InvalidQuery,
    /// Stored data could not be decoded into the entity.
    Mapping,
    Other,
}

/// The single error kind returned by repository operations.
#[derive(Debug)]
pub struct PersistenceError {
    operation: Operation,
    cause: SessionError,
}

impl PersistenceError {
    pub(crate) fn new(operation: Operation, cause: SessionError) -> Self {
        Self { operation, cause }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Detailed cause, for callers that need more than the opaque surface.
    pub fn cause(&self) -> &SessionError {
        &self.cause
    }

    pub fn failure_kind(&self) -> FailureKind {
        classify(&self.cause)
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("persistence operation failed")
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

fn classify(cause: &SessionError) -> FailureKind {
    match cause {
        SessionError::EntityNotFound { .. } => FailureKind::NotFound,
        SessionError::MalformedQuery { .. }
        | SessionError::UnknownNamedQuery(_)
        | SessionError::UnboundParameter(_)
        | SessionError::UnknownParameter(_) => FailureKind::InvalidQuery,
        SessionError::Db(DbError::Sqlite(err)) => classify_sqlite(err),
        SessionError::Db(DbError::UnsupportedSchemaVersion { .. })
        | SessionError::Db(DbError::InvalidSchemaName(_)) => FailureKind::Other,
    }
}

fn classify_sqlite(err: &rusqlite::Error) -> FailureKind {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => FailureKind::Constraint,
            ErrorCode::CannotOpen
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::SystemIoFailure
            | ErrorCode::NotADatabase => FailureKind::Connectivity,
            _ => FailureKind::Other,
        },
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::InvalidColumnName(_)
        | rusqlite::Error::InvalidColumnIndex(_)
        | rusqlite::Error::IntegralValueOutOfRange(..) => FailureKind::Mapping,
        _ => FailureKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::{FailureKind, Operation, PersistenceError};
    use crate::session::SessionError;
    use std::error::Error;

    #[test]
    fn message_is_opaque_but_cause_is_reachable() {
        let err = PersistenceError::new(
            Operation::Delete,
            SessionError::EntityNotFound {
                entity: "Vessel",
                id: "42".to_string(),
            },
        );

        assert_eq!(err.to_string(), "persistence operation failed");
        assert!(!err.to_string().contains("42"));
        assert_eq!(err.operation(), Operation::Delete);
        assert_eq!(err.failure_kind(), FailureKind::NotFound);
        let source = err.source().expect("cause should be chained");
        assert!(source.to_string().contains("Vessel not found: 42"));
    }

    #[test]
    fn query_errors_classify_as_invalid_query() {
        let err = PersistenceError::new(
            Operation::NamedQuery,
            SessionError::UnknownNamedQuery("Vessel.byName".to_string()),
        );
        assert_eq!(err.failure_kind(), FailureKind::InvalidQuery);
    }
}
