//! Persistence session over one SQLite connection.
//!
//! # Responsibility
//! - Execute entity inserts, merges, key lookups and removals.
//! - Build typed queries from native SQL, query-language text or named
//!   queries registered in the persistence unit.
//!
//! # Invariants
//! - A session owns exactly one connection and is used by one owner at a
//!   time (`Send`, not `Sync`).
//! - Statements are single-shot; no transaction is opened implicitly.

use crate::db::DbError;
use crate::model::entity::{select_list, Entity};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod factory;
mod query;
mod unit;

pub use factory::SessionFactory;
pub use query::Query;
pub use unit::{NamedQuery, PersistenceUnit};

pub type SessionResult<T> = Result<T, SessionError>;

/// Detailed failure of one session operation.
#[derive(Debug)]
pub enum SessionError {
    Db(DbError),
    /// Statement text could not be translated or prepared.
    MalformedQuery {
        query: String,
        message: String,
    },
    UnknownNamedQuery(String),
    /// A placeholder of the statement received no value.
    UnboundParameter(String),
    /// A supplied value matches no placeholder of the statement.
    UnknownParameter(String),
    EntityNotFound {
        entity: &'static str,
        id: String,
    },
}

impl SessionError {
    pub(crate) fn malformed(query: &str, message: impl Display) -> Self {
        Self::MalformedQuery {
            query: query.to_string(),
            message: message.to_string(),
        }
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MalformedQuery { query, message } => {
                write!(f, "malformed query `{query}`: {message}")
            }
            Self::UnknownNamedQuery(name) => write!(f, "no named query registered as `{name}`"),
            Self::UnboundParameter(name) => write!(f, "query parameter `{name}` is not bound"),
            Self::UnknownParameter(name) => {
                write!(f, "query declares no parameter `{name}`")
            }
            Self::EntityNotFound { entity, id } => write!(f, "{entity} not found: {id}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MalformedQuery { .. }
            | Self::UnknownNamedQuery(_)
            | Self::UnboundParameter(_)
            | Self::UnknownParameter(_)
            | Self::EntityNotFound { .. } => None,
        }
    }
}

impl From<DbError> for SessionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Unit of work against one connection, bound to a persistence unit.
pub struct Session {
    conn: Connection,
    unit: Arc<PersistenceUnit>,
}

impl Session {
    pub(crate) fn new(conn: Connection, unit: Arc<PersistenceUnit>) -> Self {
        Self { conn, unit }
    }

    /// Name of the persistence unit this session was built for.
    pub fn unit_name(&self) -> &str {
        self.unit.name()
    }

    /// Underlying connection, for fixture setup and ad-hoc inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Inserts `entity`.
    ///
    /// Entities without a key are inserted without the key column and receive
    /// the generated row id through [`Entity::assign_generated_id`].
    pub fn persist<T: Entity>(&self, entity: &mut T) -> SessionResult<()> {
        match entity.id() {
            Some(id) => {
                let sql = insert_sql::<T>(true);
                let values = entity.values();
                let binds = key_first_binds(&id, &values);
                self.conn.execute(&sql, binds.as_slice())?;
            }
            None => self.insert_generated(entity)?,
        }
        Ok(())
    }

    /// Copies the state of `entity` into the store, inserting it when no row
    /// with its key exists yet.
    pub fn merge<T: Entity>(&self, entity: &mut T) -> SessionResult<()> {
        match entity.id() {
            Some(id) => {
                let sql = merge_sql::<T>();
                let values = entity.values();
                let binds = key_first_binds(&id, &values);
                self.conn.execute(&sql, binds.as_slice())?;
            }
            None => self.insert_generated(entity)?,
        }
        Ok(())
    }

    /// Loads the entity stored under `id`.
    pub fn find<T: Entity>(&self, id: &T::Id) -> SessionResult<Option<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            select_list::<T>(None),
            T::TABLE,
            T::ID_COLUMN
        );
        let entity = self
            .conn
            .query_row(&sql, params![id], |row| T::from_row(row))
            .optional()?;
        Ok(entity)
    }

    /// Deletes the row of `T` stored under `id`.
    ///
    /// Fails with `EntityNotFound` when no such row exists.
    pub fn remove_by_id<T: Entity>(&self, id: &T::Id) -> SessionResult<()> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1;", T::TABLE, T::ID_COLUMN);
        let changed = self.conn.execute(&sql, params![id])?;
        if changed == 0 {
            return Err(SessionError::EntityNotFound {
                entity: T::NAME,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Builds a query from store-native SQL. The text is not inspected.
    pub fn create_native_query<T: Entity>(&self, sql: &str) -> Query<'_, T> {
        Query::new(&self.conn, sql.to_string(), sql.to_string())
    }

    /// Builds a query from query-language text targeting `T`.
    pub fn create_query<T: Entity>(&self, text: &str) -> SessionResult<Query<'_, T>> {
        let sql = query::translate::<T>(text)?;
        Ok(Query::new(&self.conn, sql, text.to_string()))
    }

    /// Builds a query from a named query registered in the persistence unit.
    pub fn create_named_query<T: Entity>(&self, name: &str) -> SessionResult<Query<'_, T>> {
        match self.unit.named_query(name) {
            Some(NamedQuery::QueryLanguage(text)) => self.create_query(text),
            Some(NamedQuery::Native(sql)) => Ok(self.create_native_query(sql)),
            None => Err(SessionError::UnknownNamedQuery(name.to_string())),
        }
    }

    fn insert_generated<T: Entity>(&self, entity: &mut T) -> SessionResult<()> {
        let sql = insert_sql::<T>(false);
        let values = entity.values();
        self.conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        entity.assign_generated_id(self.conn.last_insert_rowid());
        Ok(())
    }
}

fn key_first_binds<'a>(
    id: &'a dyn ToSql,
    values: &'a [rusqlite::types::Value],
) -> Vec<&'a dyn ToSql> {
    let mut binds: Vec<&dyn ToSql> = Vec::with_capacity(values.len() + 1);
    binds.push(id);
    binds.extend(values.iter().map(|value| value as &dyn ToSql));
    binds
}

fn insert_sql<T: Entity>(with_key: bool) -> String {
    let columns: Vec<&str> = if with_key {
        std::iter::once(T::ID_COLUMN)
            .chain(T::COLUMNS.iter().copied())
            .collect()
    } else {
        T::COLUMNS.to_vec()
    };
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES;", T::TABLE);
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        T::TABLE,
        columns.join(", "),
        placeholders(columns.len())
    )
}

fn merge_sql<T: Entity>() -> String {
    let insert = insert_sql::<T>(true);
    let insert = insert.trim_end_matches(';');
    if T::COLUMNS.is_empty() {
        return format!("{insert} ON CONFLICT({}) DO NOTHING;", T::ID_COLUMN);
    }
    let assignments = T::COLUMNS
        .iter()
        .map(|column| format!("{column} = excluded.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{insert} ON CONFLICT({}) DO UPDATE SET {assignments};",
        T::ID_COLUMN
    )
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}
