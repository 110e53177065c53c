//! SQLite data sources, connection bootstrap and schema generation.
//!
//! # Responsibility
//! - Describe where a database lives (`DataSource`) and how connections are
//!   configured (`ConnectionSettings`).
//! - Open connections with pragmas applied and schemas attached.
//! - Apply persistence-unit DDL in deterministic order.
//!
//! # Invariants
//! - Generated schema version is tracked via `PRAGMA user_version`.
//! - Schema names are plain SQL identifiers; anything else is rejected before
//!   it reaches an `ATTACH` statement.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

mod open;
pub mod schema;

pub use open::open_connection;

pub type DbResult<T> = Result<T, DbError>;

static SCHEMA_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("schema name pattern is valid")
});

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidSchemaName(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidSchemaName(name) => {
                write!(f, "invalid schema name `{name}`; expected a plain identifier")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InvalidSchemaName(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Per-connection configuration applied when a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Whether `PRAGMA foreign_keys` is switched on.
    pub foreign_keys: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    /// Shared-cache in-memory database, alive while any connection is open.
    Memory(String),
    File(PathBuf),
}

/// Where connections are opened, plus the schemas attached to each of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    location: Location,
    schemas: Vec<String>,
    settings: ConnectionSettings,
}

impl DataSource {
    /// Named shared-cache in-memory database.
    ///
    /// Every connection opened from the same name sees the same data.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            location: Location::Memory(name.into()),
            schemas: Vec::new(),
            settings: ConnectionSettings::default(),
        }
    }

    /// In-memory database whose name cannot collide with any other one in
    /// this process.
    pub fn unique_in_memory(prefix: &str) -> Self {
        Self::in_memory(format!("{prefix}-{}", Uuid::new_v4().simple()))
    }

    /// File-backed database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            schemas: Vec::new(),
            settings: ConnectionSettings::default(),
        }
    }

    /// Adds a schema attached to every connection opened from this source.
    ///
    /// Attaching is idempotent per connection, so repeating a name is harmless
    /// but the name is recorded once.
    pub fn with_schema(mut self, schema: &str) -> DbResult<Self> {
        validate_schema_name(schema)?;
        if !self.schemas.iter().any(|existing| existing == schema) {
            self.schemas.push(schema.to_string());
        }
        Ok(self)
    }

    /// Replaces the connection settings.
    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Returns whether this source is an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.location, Location::Memory(_))
    }

    /// Connection string handed to SQLite for the main database.
    pub fn url(&self) -> String {
        match &self.location {
            Location::Memory(name) => format!("file:{name}?mode=memory&cache=shared"),
            Location::File(path) => path.display().to_string(),
        }
    }

    /// Connection string of the database attached as `schema`.
    pub(crate) fn schema_url(&self, schema: &str) -> String {
        match &self.location {
            Location::Memory(name) => format!("file:{name}-{schema}?mode=memory&cache=shared"),
            Location::File(path) => {
                let stem = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "db".to_string());
                path.with_file_name(format!("{stem}.{schema}.db"))
                    .display()
                    .to_string()
            }
        }
    }

    /// Short label used in log lines.
    pub(crate) fn mode(&self) -> &'static str {
        match self.location {
            Location::Memory(_) => "memory",
            Location::File(_) => "file",
        }
    }
}

pub(crate) fn validate_schema_name(schema: &str) -> DbResult<()> {
    if SCHEMA_NAME_PATTERN.is_match(schema) && !schema.eq_ignore_ascii_case("main") {
        return Ok(());
    }
    Err(DbError::InvalidSchemaName(schema.to_string()))
}
