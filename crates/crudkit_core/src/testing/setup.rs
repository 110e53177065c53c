//! Fixture data setup and the tracker that avoids relaunching it.

use crate::db::{open_connection, DataSource, DbResult};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::params_from_iter;

/// One step of a fixture setup.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupOperation {
    /// Deletes every row of each table, in order.
    DeleteAllFrom(Vec<String>),
    /// Inserts `rows` into `columns` of `table`.
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// Arbitrary SQL batch.
    Sql(String),
}

impl SetupOperation {
    pub fn delete_all_from(tables: &[&str]) -> Self {
        Self::DeleteAllFrom(tables.iter().map(|table| table.to_string()).collect())
    }

    /// Starts an insert into `columns` of `table`.
    pub fn insert_into(table: &str, columns: &[&str]) -> InsertBuilder {
        InsertBuilder {
            table: table.to_string(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn sql(sql: impl Into<String>) -> Self {
        Self::Sql(sql.into())
    }

    fn execute(&self, tx: &rusqlite::Transaction<'_>) -> DbResult<()> {
        match self {
            Self::DeleteAllFrom(tables) => {
                for table in tables {
                    tx.execute(&format!("DELETE FROM {table};"), [])?;
                }
            }
            Self::Insert {
                table,
                columns,
                rows,
            } => {
                let placeholders = (1..=columns.len())
                    .map(|index| format!("?{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders});",
                    columns.join(", ")
                ))?;
                for row in rows {
                    stmt.execute(params_from_iter(row.iter()))?;
                }
            }
            Self::Sql(sql) => tx.execute_batch(sql)?,
        }
        Ok(())
    }
}

/// Rows collected for a [`SetupOperation::Insert`].
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl InsertBuilder {
    /// Appends one row, in column order.
    pub fn values(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn build(self) -> SetupOperation {
        SetupOperation::Insert {
            table: self.table,
            columns: self.columns,
            rows: self.rows,
        }
    }
}

impl From<InsertBuilder> for SetupOperation {
    fn from(builder: InsertBuilder) -> Self {
        builder.build()
    }
}

/// Named, ordered list of setup operations run in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DbSetup {
    name: String,
    operations: Vec<SetupOperation>,
}

impl DbSetup {
    pub fn new(name: impl Into<String>, operations: Vec<SetupOperation>) -> Self {
        Self {
            name: name.into(),
            operations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs every operation on a fresh connection; nothing is committed when
    /// one of them fails.
    pub fn launch(&self, source: &DataSource) -> DbResult<()> {
        let mut conn = open_connection(source)?;
        let tx = conn.transaction()?;
        for operation in &self.operations {
            operation.execute(&tx)?;
        }
        tx.commit()?;
        info!(
            "event=db_setup_launch module=testing status=ok setup={} operations={}",
            self.name,
            self.operations.len()
        );
        Ok(())
    }
}

/// Remembers the last launched setup so read-only tests can let the next test
/// reuse its data.
#[derive(Debug, Default)]
pub struct SetupTracker {
    last_launched: Option<(String, DbSetup)>,
    skip_next: bool,
}

impl SetupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches `setup` against `source` unless it is the setup launched last
    /// and [`SetupTracker::skip_next_launch`] was called since.
    ///
    /// Returns whether the setup actually ran.
    pub fn launch_if_necessary(&mut self, setup: &DbSetup, source: &DataSource) -> DbResult<bool> {
        let url = source.url();
        let same_as_last = self
            .last_launched
            .as_ref()
            .is_some_and(|(last_url, last_setup)| *last_url == url && last_setup == setup);

        if self.skip_next && same_as_last {
            self.skip_next = false;
            debug!(
                "event=db_setup_launch module=testing status=skipped setup={}",
                setup.name()
            );
            return Ok(false);
        }

        self.skip_next = false;
        self.last_launched = None;
        setup.launch(source)?;
        self.last_launched = Some((url, setup.clone()));
        Ok(true)
    }

    /// Marks the data of the last launch as untouched.
    pub fn skip_next_launch(&mut self) {
        self.skip_next = true;
    }
}
