//! Entity trait and query parameter sets.

use rusqlite::types::{ToSql, Value};
use rusqlite::Row;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Named bind values (`:name` placeholders). Keys may omit the prefix.
pub type NamedParams = BTreeMap<String, String>;

/// Positional bind values (`?N` placeholders), keyed by 1-based index.
pub type PositionalParams = BTreeMap<u32, String>;

/// A Rust type persisted as one row of one table.
///
/// Implementors describe their mapping statically; the session uses it to
/// build insert, merge, lookup and delete statements and to translate
/// query-language text.
///
/// ```ignore
/// impl Entity for Vessel {
///     type Id = i64;
///     const NAME: &'static str = "Vessel";
///     const TABLE: &'static str = "activity.vessels";
///     const COLUMNS: &'static [&'static str] = &["cfr", "name", "flag_state"];
///     // ...
/// }
/// ```
pub trait Entity: Sized {
    /// Key type. Must bind as SQL and print for diagnostics.
    type Id: ToSql + Display;

    /// Name used by query-language text (`from Vessel v ...`).
    const NAME: &'static str;
    /// Table name, optionally schema-qualified (`schema.table`).
    const TABLE: &'static str;
    /// Key column.
    const ID_COLUMN: &'static str = "id";
    /// Non-key columns, in the order returned by [`Entity::values`].
    const COLUMNS: &'static [&'static str];

    /// Returns the key, or `None` when the store is expected to generate it.
    fn id(&self) -> Option<Self::Id>;

    /// Column values aligned with [`Entity::COLUMNS`].
    fn values(&self) -> Vec<Value>;

    /// Decodes one row selected with the key column and all columns.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Receives the generated row id after an insert without a key.
    ///
    /// The default ignores it, which suits entities with caller-assigned keys.
    fn assign_generated_id(&mut self, _rowid: i64) {}
}

/// Comma-separated select list of the key and all columns of `T`.
///
/// Columns are qualified with `alias` when one is given.
pub(crate) fn select_list<T: Entity>(alias: Option<&str>) -> String {
    std::iter::once(T::ID_COLUMN)
        .chain(T::COLUMNS.iter().copied())
        .map(|column| match alias {
            Some(alias) => format!("{alias}.{column}"),
            None => column.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
