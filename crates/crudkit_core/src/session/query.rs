//! Typed queries: query-language translation, parameter binding, execution.
//!
//! # Invariants
//! - Every placeholder of a statement is bound before it executes.
//! - Every supplied value names a placeholder of the statement.
//! - Query-language text targets exactly the entity the query is typed with.
//! - The result cap never rewrites the statement; rows past it are not read.

use super::{SessionError, SessionResult};
use crate::model::entity::{select_list, Entity, NamedParams, PositionalParams};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, Statement};
use std::marker::PhantomData;

static QUERY_HEAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?:select\s+(?P<projection>[A-Za-z_]\w*)\s+)?from\s+(?P<entity>[A-Za-z_]\w*)(?P<tail>.*)$")
        .expect("valid query head regex")
});
static QUERY_ALIAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s+(?P<as>as\s+)?(?P<alias>[A-Za-z_]\w*)(?P<rest>.*)$")
        .expect("valid query alias regex")
});

const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "order", "group", "having", "limit", "join", "inner", "left", "cross", "natural",
    "union",
];

const PARAMETER_PREFIXES: &[char] = &[':', '@', '$'];

/// Query over entities of type `T`, executed once by [`Query::result_list`].
pub struct Query<'s, T> {
    conn: &'s Connection,
    sql: String,
    text: String,
    named: Vec<(String, String)>,
    positional: Vec<(u32, String)>,
    max_results: Option<i64>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> Query<'s, T> {
    pub(crate) fn new(conn: &'s Connection, sql: String, text: String) -> Self {
        Self {
            conn,
            sql,
            text,
            named: Vec::new(),
            positional: Vec::new(),
            max_results: None,
            _entity: PhantomData,
        }
    }

    /// SQL that will be prepared.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Binds a named placeholder. The `:` prefix is optional.
    pub fn set_parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.named.push((name.to_string(), value.into()));
        self
    }

    /// Binds the `?index` placeholder (1-based).
    pub fn set_positional_parameter(mut self, index: u32, value: impl Into<String>) -> Self {
        self.positional.push((index, value.into()));
        self
    }

    pub fn bind_named(self, params: &NamedParams) -> Self {
        params
            .iter()
            .fold(self, |query, (name, value)| query.set_parameter(name, value.as_str()))
    }

    pub fn bind_positional(self, params: &PositionalParams) -> Self {
        params.iter().fold(self, |query, (index, value)| {
            query.set_positional_parameter(*index, value.as_str())
        })
    }

    /// Caps the number of returned rows. Non-positive values mean unlimited.
    pub fn max_results(mut self, limit: i64) -> Self {
        self.max_results = (limit > 0).then_some(limit);
        self
    }

    /// Executes the query and decodes every row as `T`.
    pub fn result_list(self) -> SessionResult<Vec<T>> {
        debug!(
            "event=query_execute module=session entity={} limited={}",
            T::NAME,
            self.max_results.is_some()
        );

        let mut stmt = self
            .conn
            .prepare(trim_statement(&self.sql))
            .map_err(|err| SessionError::malformed(&self.text, err))?;
        bind_parameters(&mut stmt, &self.named, &self.positional)?;

        let cap = self
            .max_results
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        let mut rows = stmt.raw_query();
        let mut entities = Vec::new();
        while entities.len() < cap {
            let Some(row) = rows.next()? else {
                break;
            };
            entities.push(T::from_row(row)?);
        }
        Ok(entities)
    }
}

/// Translates `[SELECT alias] FROM Name [[AS] alias] tail` into SQL over the
/// mapped table of `T`. The tail is passed through unchanged.
pub(crate) fn translate<T: Entity>(text: &str) -> SessionResult<String> {
    let head = QUERY_HEAD_RE
        .captures(text)
        .ok_or_else(|| SessionError::malformed(text, "expected `[SELECT alias] FROM Entity ...`"))?;

    let entity = head.name("entity").map_or("", |m| m.as_str());
    if entity != T::NAME {
        return Err(SessionError::malformed(
            text,
            format!("query targets `{entity}` but `{}` was requested", T::NAME),
        ));
    }

    let tail = head.name("tail").map_or("", |m| m.as_str());
    let (alias, rest) = split_alias(tail);

    if let Some(projection) = head.name("projection").map(|m| m.as_str()) {
        if alias != Some(projection) {
            return Err(SessionError::malformed(
                text,
                format!("projection `{projection}` does not name the query alias"),
            ));
        }
    }

    let sql = match alias {
        Some(alias) => format!(
            "SELECT {} FROM {} AS {alias}{rest}",
            select_list::<T>(Some(alias)),
            T::TABLE
        ),
        None => format!("SELECT {} FROM {}{rest}", select_list::<T>(None), T::TABLE),
    };
    Ok(sql)
}

fn split_alias(tail: &str) -> (Option<&str>, &str) {
    let Some(captures) = QUERY_ALIAS_RE.captures(tail) else {
        return (None, tail);
    };
    let (Some(alias), Some(rest)) = (captures.name("alias"), captures.name("rest")) else {
        return (None, tail);
    };
    let explicit = captures.name("as").is_some();
    if !explicit && is_clause_keyword(alias.as_str()) {
        return (None, tail);
    }
    (Some(alias.as_str()), rest.as_str())
}

fn is_clause_keyword(word: &str) -> bool {
    CLAUSE_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(word))
}

fn trim_statement(sql: &str) -> &str {
    sql.trim().trim_end_matches(';').trim_end()
}

fn bind_parameters(
    stmt: &mut Statement<'_>,
    named: &[(String, String)],
    positional: &[(u32, String)],
) -> SessionResult<()> {
    let count = stmt.parameter_count();
    let mut bound = vec![false; count + 1];

    for (name, value) in named {
        let index = named_index(stmt, name)?
            .ok_or_else(|| SessionError::UnknownParameter(name.clone()))?;
        stmt.raw_bind_parameter(index, value.as_str())?;
        bound[index] = true;
    }

    for (position, value) in positional {
        let index = positional_index(stmt, *position, count)?
            .ok_or_else(|| SessionError::UnknownParameter(format!("?{position}")))?;
        stmt.raw_bind_parameter(index, value.as_str())?;
        bound[index] = true;
    }

    for index in 1..=count {
        if !bound[index] {
            let name = stmt
                .parameter_name(index)
                .map_or_else(|| format!("?{index}"), str::to_string);
            return Err(SessionError::UnboundParameter(name));
        }
    }
    Ok(())
}

fn named_index(stmt: &Statement<'_>, name: &str) -> SessionResult<Option<usize>> {
    if name.starts_with(PARAMETER_PREFIXES) {
        return Ok(stmt.parameter_index(name)?);
    }
    for prefix in PARAMETER_PREFIXES {
        if let Some(index) = stmt.parameter_index(&format!("{prefix}{name}"))? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn positional_index(
    stmt: &Statement<'_>,
    position: u32,
    count: usize,
) -> SessionResult<Option<usize>> {
    if let Some(index) = stmt.parameter_index(&format!("?{position}"))? {
        return Ok(Some(index));
    }
    // Anonymous `?` placeholders are addressed by their slot.
    let slot = usize::try_from(position).unwrap_or(0);
    if slot >= 1 && slot <= count && stmt.parameter_name(slot).is_none() {
        return Ok(Some(slot));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::{split_alias, translate, trim_statement};
    use crate::model::entity::Entity;
    use crate::session::SessionError;
    use rusqlite::types::Value;
    use rusqlite::Row;

    struct Trip {
        id: i64,
        vessel: String,
    }

    impl Entity for Trip {
        type Id = i64;
        const NAME: &'static str = "Trip";
        const TABLE: &'static str = "activity.trips";
        const COLUMNS: &'static [&'static str] = &["vessel"];

        fn id(&self) -> Option<i64> {
            Some(self.id)
        }

        fn values(&self) -> Vec<Value> {
            vec![Value::Text(self.vessel.clone())]
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                vessel: row.get("vessel")?,
            })
        }
    }

    #[test]
    fn translates_bare_from_clause() {
        assert_eq!(
            translate::<Trip>("from Trip").unwrap(),
            "SELECT id, vessel FROM activity.trips"
        );
    }

    #[test]
    fn translates_alias_and_keeps_tail() {
        assert_eq!(
            translate::<Trip>("SELECT t FROM Trip t WHERE t.vessel = ?1 ORDER BY t.id").unwrap(),
            "SELECT t.id, t.vessel FROM activity.trips AS t WHERE t.vessel = ?1 ORDER BY t.id"
        );
        assert_eq!(
            translate::<Trip>("from Trip as t where t.id > 3").unwrap(),
            "SELECT t.id, t.vessel FROM activity.trips AS t where t.id > 3"
        );
    }

    #[test]
    fn clause_keyword_is_not_taken_as_alias() {
        assert_eq!(
            translate::<Trip>("from Trip where vessel = :name").unwrap(),
            "SELECT id, vessel FROM activity.trips where vessel = :name"
        );
        assert_eq!(split_alias(" order by id"), (None, " order by id"));
    }

    #[test]
    fn rejects_other_entity_and_dangling_projection() {
        let other = translate::<Trip>("from Vessel v").unwrap_err();
        assert!(matches!(other, SessionError::MalformedQuery { .. }));

        let projection = translate::<Trip>("select x from Trip t").unwrap_err();
        assert!(matches!(projection, SessionError::MalformedQuery { .. }));

        let garbage = translate::<Trip>("delete everything").unwrap_err();
        assert!(matches!(garbage, SessionError::MalformedQuery { .. }));
    }

    #[test]
    fn trim_statement_drops_trailing_semicolons() {
        assert_eq!(trim_statement("  SELECT 1 ;; \n"), "SELECT 1");
    }
}
