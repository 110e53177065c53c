//! Persistence unit: the named configuration a session factory is built from.

use crate::db::schema::DdlScript;
use std::collections::BTreeMap;

/// Query definition registered under a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedQuery {
    /// Query-language text, translated against the requested entity.
    QueryLanguage(String),
    /// Store-native SQL, executed as written.
    Native(String),
}

/// Named set of schema DDL and named queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceUnit {
    name: String,
    ddl: Vec<DdlScript>,
    named_queries: BTreeMap<String, NamedQuery>,
}

impl PersistenceUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ddl: Vec::new(),
            named_queries: BTreeMap::new(),
        }
    }

    /// Registers a DDL batch under `version`.
    ///
    /// Scripts are kept in ascending version order; registering an existing
    /// version replaces its text.
    pub fn with_ddl(mut self, version: u32, sql: impl Into<String>) -> Self {
        let script = DdlScript {
            version,
            sql: sql.into(),
        };
        match self
            .ddl
            .binary_search_by_key(&version, |existing| existing.version)
        {
            Ok(index) => self.ddl[index] = script,
            Err(index) => self.ddl.insert(index, script),
        }
        self
    }

    /// Registers query-language text under `name`.
    pub fn with_named_query(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.named_queries
            .insert(name.into(), NamedQuery::QueryLanguage(text.into()));
        self
    }

    /// Registers native SQL under `name`.
    pub fn with_named_native_query(
        mut self,
        name: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        self.named_queries
            .insert(name.into(), NamedQuery::Native(sql.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ddl(&self) -> &[DdlScript] {
        &self.ddl
    }

    pub fn named_query(&self, name: &str) -> Option<&NamedQuery> {
        self.named_queries.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{NamedQuery, PersistenceUnit};

    #[test]
    fn ddl_scripts_stay_sorted_and_replace_same_version() {
        let unit = PersistenceUnit::new("test")
            .with_ddl(2, "CREATE TABLE b (id INTEGER);")
            .with_ddl(1, "CREATE TABLE a (id INTEGER);")
            .with_ddl(2, "CREATE TABLE c (id INTEGER);");

        let versions: Vec<u32> = unit.ddl().iter().map(|script| script.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(unit.ddl()[1].sql, "CREATE TABLE c (id INTEGER);");
    }

    #[test]
    fn named_queries_keep_their_kind() {
        let unit = PersistenceUnit::new("test")
            .with_named_query("Trip.all", "from Trip")
            .with_named_native_query("Trip.raw", "SELECT * FROM trips");

        assert_eq!(
            unit.named_query("Trip.all"),
            Some(&NamedQuery::QueryLanguage("from Trip".to_string()))
        );
        assert_eq!(
            unit.named_query("Trip.raw"),
            Some(&NamedQuery::Native("SELECT * FROM trips".to_string()))
        );
        assert!(unit.named_query("Trip.missing").is_none());
    }
}
