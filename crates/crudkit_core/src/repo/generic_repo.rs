//! Repository contract and session-backed implementation.

use crate::logging::summarize_for_log;
use crate::model::entity::{Entity, NamedParams, PositionalParams};
use crate::repo::error::{Operation, PersistenceError, RepoResult};
use crate::session::{Session, SessionResult};
use log::{debug, error};
use std::marker::PhantomData;

/// CRUD and query operations for entities of type `T`.
pub trait Repository<T: Entity> {
    /// Inserts `entity` and returns it, with a generated key when it had none.
    fn create(&self, entity: T) -> RepoResult<T>;
    /// Merges `entity` into the store (insert when its key is unknown).
    fn update(&self, entity: T) -> RepoResult<T>;
    fn find_by_id(&self, id: &T::Id) -> RepoResult<Option<T>>;
    /// Runs store-native SQL. The text is not validated.
    fn find_by_raw_query(&self, sql: &str) -> RepoResult<Vec<T>>;
    fn find_by_raw_query_with_params(
        &self,
        sql: &str,
        params: &NamedParams,
    ) -> RepoResult<Vec<T>>;
    /// Runs query-language text (`from Name alias where ...`).
    fn find_by_query_language(&self, query: &str) -> RepoResult<Vec<T>>;
    fn find_by_query_language_with_params(
        &self,
        query: &str,
        params: &PositionalParams,
    ) -> RepoResult<Vec<T>>;
    /// Same as [`Repository::find_by_query_language_with_params`], capped at
    /// `max_results` rows. A non-positive cap means unlimited.
    fn find_by_query_language_limited(
        &self,
        query: &str,
        params: &PositionalParams,
        max_results: i64,
    ) -> RepoResult<Vec<T>>;
    fn find_by_named_query(&self, name: &str) -> RepoResult<Vec<T>>;
    fn find_by_named_query_with_params(
        &self,
        name: &str,
        params: &NamedParams,
    ) -> RepoResult<Vec<T>>;
    fn find_by_named_query_limited(
        &self,
        name: &str,
        params: &NamedParams,
        max_results: i64,
    ) -> RepoResult<Vec<T>>;
    /// Returns every stored `T`. Unbounded.
    fn find_all(&self) -> RepoResult<Vec<T>>;
    /// Removes the `T` stored under `id`. `entity` only selects the mapping.
    fn delete(&self, entity: &T, id: &T::Id) -> RepoResult<()>;
}

/// Repository bound to an injected session.
pub struct SessionRepository<'s, T> {
    session: &'s Session,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> SessionRepository<'s, T> {
    pub fn new(session: &'s Session) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    fn query_language(
        &self,
        query: &str,
        params: &PositionalParams,
        max_results: i64,
    ) -> RepoResult<Vec<T>> {
        let text = summarize_for_log(query);
        debug!(
            "event=entity_query module=repo status=start kind=query_language entity={} query={text}",
            T::NAME
        );
        let result = self.session.create_query::<T>(query).and_then(|query| {
            query
                .bind_positional(params)
                .max_results(max_results)
                .result_list()
        });
        collapse(result, Operation::QueryLanguage, || {
            format!("entity={} query={text}", T::NAME)
        })
    }

    fn named_query(
        &self,
        name: &str,
        params: &NamedParams,
        max_results: i64,
    ) -> RepoResult<Vec<T>> {
        debug!(
            "event=entity_query module=repo status=start kind=named entity={} name={name}",
            T::NAME
        );
        let result = self.session.create_named_query::<T>(name).and_then(|query| {
            query
                .bind_named(params)
                .max_results(max_results)
                .result_list()
        });
        collapse(result, Operation::NamedQuery, || {
            format!("entity={} name={name}", T::NAME)
        })
    }
}

impl<T: Entity> Repository<T> for SessionRepository<'_, T> {
    fn create(&self, mut entity: T) -> RepoResult<T> {
        debug!("event=entity_create module=repo status=start entity={}", T::NAME);
        let result = self.session.persist(&mut entity);
        collapse(result, Operation::Create, || format!("entity={}", T::NAME))?;
        Ok(entity)
    }

    fn update(&self, mut entity: T) -> RepoResult<T> {
        debug!("event=entity_update module=repo status=start entity={}", T::NAME);
        let result = self.session.merge(&mut entity);
        collapse(result, Operation::Update, || format!("entity={}", T::NAME))?;
        Ok(entity)
    }

    fn find_by_id(&self, id: &T::Id) -> RepoResult<Option<T>> {
        debug!(
            "event=entity_find module=repo status=start entity={} id={id}",
            T::NAME
        );
        let result = self.session.find::<T>(id);
        collapse(result, Operation::FindById, || {
            format!("entity={} id={id}", T::NAME)
        })
    }

    fn find_by_raw_query(&self, sql: &str) -> RepoResult<Vec<T>> {
        self.find_by_raw_query_with_params(sql, &NamedParams::new())
    }

    fn find_by_raw_query_with_params(
        &self,
        sql: &str,
        params: &NamedParams,
    ) -> RepoResult<Vec<T>> {
        let text = summarize_for_log(sql);
        debug!(
            "event=entity_query module=repo status=start kind=raw entity={} query={text}",
            T::NAME
        );
        let result = self
            .session
            .create_native_query::<T>(sql)
            .bind_named(params)
            .result_list();
        collapse(result, Operation::RawQuery, || {
            format!("entity={} query={text}", T::NAME)
        })
    }

    fn find_by_query_language(&self, query: &str) -> RepoResult<Vec<T>> {
        self.query_language(query, &PositionalParams::new(), 0)
    }

    fn find_by_query_language_with_params(
        &self,
        query: &str,
        params: &PositionalParams,
    ) -> RepoResult<Vec<T>> {
        self.query_language(query, params, 0)
    }

    fn find_by_query_language_limited(
        &self,
        query: &str,
        params: &PositionalParams,
        max_results: i64,
    ) -> RepoResult<Vec<T>> {
        self.query_language(query, params, max_results)
    }

    fn find_by_named_query(&self, name: &str) -> RepoResult<Vec<T>> {
        self.named_query(name, &NamedParams::new(), 0)
    }

    fn find_by_named_query_with_params(
        &self,
        name: &str,
        params: &NamedParams,
    ) -> RepoResult<Vec<T>> {
        self.named_query(name, params, 0)
    }

    fn find_by_named_query_limited(
        &self,
        name: &str,
        params: &NamedParams,
        max_results: i64,
    ) -> RepoResult<Vec<T>> {
        self.named_query(name, params, max_results)
    }

    fn find_all(&self) -> RepoResult<Vec<T>> {
        debug!("event=entity_find_all module=repo status=start entity={}", T::NAME);
        let result = self
            .session
            .create_query::<T>(&format!("from {}", T::NAME))
            .and_then(|query| query.result_list());
        collapse(result, Operation::FindAll, || format!("entity={}", T::NAME))
    }

    fn delete(&self, _entity: &T, id: &T::Id) -> RepoResult<()> {
        debug!(
            "event=entity_delete module=repo status=start entity={} id={id}",
            T::NAME
        );
        let result = self.session.remove_by_id::<T>(id);
        collapse(result, Operation::Delete, || {
            format!("entity={} id={id}", T::NAME)
        })
    }
}

/// Logs a failed session call with its context and swaps the error for the
/// opaque `PersistenceError`.
fn collapse<V>(
    result: SessionResult<V>,
    operation: Operation,
    context: impl FnOnce() -> String,
) -> RepoResult<V> {
    result.map_err(|cause| {
        error!(
            "event=entity_{} module=repo status=error {} error={}",
            operation.as_str(),
            context(),
            summarize_for_log(&cause.to_string())
        );
        PersistenceError::new(operation, cause)
    })
}
