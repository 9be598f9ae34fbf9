//! The per-entity persistence handle.

use crate::cache::StatementCache;
use crate::ops;
use archivedb_core::{Entity, Executor, Result, Value};

/// Caller inputs for an upsert.
///
/// Empty `conflict_columns` target the primary key. Empty `update_columns`
/// update every non-key column on conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    pub update_on_conflict: bool,
    pub conflict_columns: Vec<String>,
    pub update_columns: Vec<String>,
    pub whitelist: Vec<String>,
}

fn owned<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns.into_iter().map(Into::into).collect()
}

impl UpsertOptions {
    /// `ON CONFLICT ... DO UPDATE` over the non-key columns.
    pub fn update() -> Self {
        Self {
            update_on_conflict: true,
            ..Self::default()
        }
    }

    /// `ON CONFLICT ... DO NOTHING`.
    pub fn ignore() -> Self {
        Self::default()
    }

    pub fn conflict<I: IntoIterator<Item = S>, S: Into<String>>(mut self, columns: I) -> Self {
        self.conflict_columns = owned(columns);
        self
    }

    pub fn update_columns<I: IntoIterator<Item = S>, S: Into<String>>(mut self, columns: I) -> Self {
        self.update_columns = owned(columns);
        self
    }

    pub fn whitelist<I: IntoIterator<Item = S>, S: Into<String>>(mut self, columns: I) -> Self {
        self.whitelist = owned(columns);
        self
    }
}

/// An entity with its own statement cache.
///
/// `#[derive(Entity)]` implements this with a process-wide cache created on
/// first use. The provided methods are thin wrappers over [`crate::ops`].
pub trait Persist: Entity {
    /// The cache holding this entity's compiled plans.
    fn statement_cache() -> &'static StatementCache;

    fn find<X: Executor + ?Sized>(exec: &X, key: &[Value]) -> Result<Option<Self>> {
        ops::find(exec, key)
    }

    fn find_columns<X, S>(exec: &X, key: &[Value], columns: &[S]) -> Result<Option<Self>>
    where
        Self: Default,
        X: Executor + ?Sized,
        S: AsRef<str>,
    {
        ops::find_columns(exec, key, columns)
    }

    fn all<X: Executor + ?Sized>(exec: &X) -> Result<Vec<Self>> {
        ops::all(exec)
    }

    fn count<X: Executor + ?Sized>(exec: &X) -> Result<u64> {
        ops::count::<Self, X>(exec)
    }

    fn exists<X: Executor + ?Sized>(exec: &X, key: &[Value]) -> Result<bool> {
        ops::exists::<Self, X>(exec, key)
    }

    fn insert<X: Executor + ?Sized, S: AsRef<str>>(&mut self, exec: &X, whitelist: &[S]) -> Result<()> {
        ops::insert(exec, self, whitelist)
    }

    fn update<X: Executor + ?Sized, S: AsRef<str>>(&mut self, exec: &X, whitelist: &[S]) -> Result<u64> {
        ops::update(exec, self, whitelist)
    }

    fn upsert<X: Executor + ?Sized>(&mut self, exec: &X, options: &UpsertOptions) -> Result<()> {
        ops::upsert(exec, self, options)
    }

    fn delete<X: Executor + ?Sized>(&self, exec: &X) -> Result<u64> {
        ops::delete(exec, self)
    }

    fn reload<X: Executor + ?Sized>(&mut self, exec: &X) -> Result<()> {
        ops::reload(exec, self)
    }

    fn delete_all<X: Executor + ?Sized>(exec: &X, entities: &[Self]) -> Result<u64> {
        ops::delete_all(exec, entities)
    }

    fn update_all<X: Executor + ?Sized>(
        exec: &X,
        entities: &[Self],
        columns: &[(&str, Value)],
    ) -> Result<u64> {
        ops::update_all(exec, entities, columns)
    }

    fn reload_all<X: Executor + ?Sized>(exec: &X, entities: &mut [Self]) -> Result<()> {
        ops::reload_all(exec, entities)
    }
}
