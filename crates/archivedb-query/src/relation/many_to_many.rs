use super::{Inverse, collect_keys, key_of, same_key};
use crate::ops::{self, log_statement};
use crate::persist::Persist;
use archivedb_core::{Entity, Error, Executor, Operation, RelatedMany, Result, Value};
use std::sync::Arc;

/// Alias carrying the owner key through the bridge join.
const OWNER_KEY: &str = "__owner_key";

/// A join table linking two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bridge {
    pub table: &'static str,
    /// Bridge column referencing the owner.
    pub owner_column: &'static str,
    /// Bridge column referencing the related record.
    pub related_column: &'static str,
}

/// Many-to-many through a [`Bridge`].
pub struct ManyToMany<O, R> {
    pub name: &'static str,
    pub bridge: Bridge,
    /// Owner column the bridge's `owner_column` references.
    pub local_key: &'static str,
    /// Related column the bridge's `related_column` references.
    pub related_key: &'static str,
    pub slot: fn(&mut O) -> &mut RelatedMany<R>,
    pub inverse: Inverse<R, O>,
}

impl<O, R> Clone for ManyToMany<O, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, R> Copy for ManyToMany<O, R> {}

impl<O: Entity, R: Entity> ManyToMany<O, R> {
    fn wrap(&self) -> impl FnOnce(Error) -> Error {
        let table = self.bridge.table;
        move |e| Error::execution(table, Operation::Relate, e)
    }

    /// Load the related rows for every owner with one join query.
    ///
    /// Owners with equal keys receive the same rows.
    pub fn load<X: Executor + ?Sized>(&self, exec: &X, owners: &mut [O]) -> Result<()> {
        let keys = collect_keys(owners, self.local_key)?;
        let mut pairs: Vec<(Value, R)> = Vec::new();
        if !keys.is_empty() {
            let d = exec.dialect();
            let sql = format!(
                "SELECT {a}.*, {b}.{owner} AS {alias} FROM {related} AS {a} \
                 INNER JOIN {bridge} AS {b} ON {a}.{rkey} = {b}.{rcol} \
                 WHERE {b}.{owner} IN ({params})",
                a = d.quote_identifier("a"),
                b = d.quote_identifier("b"),
                owner = d.quote_identifier(self.bridge.owner_column),
                alias = d.quote_identifier(OWNER_KEY),
                related = d.quote_identifier(R::TABLE_NAME),
                bridge = d.quote_identifier(self.bridge.table),
                rkey = d.quote_identifier(self.related_key),
                rcol = d.quote_identifier(self.bridge.related_column),
                params = d.placeholders(keys.len(), 1),
            );
            log_statement(R::TABLE_NAME, &sql, &keys);
            let rows = exec
                .query(&sql, &keys)
                .map_err(|e| Error::execution(R::TABLE_NAME, Operation::Load, e))?;
            pairs.reserve(rows.len());
            for row in &rows {
                let owner_key = row.get_by_name(OWNER_KEY).cloned().unwrap_or(Value::Null);
                pairs.push((owner_key, R::from_row(row)?));
            }
        }

        let mut locals = Vec::with_capacity(owners.len());
        for owner in owners.iter() {
            locals.push(owner.get_column(self.local_key)?);
        }

        let mut buckets: Vec<Vec<Arc<R>>> = vec![Vec::new(); owners.len()];
        let mut loaded = 0;
        for (owner_key, rel) in pairs {
            let rel = Arc::new(rel);
            let mut attached = false;
            for (idx, local) in locals.iter().enumerate() {
                if !local.is_null() && local.key_eq(&owner_key) {
                    buckets[idx].push(Arc::clone(&rel));
                    attached = true;
                }
            }
            if attached {
                loaded += 1;
            }
        }

        for (owner, items) in owners.iter_mut().zip(buckets) {
            (self.slot)(owner).set(items);
        }

        tracing::debug!(
            relationship = self.name,
            owner_count = owners.len(),
            key_count = keys.len(),
            loaded,
            "loaded many-to-many relationship"
        );
        Ok(())
    }

    pub fn load_one<X: Executor + ?Sized>(&self, exec: &X, owner: &mut O) -> Result<()> {
        self.load(exec, std::slice::from_mut(owner))
    }

    /// Link `related` to the owner, optionally inserting each record first.
    pub fn add<X: Executor + ?Sized>(
        &self,
        exec: &X,
        owner: &mut O,
        related: Vec<R>,
        insert: bool,
    ) -> Result<Vec<Arc<R>>>
    where
        R: Persist,
    {
        let owner_key = key_of(owner, self.local_key, self.name)?;
        let d = exec.dialect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            d.quote_identifier(self.bridge.table),
            d.quote_list(&[self.bridge.owner_column, self.bridge.related_column]),
            d.placeholders(2, 1)
        );

        let mut added = Vec::with_capacity(related.len());
        for mut rel in related {
            if insert {
                ops::insert::<R, X, &str>(exec, &mut rel, &[])?;
            }
            let related_key = key_of(&rel, self.related_key, self.name)?;
            let params = [owner_key.clone(), related_key];
            log_statement(self.bridge.table, &sql, &params);
            exec.execute(&sql, &params).map_err(self.wrap())?;

            self.inverse.attach(&mut rel, owner);
            added.push(Arc::new(rel));
        }

        let slot = (self.slot)(owner);
        for rel in &added {
            slot.push(Arc::clone(rel));
        }

        tracing::debug!(relationship = self.name, added = added.len(), "added to many-to-many relationship");
        Ok(added)
    }

    /// Replace every link of the owner with `related`.
    pub fn set<X: Executor + ?Sized>(
        &self,
        exec: &X,
        owner: &mut O,
        related: Vec<R>,
        insert: bool,
    ) -> Result<Vec<Arc<R>>>
    where
        R: Persist,
    {
        let owner_key = key_of(owner, self.local_key, self.name)?;
        let d = exec.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {}={}",
            d.quote_identifier(self.bridge.table),
            d.quote_identifier(self.bridge.owner_column),
            d.placeholder(1)
        );
        let params = [owner_key];
        log_statement(self.bridge.table, &sql, &params);
        exec.execute(&sql, &params).map_err(self.wrap())?;

        (self.slot)(owner).set(Vec::new());
        self.add(exec, owner, related, insert)
    }

    /// Delete the bridge rows linking the owner to `related`.
    ///
    /// The related records themselves are not deleted.
    pub fn remove<X: Executor + ?Sized>(
        &self,
        exec: &X,
        owner: &mut O,
        related: &mut [R],
    ) -> Result<()> {
        if related.is_empty() {
            return Ok(());
        }
        let owner_key = key_of(owner, self.local_key, self.name)?;
        let mut params = Vec::with_capacity(related.len() + 1);
        params.push(owner_key);
        for rel in related.iter() {
            params.push(key_of(rel, self.related_key, self.name)?);
        }

        let d = exec.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {}={} AND {} IN ({})",
            d.quote_identifier(self.bridge.table),
            d.quote_identifier(self.bridge.owner_column),
            d.placeholder(1),
            d.quote_identifier(self.bridge.related_column),
            d.placeholders(related.len(), 2)
        );
        log_statement(self.bridge.table, &sql, &params);
        exec.execute(&sql, &params).map_err(self.wrap())?;

        for rel in related.iter_mut() {
            self.inverse.detach(rel, owner);
        }
        let slot = (self.slot)(owner);
        let mut removed = 0;
        for rel in related.iter() {
            removed += slot.remove_where(|item| same_key(item, rel));
        }

        tracing::debug!(relationship = self.name, removed, "removed from many-to-many relationship");
        Ok(())
    }
}
