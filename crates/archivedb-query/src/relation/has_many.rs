use super::{Inverse, collect_keys, key_of, point_foreign_key, require_nullable, same_key, select_in};
use crate::ops::{self, log_statement};
use crate::persist::Persist;
use archivedb_core::{Entity, Error, Executor, Operation, RelatedMany, Result, Value};
use std::sync::Arc;

/// One-to-many: many `R` rows carry `foreign_key` pointing at `O.local_key`.
pub struct HasMany<O, R> {
    pub name: &'static str,
    /// Column on the related table.
    pub foreign_key: &'static str,
    /// Referenced column on the owner table.
    pub local_key: &'static str,
    pub slot: fn(&mut O) -> &mut RelatedMany<R>,
    pub inverse: Inverse<R, O>,
}

impl<O, R> Clone for HasMany<O, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, R> Copy for HasMany<O, R> {}

impl<O: Entity, R: Entity> HasMany<O, R> {
    /// Load the related rows for every owner in one query.
    ///
    /// Every owner's slot is reset and marked loaded, even when nothing
    /// matches it. Owners with equal keys receive the same rows.
    pub fn load<X: Executor + ?Sized>(&self, exec: &X, owners: &mut [O]) -> Result<()> {
        let keys = collect_keys(owners, self.local_key)?;
        let related: Vec<R> = if keys.is_empty() {
            Vec::new()
        } else {
            select_in(exec, self.foreign_key, &keys)?
        };

        let mut locals = Vec::with_capacity(owners.len());
        for owner in owners.iter() {
            locals.push(owner.get_column(self.local_key)?);
        }

        let mut buckets: Vec<Vec<Arc<R>>> = vec![Vec::new(); owners.len()];
        let mut loaded = 0;
        for rel in related {
            let fk = rel.get_column(self.foreign_key)?;
            let rel = Arc::new(rel);
            let mut attached = false;
            for (idx, local) in locals.iter().enumerate() {
                if !local.is_null() && local.key_eq(&fk) {
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
            "loaded has-many relationship"
        );
        Ok(())
    }

    pub fn load_one<X: Executor + ?Sized>(&self, exec: &X, owner: &mut O) -> Result<()> {
        self.load(exec, std::slice::from_mut(owner))
    }

    /// Append `related` to the owner's collection.
    ///
    /// With `insert`, each record gets the owner's key and is inserted;
    /// otherwise each existing row has its foreign key updated in place.
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
        let key = key_of(owner, self.local_key, self.name)?;
        let mut added = Vec::with_capacity(related.len());
        for mut rel in related {
            if insert {
                rel.set_column(self.foreign_key, &key)?;
                ops::insert::<R, X, &str>(exec, &mut rel, &[])?;
            } else {
                point_foreign_key(exec, &mut rel, self.foreign_key, &key, self.name)?;
            }
            self.inverse.attach(&mut rel, owner);
            added.push(Arc::new(rel));
        }

        let slot = (self.slot)(owner);
        for rel in &added {
            slot.push(Arc::clone(rel));
        }

        tracing::debug!(relationship = self.name, added = added.len(), "added to has-many relationship");
        Ok(added)
    }

    /// Replace the owner's collection.
    ///
    /// Every row currently pointing at the owner has its foreign key nulled
    /// first, so the foreign key must be nullable.
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
        require_nullable::<R>(self.foreign_key, self.name)?;
        let key = key_of(owner, self.local_key, self.name)?;

        let dialect = exec.dialect();
        let fk = dialect.quote_identifier(self.foreign_key);
        let sql = format!(
            "UPDATE {} SET {}=NULL WHERE {}={}",
            dialect.quote_identifier(R::TABLE_NAME),
            fk,
            fk,
            dialect.placeholder(1)
        );
        let params = [key];
        log_statement(R::TABLE_NAME, &sql, &params);
        exec.execute(&sql, &params)
            .map_err(|e| Error::execution(R::TABLE_NAME, Operation::Relate, e))?;

        (self.slot)(owner).set(Vec::new());
        self.add(exec, owner, related, insert)
    }

    /// Null the foreign key on each of `related` and drop them from the owner.
    pub fn remove<X: Executor + ?Sized>(
        &self,
        exec: &X,
        owner: &mut O,
        related: &mut [R],
    ) -> Result<()> {
        require_nullable::<R>(self.foreign_key, self.name)?;
        for rel in related.iter_mut() {
            point_foreign_key(exec, rel, self.foreign_key, &Value::Null, self.name)?;
            self.inverse.detach(rel, owner);
        }

        let slot = (self.slot)(owner);
        let mut removed = 0;
        for rel in related.iter() {
            removed += slot.remove_where(|item| same_key(item, rel));
        }

        tracing::debug!(relationship = self.name, removed, "removed from has-many relationship");
        Ok(())
    }
}
