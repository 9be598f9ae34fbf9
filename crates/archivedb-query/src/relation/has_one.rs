use super::{Inverse, collect_keys, key_of, point_foreign_key, require_nullable, select_in};
use crate::ops;
use crate::persist::Persist;
use archivedb_core::{Entity, Executor, Related, Result, Value};
use std::sync::Arc;

/// One-to-one: `R.foreign_key` references `O.local_key`.
pub struct HasOne<O, R> {
    pub name: &'static str,
    /// Column on the related table.
    pub foreign_key: &'static str,
    /// Referenced column on the owner table.
    pub local_key: &'static str,
    pub slot: fn(&mut O) -> &mut Related<R>,
    pub inverse: Inverse<R, O>,
}

impl<O, R> Clone for HasOne<O, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, R> Copy for HasOne<O, R> {}

impl<O: Entity, R: Entity> HasOne<O, R> {
    /// Load the related record for every owner in one query.
    ///
    /// Each owner takes the first returned row pointing at its key, so owners
    /// with equal keys share one `Arc`.
    pub fn load<X: Executor + ?Sized>(&self, exec: &X, owners: &mut [O]) -> Result<()> {
        let keys = collect_keys(owners, self.local_key)?;
        let related: Vec<R> = if keys.is_empty() {
            Vec::new()
        } else {
            select_in(exec, self.foreign_key, &keys)?
        };

        let mut by_fk = Vec::with_capacity(related.len());
        for rel in related {
            by_fk.push((rel.get_column(self.foreign_key)?, Arc::new(rel)));
        }

        let mut matched = Vec::with_capacity(owners.len());
        for owner in owners.iter() {
            let local = owner.get_column(self.local_key)?;
            matched.push(
                by_fk
                    .iter()
                    .find(|(fk, _)| !local.is_null() && local.key_eq(fk))
                    .map(|(_, rel)| Arc::clone(rel)),
            );
        }

        let mut loaded = 0;
        for (owner, rel) in owners.iter_mut().zip(matched) {
            let slot = (self.slot)(owner);
            match rel {
                Some(rel) => {
                    slot.set(rel);
                    loaded += 1;
                }
                None => slot.set_none(),
            }
        }

        tracing::debug!(
            relationship = self.name,
            owner_count = owners.len(),
            key_count = keys.len(),
            loaded,
            "loaded has-one relationship"
        );
        Ok(())
    }

    pub fn load_one<X: Executor + ?Sized>(&self, exec: &X, owner: &mut O) -> Result<()> {
        self.load(exec, std::slice::from_mut(owner))
    }

    /// Point `related` at the owner, inserting it or updating its foreign key.
    pub fn set<X: Executor + ?Sized>(
        &self,
        exec: &X,
        owner: &mut O,
        mut related: R,
        insert: bool,
    ) -> Result<Arc<R>>
    where
        R: Persist,
    {
        let key = key_of(owner, self.local_key, self.name)?;
        if insert {
            related.set_column(self.foreign_key, &key)?;
            ops::insert::<R, X, &str>(exec, &mut related, &[])?;
        } else {
            point_foreign_key(exec, &mut related, self.foreign_key, &key, self.name)?;
        }

        self.inverse.attach(&mut related, owner);
        let related = Arc::new(related);
        (self.slot)(owner).set(Arc::clone(&related));

        tracing::debug!(relationship = self.name, "set has-one relationship");
        Ok(related)
    }

    /// Null `related`'s foreign key and drop the link on both sides.
    pub fn remove<X: Executor + ?Sized>(
        &self,
        exec: &X,
        owner: &mut O,
        related: &mut R,
    ) -> Result<()> {
        require_nullable::<R>(self.foreign_key, self.name)?;
        point_foreign_key(exec, related, self.foreign_key, &Value::Null, self.name)?;

        self.inverse.detach(related, owner);
        (self.slot)(owner).set_none();

        tracing::debug!(relationship = self.name, "removed has-one relationship");
        Ok(())
    }
}
