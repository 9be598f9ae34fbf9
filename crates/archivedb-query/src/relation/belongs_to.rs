use super::{Inverse, collect_keys, key_of, point_foreign_key, require_nullable, select_in};
use crate::ops;
use crate::persist::Persist;
use archivedb_core::{Entity, Executor, Related, Result, Value};
use std::sync::Arc;

/// Many-to-one: `O.foreign_key` references `R.references`.
pub struct BelongsTo<O, R> {
    pub name: &'static str,
    /// Column on the owner table.
    pub foreign_key: &'static str,
    /// Referenced column on the related table.
    pub references: &'static str,
    pub slot: fn(&mut O) -> &mut Related<R>,
    pub inverse: Inverse<R, O>,
}

impl<O, R> Clone for BelongsTo<O, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, R> Copy for BelongsTo<O, R> {}

impl<O: Entity, R: Entity> BelongsTo<O, R> {
    /// Load the related record for every owner in one query.
    ///
    /// Every owner gets the first returned row whose key equals its foreign
    /// key; owners sharing a key share the same `Arc`. Owners with a NULL or
    /// unmatched foreign key end up loaded-empty.
    pub fn load<X: Executor + ?Sized>(&self, exec: &X, owners: &mut [O]) -> Result<()> {
        let keys = collect_keys(owners, self.foreign_key)?;
        let related: Vec<R> = if keys.is_empty() {
            Vec::new()
        } else {
            select_in(exec, self.references, &keys)?
        };

        let mut by_key = Vec::with_capacity(related.len());
        for rel in related {
            by_key.push((rel.get_column(self.references)?, Arc::new(rel)));
        }

        let mut matched = Vec::with_capacity(owners.len());
        for owner in owners.iter() {
            let fk = owner.get_column(self.foreign_key)?;
            matched.push(
                by_key
                    .iter()
                    .find(|(pk, _)| !fk.is_null() && fk.key_eq(pk))
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
            "loaded belongs-to relationship"
        );
        Ok(())
    }

    pub fn load_one<X: Executor + ?Sized>(&self, exec: &X, owner: &mut O) -> Result<()> {
        self.load(exec, std::slice::from_mut(owner))
    }

    /// Point the owner at `related`, optionally inserting `related` first.
    ///
    /// Issues `UPDATE owner SET fk = related.key WHERE owner.pk`.
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
        if insert {
            ops::insert::<R, X, &str>(exec, &mut related, &[])?;
        }
        let key = key_of(&related, self.references, self.name)?;
        point_foreign_key(exec, owner, self.foreign_key, &key, self.name)?;

        self.inverse.attach(&mut related, owner);
        let related = Arc::new(related);
        (self.slot)(owner).set(Arc::clone(&related));

        tracing::debug!(relationship = self.name, "set belongs-to relationship");
        Ok(related)
    }

    /// Null the owner's foreign key and drop the link on both sides.
    ///
    /// Fails with a relationship error when the foreign key is not nullable.
    pub fn remove<X: Executor + ?Sized>(
        &self,
        exec: &X,
        owner: &mut O,
        related: &mut R,
    ) -> Result<()> {
        require_nullable::<O>(self.foreign_key, self.name)?;
        point_foreign_key(exec, owner, self.foreign_key, &Value::Null, self.name)?;

        (self.slot)(owner).set_none();
        self.inverse.detach(related, owner);

        tracing::debug!(relationship = self.name, "removed belongs-to relationship");
        Ok(())
    }
}
