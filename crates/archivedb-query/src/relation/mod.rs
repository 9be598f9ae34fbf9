//! Relationship loading and mutation.
//!
//! Each relationship is a `const` descriptor naming the key columns and the
//! slot accessor on the owner's relation side-structure:
//!
//! - [`BelongsTo`]: the owner holds the foreign key.
//! - [`HasOne`] / [`HasMany`]: the related table holds the foreign key.
//! - [`ManyToMany`]: both keys live in a bridge table.
//!
//! Loads issue one `IN (...)` query for the whole owner slice, decode every
//! returned row, and only then attach results, so a failed load leaves the
//! owners untouched. Back-references on related records hold detached
//! snapshots of the owner and are maintained by the mutations only.

mod belongs_to;
mod has_many;
mod has_one;
mod many_to_many;

pub use belongs_to::BelongsTo;
pub use has_many::HasMany;
pub use has_one::HasOne;
pub use many_to_many::{Bridge, ManyToMany};

use crate::ops::log_statement;
use archivedb_core::{Entity, Error, Executor, Operation, Related, RelatedMany, Result, Value};
use std::sync::Arc;

/// The back-reference slot on the related side, if any.
pub enum Inverse<R, O> {
    None,
    One(fn(&mut R) -> &mut Related<O>),
    Many(fn(&mut R) -> &mut RelatedMany<O>),
}

impl<R, O> Clone for Inverse<R, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, O> Copy for Inverse<R, O> {}

impl<R, O> std::fmt::Debug for Inverse<R, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Inverse::None => "None",
            Inverse::One(_) => "One",
            Inverse::Many(_) => "Many",
        })
    }
}

impl<R, O: Entity> Inverse<R, O> {
    /// Point `related` back at a snapshot of `owner`.
    pub(crate) fn attach(&self, related: &mut R, owner: &O) {
        match self {
            Inverse::None => {}
            Inverse::One(slot) => slot(related).set(Arc::new(owner.detached())),
            Inverse::Many(slot) => slot(related).push(Arc::new(owner.detached())),
        }
    }

    /// Drop `owner` from `related`'s back-reference.
    pub(crate) fn detach(&self, related: &mut R, owner: &O) {
        match self {
            Inverse::None => {}
            Inverse::One(slot) => slot(related).set_none(),
            Inverse::Many(slot) => {
                slot(related).remove_where(|o| same_key(o, owner));
            }
        }
    }
}

/// Primary-key equality between two records of one type.
pub(crate) fn same_key<E: Entity>(a: &E, b: &E) -> bool {
    let (ka, kb) = (a.primary_key_value(), b.primary_key_value());
    ka.len() == kb.len() && ka.iter().zip(&kb).all(|(x, y)| x.key_eq(y))
}

/// Distinct non-NULL values of `column` across `entities`.
pub(crate) fn collect_keys<E: Entity>(entities: &[E], column: &str) -> Result<Vec<Value>> {
    let mut keys: Vec<Value> = Vec::with_capacity(entities.len());
    for entity in entities {
        let value = entity.get_column(column)?;
        if value.is_null() || keys.iter().any(|k| k.key_eq(&value)) {
            continue;
        }
        keys.push(value);
    }
    Ok(keys)
}

/// `SELECT * FROM "t" WHERE "column" IN (...)`, fully decoded.
pub(crate) fn select_in<R: Entity, X: Executor + ?Sized>(
    exec: &X,
    column: &str,
    keys: &[Value],
) -> Result<Vec<R>> {
    let dialect = exec.dialect();
    let sql = format!(
        "SELECT * FROM {} WHERE {} IN ({})",
        dialect.quote_identifier(R::TABLE_NAME),
        dialect.quote_identifier(column),
        dialect.placeholders(keys.len(), 1)
    );
    log_statement(R::TABLE_NAME, &sql, keys);
    let rows = exec
        .query(&sql, keys)
        .map_err(|e| Error::execution(R::TABLE_NAME, Operation::Load, e))?;
    rows.iter().map(R::from_row).collect()
}

/// The owner's single-column key, rejecting NULL.
pub(crate) fn key_of<E: Entity>(entity: &E, column: &str, relationship: &'static str) -> Result<Value> {
    let value = entity.get_column(column)?;
    if value.is_null() {
        return Err(Error::relationship(
            relationship,
            format!("{}.{} is null", E::TABLE_NAME, column),
        ));
    }
    Ok(value)
}

/// Fail unless `E.column` accepts NULL.
pub(crate) fn require_nullable<E: Entity>(column: &str, relationship: &'static str) -> Result<()> {
    match E::descriptor().column(column) {
        Some(def) if def.nullable => Ok(()),
        Some(_) => Err(Error::relationship(
            relationship,
            format!("{}.{} is not nullable", E::TABLE_NAME, column),
        )),
        None => Err(Error::binding(E::TABLE_NAME, column)),
    }
}

/// `UPDATE "t" SET "column"=$1 WHERE <pk>` for one record, then mirror it in memory.
pub(crate) fn point_foreign_key<E: Entity, X: Executor + ?Sized>(
    exec: &X,
    target: &mut E,
    column: &str,
    value: &Value,
    relationship: &'static str,
) -> Result<()> {
    let key = target.primary_key_value();
    if key.iter().any(Value::is_null) {
        return Err(Error::relationship(
            relationship,
            format!("{} row has no primary key", E::TABLE_NAME),
        ));
    }

    let dialect = exec.dialect();
    let sql = format!(
        "UPDATE {} SET {}={} WHERE {}",
        dialect.quote_identifier(E::TABLE_NAME),
        dialect.quote_identifier(column),
        dialect.placeholder(1),
        dialect.where_equals(E::descriptor().primary_key, 2)
    );
    let mut params = Vec::with_capacity(key.len() + 1);
    params.push(value.clone());
    params.extend(key);
    log_statement(E::TABLE_NAME, &sql, &params);
    exec.execute(&sql, &params)
        .map_err(|e| Error::execution(E::TABLE_NAME, Operation::Relate, e))?;

    target.set_column(column, value)
}
