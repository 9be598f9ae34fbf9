//! Entity metadata and the per-column accessor table.
//!
//! An [`Entity`] is the in-memory shape of one table row. Its static
//! [`EntityDescriptor`] lists the columns in source order together with their
//! default/primary-key flags, and [`Entity::accessors`] returns one
//! [`Accessor`] per column in that same order. Statement compilation works on
//! column-name strings and resolves them to accessor indices; no reflection
//! happens at runtime.
//!
//! Both are normally produced by `#[derive(Entity)]`.

use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::Timestamp;
use crate::value::Value;
use std::fmt;

/// Static metadata for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Database column name.
    pub name: &'static str,
    /// Column accepts NULL.
    pub nullable: bool,
    /// Column is (part of) the primary key.
    pub primary_key: bool,
    /// Column has a database-side default (serial ids, `now()`, ...).
    pub has_default: bool,
    /// Referenced `table.column`, if the column is a foreign key.
    pub foreign_key: Option<&'static str>,
}

impl ColumnDef {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            nullable: false,
            primary_key: false,
            has_default: false,
            foreign_key: None,
        }
    }

    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    pub const fn has_default(mut self, value: bool) -> Self {
        self.has_default = value;
        self
    }

    pub const fn foreign_key(mut self, reference: &'static str) -> Self {
        self.foreign_key = Some(reference);
        self
    }
}

/// Per-table column metadata, immutable for the life of the process.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// Table name (unquoted).
    pub table: &'static str,
    /// All columns in source order.
    pub columns: &'static [ColumnDef],
    /// Primary-key columns in key order.
    pub primary_key: &'static [&'static str],
}

impl EntityDescriptor {
    /// All column names in source order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns with a database default.
    pub fn columns_with_default(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.has_default)
            .map(|c| c.name)
            .collect()
    }

    /// Columns without a database default; always part of an INSERT.
    pub fn columns_without_default(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !c.has_default)
            .map(|c| c.name)
            .collect()
    }

    /// All columns except the primary key.
    pub fn non_key_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !self.is_primary_key(c.name))
            .map(|c| c.name)
            .collect()
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.contains(&column)
    }

    /// Position of a column in source order.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    pub fn column(&self, column: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == column)
    }

    /// Resolve column names to accessor indices, preserving the given order.
    pub fn bind<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|c| {
                let name = c.as_ref();
                self.index_of(name)
                    .ok_or_else(|| Error::binding(self.table, name))
            })
            .collect()
    }

    /// Validate names and return them de-duplicated in source column order.
    pub fn canonicalize<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<&'static str>> {
        let mut positions = self.bind(columns)?;
        positions.sort_unstable();
        positions.dedup();
        Ok(positions.into_iter().map(|i| self.columns[i].name).collect())
    }
}

/// Getter/setter pair for one column of `E`.
pub struct Accessor<E> {
    /// Column name this accessor reads and writes.
    pub column: &'static str,
    /// Read the field as a [`Value`].
    pub get: fn(&E) -> Value,
    /// Write a [`Value`] into the field, converting its type.
    pub set: fn(&mut E, &Value) -> Result<()>,
    /// Whether the field currently holds its zero value.
    pub is_zero: fn(&E) -> bool,
}

impl<E> Clone for Accessor<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Accessor<E> {}

impl<E> fmt::Debug for Accessor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// A record type mapped to one table.
pub trait Entity: Sized + Send + Sync + 'static {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// Column metadata.
    fn descriptor() -> &'static EntityDescriptor;

    /// One accessor per column, in the descriptor's column order.
    fn accessors() -> &'static [Accessor<Self>];

    /// Construct an instance from a database row. Relations start empty.
    fn from_row(row: &Row) -> Result<Self>;

    /// Copy of the column fields without the relation side-structure.
    fn detached(&self) -> Self;

    /// Called before INSERT and the insert half of UPSERT.
    fn before_insert(&mut self, _now: Timestamp) {}

    /// Called before UPDATE and the update half of UPSERT.
    fn before_update(&mut self, _now: Timestamp) {}

    /// Look up the accessor for a column.
    fn accessor(column: &str) -> Result<&'static Accessor<Self>> {
        Self::descriptor()
            .index_of(column)
            .and_then(|i| Self::accessors().get(i))
            .ok_or_else(|| Error::binding(Self::TABLE_NAME, column))
    }

    /// Read a column by name.
    fn get_column(&self, column: &str) -> Result<Value> {
        Ok((Self::accessor(column)?.get)(self))
    }

    /// Write a column by name.
    fn set_column(&mut self, column: &str, value: &Value) -> Result<()> {
        (Self::accessor(column)?.set)(self, value)
    }

    /// Values of the primary-key columns in key order.
    fn primary_key_value(&self) -> Vec<Value> {
        Self::descriptor()
            .primary_key
            .iter()
            .filter_map(|c| Self::accessor(c).ok())
            .map(|a| (a.get)(self))
            .collect()
    }

    /// Defaulted columns whose field holds a non-zero value.
    fn non_zero_defaults(&self) -> Vec<&'static str> {
        Self::descriptor()
            .columns
            .iter()
            .zip(Self::accessors())
            .filter(|(c, a)| c.has_default && !(a.is_zero)(self))
            .map(|(c, _)| c.name)
            .collect()
    }

    /// Overwrite every column field present in `row`.
    fn assign_row(&mut self, row: &Row) -> Result<()> {
        for accessor in Self::accessors() {
            if let Some(value) = row.get_by_name(accessor.column) {
                (accessor.set)(self, value)?;
            }
        }
        Ok(())
    }
}
