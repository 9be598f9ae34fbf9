//! archivedb: typed Postgres access for the archive databases.
//!
//! Records derive [`Entity`] and get insert, update, upsert, find and delete
//! operations whose SQL is compiled once per input shape and cached per
//! table. Relationships between records are declared as descriptor
//! constants ([`BelongsTo`], [`HasOne`], [`HasMany`], [`ManyToMany`]) that
//! batch-load related rows for a whole slice of owners in one query.
//!
//! # Quick Start
//!
//! ```ignore
//! use archivedb::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[entity(table = "comments")]
//! struct Comment {
//!     #[entity(primary_key, default)]
//!     id: i32,
//!     comment: Option<String>,
//!     #[entity(created_at)]
//!     created_at: Timestamp,
//! }
//!
//! let db = PgExecutor::connect(&PgConfig::from_url("postgres://kmedia@localhost/kmedia")?)?;
//! let mut c = Comment { comment: Some("hello".into()), ..Comment::default() };
//! c.insert(&db, &[] as &[&str])?;   // INSERT ... RETURNING "id"
//! c.comment = None;
//! c.update(&db, &["comment"])?;
//! ```
//!
//! The derive expands to paths in `archivedb_core` and `archivedb_query`, so
//! crates deriving [`Entity`] list those two crates as dependencies next to
//! this one.
//!
//! # Crates
//!
//! - `archivedb-core`: values, rows, errors, the `Executor` trait
//! - `archivedb-query`: statement compiler, plan cache, relationship loader
//! - `archivedb-postgres`: blocking executor over the `postgres` client
//!   (feature `postgres`, on by default)
//! - `archivedb-models`: the `mdb` and `kmedia` schemas (feature `models`)
//! - feature `testing`: re-exports the scripted `MockExecutor` for downstream tests

pub use archivedb_core::{
    Accessor, ColumnDef, Dialect, Entity, EntityDescriptor, Error, Executor, FromValue, IsZero,
    MustExt, Operation, Related, RelatedMany, Result, Row, Timestamp, Value,
};
pub use archivedb_core::error;
pub use archivedb_macros::Entity;
pub use archivedb_query::{
    BelongsTo, Bridge, HasMany, HasOne, Inverse, ManyToMany, Persist, Plan, PlanKind, Signature,
    StatementCache, UpsertOptions, ops,
};

#[cfg(feature = "testing")]
pub use archivedb_query::testing;

#[cfg(feature = "postgres")]
pub use archivedb_postgres::{PgConfig, PgExecutor, SslMode};

#[cfg(feature = "models")]
pub use archivedb_models::{kmedia, mdb};

/// Everything a crate declaring records usually needs.
pub mod prelude {
    pub use crate::{
        BelongsTo, Bridge, Entity, Error, Executor, HasMany, HasOne, Inverse, ManyToMany,
        MustExt, Persist, Related, RelatedMany, Result, Timestamp, UpsertOptions, Value,
    };

    #[cfg(feature = "postgres")]
    pub use crate::{PgConfig, PgExecutor};
}

