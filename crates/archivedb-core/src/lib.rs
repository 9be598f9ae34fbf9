//! Core types and traits for archivedb.
//!
//! This crate provides the foundations the statement compiler and the
//! relationship loader build on:
//!
//! - `Entity` trait with static column metadata and per-column accessors
//! - `Value` / `Row` for bound parameters and decoded results
//! - `Executor` trait for blocking SQL execution
//! - `Related` / `RelatedMany` relationship slots

pub mod dialect;
pub mod entity;
pub mod error;
pub mod executor;
pub mod relation;
pub mod row;
pub mod types;
pub mod value;

pub use dialect::{Dialect, quote_ident};
pub use entity::{Accessor, ColumnDef, Entity, EntityDescriptor};
pub use error::{
    BindingError, ConfigError, ConnectionError, ConnectionErrorKind, EmptyUpdateError, Error,
    ExecutionError, MustExt, Operation, QueryError, QueryErrorKind, RelationshipError, Result,
    TypeError,
};
pub use executor::Executor;
pub use relation::{Related, RelatedMany};
pub use row::{ColumnInfo, FromValue, Row};
pub use types::{IsZero, Stamp, Timestamp};
pub use value::Value;
