//! Statement compiler, plan cache and relationship loader for archivedb.
//!
//! `archivedb-query` is the **execution layer** between generated entities and
//! an [`Executor`](archivedb_core::Executor).
//!
//! # Role In The Architecture
//!
//! - **Statement compiler**: turns entity metadata plus caller inputs (whitelist,
//!   non-zero defaults, conflict settings) into parameterized INSERT, UPDATE and
//!   upsert statements.
//! - **Plan cache**: compiled plans are memoized per entity type under a
//!   canonical [`Signature`], so repeated operations skip compilation.
//! - **Operations**: find, insert, update, upsert, delete, reload and their
//!   bulk forms, exposed on every entity through [`Persist`].
//! - **Relationships**: typed [`BelongsTo`], [`HasOne`], [`HasMany`] and
//!   [`ManyToMany`] descriptors that batch-load related rows and keep both
//!   sides in sync on mutation.
//!
//! Most users reach these through the `archivedb` facade crate.

pub mod cache;
pub mod compile;
pub mod ops;
pub mod persist;
pub mod relation;
pub mod signature;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{Plan, StatementCache};
pub use persist::{Persist, UpsertOptions};
pub use relation::{BelongsTo, Bridge, HasMany, HasOne, Inverse, ManyToMany};
pub use signature::{PlanKind, Signature};
