//! Record types for the archive databases.
//!
//! One module per table, grouped by schema:
//!
//! - [`mdb`]: the metadata database (`tags`, `tag_i18n`, `content_units`)
//! - [`kmedia`]: the legacy media catalogue (`comments`, `roles`, `users`,
//!   `roles_users`)
//!
//! Every record derives [`Entity`](archivedb_core::Entity), which also gives it
//! [`Persist`](archivedb_query::Persist) with a statement cache of its own.
//! Relationships are exposed as descriptor constants next to the record, for
//! example [`mdb::tags::PARENT`], and as typed methods on the record.
//!
//! ```rust,ignore
//! use archivedb_models::mdb::{Tag, tags};
//!
//! let mut roots = Tag::all(&db)?;
//! tags::PARENT_TAGS.load(&db, &mut roots)?;
//! ```

pub mod kmedia;
pub mod mdb;
