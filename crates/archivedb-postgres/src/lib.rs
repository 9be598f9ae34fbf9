//! Blocking PostgreSQL executor for archivedb.
//!
//! `archivedb-postgres` connects the statement compiler and relationship
//! loader to a real server through the `postgres` crate.
//!
//! # Role In The Architecture
//!
//! - Implements `archivedb_core::Executor` for a single connection
//! - Converts [`Value`](archivedb_core::Value) parameters to the types the
//!   server inferred, and result columns back to values
//! - Maps server errors to `archivedb_core::Error`, keeping SQLSTATE, detail
//!   and hint
//!
//! # Example
//!
//! ```rust,ignore
//! use archivedb_postgres::{PgConfig, PgExecutor};
//!
//! let config = PgConfig::from_url("postgres://archive@localhost/mdb")?;
//! let db = PgExecutor::connect(&config)?;
//! let tags = Tag::all(&db)?;
//! ```

pub mod config;
pub mod executor;
pub mod value;

pub use config::{PgConfig, SslMode};
pub use executor::PgExecutor;
pub use value::PgValue;
