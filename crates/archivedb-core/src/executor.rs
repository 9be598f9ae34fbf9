//! The database executor abstraction.
//!
//! An [`Executor`] accepts parameterized SQL plus bound values and returns
//! rows, a single optional row, or an affected-row count. Everything above it
//! only shapes SQL and bindings; transactions, pooling, timeouts and retries
//! belong to whatever implements this trait.
//!
//! Calls block the current thread until the database answers.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Blocking SQL executor.
///
/// Methods take `&self` so one executor can be shared across threads by the
/// caller; implementations serialize access internally if their underlying
/// client requires it.
pub trait Executor {
    /// Dialect used to format statements for this executor.
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        (**self).query_one(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        (**self).query_one(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }
}
