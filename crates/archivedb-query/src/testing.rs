//! A scripted in-memory executor for tests.
//!
//! [`MockExecutor`] records every statement it receives and answers from
//! queues filled by the test: rows for `query`/`query_one`, affected counts
//! for `execute`, and one-shot failures for either. Clones share state, so a
//! test can hand one clone to the code under test and inspect the other.

use archivedb_core::{Dialect, Error, Executor, QueryError, QueryErrorKind, Result, Row, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One statement as the executor saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
struct MockState {
    statements: Vec<Statement>,
    rows: VecDeque<Vec<Row>>,
    counts: VecDeque<u64>,
    failures: VecDeque<Error>,
}

#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<MockState>>,
    dialect: Dialect,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the result set for the next query. Unqueued queries return no rows.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().rows.push_back(rows);
        self
    }

    /// Queue a single-row result.
    pub fn push_row(&self, row: Row) -> &Self {
        self.push_rows(vec![row])
    }

    /// Queue the affected count for the next execute. Unqueued executes report 1.
    pub fn push_count(&self, count: u64) -> &Self {
        self.state().counts.push_back(count);
        self
    }

    /// Make the next call of any kind fail with `error`.
    pub fn fail_next(&self, error: Error) -> &Self {
        self.state().failures.push_back(error);
        self
    }

    /// Every statement received so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.state().statements.clone()
    }

    /// Just the SQL text of every statement.
    pub fn sql(&self) -> Vec<String> {
        self.state().statements.iter().map(|s| s.sql.clone()).collect()
    }

    pub fn last(&self) -> Option<Statement> {
        self.state().statements.last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.state().statements.len()
    }

    /// Forget recorded statements; queued replies are kept.
    pub fn clear(&self) {
        self.state().statements.clear();
    }

    fn record(&self, sql: &str, params: &[Value]) -> Option<Error> {
        let mut state = self.state();
        state.statements.push(Statement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        state.failures.pop_front()
    }
}

impl Executor for MockExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        if let Some(err) = self.record(sql, params) {
            return Err(err);
        }
        Ok(self.state().rows.pop_front().unwrap_or_default())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        if let Some(err) = self.record(sql, params) {
            return Err(err);
        }
        Ok(self.state().counts.pop_front().unwrap_or(1))
    }
}

/// Build a row from column names and values.
pub fn row<const N: usize>(columns: [&str; N], values: [Value; N]) -> Row {
    Row::new(
        columns.iter().map(|c| (*c).to_string()).collect(),
        values.into(),
    )
}

/// A database error carrying `sqlstate`, as a driver would report it.
pub fn db_error(sqlstate: &str, message: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::from_sqlstate(sqlstate),
        sql: None,
        sqlstate: Some(sqlstate.to_string()),
        message: message.to_string(),
        detail: None,
        hint: None,
        source: None,
    })
}
