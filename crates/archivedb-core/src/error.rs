//! Error types for archivedb operations.

use std::fmt;

/// The primary error type for all archivedb operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (connect, disconnect, lost connection)
    Connection(ConnectionError),
    /// Query execution errors reported by the database
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// A column name that does not map to any field of the entity
    Binding(BindingError),
    /// An update or upsert whose column set resolved to nothing
    EmptyUpdate(EmptyUpdateError),
    /// Invalid use of a relationship mutation
    Relationship(RelationshipError),
    /// An executor failure wrapped with the table and operation that caused it
    Execution(ExecutionError),
    /// A lookup by primary key matched no row
    NotFound {
        /// Table that was searched
        table: &'static str,
    },
    /// Configuration errors
    Config(ConfigError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Authentication failed
    Authentication,
    /// Connection lost during operation
    Disconnected,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Deadlock detected
    Deadlock,
    /// Serialization failure
    Serialization,
    /// Other database error
    Database,
}

impl QueryErrorKind {
    /// Classify a SQLSTATE code.
    pub fn from_sqlstate(code: &str) -> Self {
        match code {
            "40P01" => QueryErrorKind::Deadlock,
            "40001" => QueryErrorKind::Serialization,
            "42501" => QueryErrorKind::Permission,
            "42P01" | "42703" => QueryErrorKind::NotFound,
            c if c.starts_with("23") => QueryErrorKind::Constraint,
            c if c.starts_with("42") => QueryErrorKind::Syntax,
            _ => QueryErrorKind::Database,
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingError {
    pub table: &'static str,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyUpdateError {
    pub table: &'static str,
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipError {
    pub relationship: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ExecutionError {
    pub table: &'static str,
    pub operation: Operation,
    pub source: Box<Error>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// The kind of entity operation an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Upsert,
    Delete,
    Select,
    Load,
    Relate,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
            Operation::Select => "select",
            Operation::Load => "load",
            Operation::Relate => "relate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Wrap an executor error with the table and operation it came from.
    pub fn execution(table: &'static str, operation: Operation, source: Error) -> Self {
        Error::Execution(ExecutionError {
            table,
            operation,
            source: Box::new(source),
        })
    }

    pub fn binding(table: &'static str, column: impl Into<String>) -> Self {
        Error::Binding(BindingError {
            table,
            column: column.into(),
        })
    }

    pub fn empty_update(table: &'static str, operation: Operation) -> Self {
        Error::EmptyUpdate(EmptyUpdateError { table, operation })
    }

    pub fn relationship(relationship: &'static str, message: impl Into<String>) -> Self {
        Error::Relationship(RelationshipError {
            relationship,
            message: message.into(),
        })
    }

    /// The innermost error, looking through execution context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Execution(e) => e.source.root(),
            other => other,
        }
    }

    /// Is this the "nothing to update" input-shape condition?
    pub fn is_empty_update(&self) -> bool {
        matches!(self.root(), Error::EmptyUpdate(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound { .. })
    }

    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        matches!(self.root(), Error::Connection(_))
    }

    /// Get SQLSTATE if available (e.g., "23505" for unique violation)
    pub fn sqlstate(&self) -> Option<&str> {
        match self.root() {
            Error::Query(q) => q.sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self.root() {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl QueryError {
    /// Is this a unique constraint violation?
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate.as_deref() == Some("23505")
    }

    /// Is this a foreign key violation?
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate.as_deref() == Some("23503")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Binding(e) => write!(f, "{}", e),
            Error::EmptyUpdate(e) => write!(f, "{}", e),
            Error::Relationship(e) => write!(f, "{}", e),
            Error::Execution(e) => write!(f, "{}", e),
            Error::NotFound { table } => write!(f, "no matching row in {}", table),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Execution(e) => Some(e.source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column '{}' does not map to a field of {}",
            self.column, self.table
        )
    }
}

impl fmt::Display for EmptyUpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unable to {} {}: could not build a set of columns to update",
            self.operation, self.table
        )
    }
}

impl fmt::Display for RelationshipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relationship {}: {}", self.relationship, self.message)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unable to {} {}: {}",
            self.operation, self.table, self.source
        )
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for archivedb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Opt-in panic helper for scripts and tests.
///
/// Every operation returns [`Result`]; call `.must()` at the call site to
/// trade the error for a panic.
pub trait MustExt<T> {
    #[track_caller]
    fn must(self) -> T;
}

impl<T> MustExt<T> for Result<T> {
    #[track_caller]
    fn must(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = %err, "must() called on a failed operation");
                panic!("archivedb: {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_violation() -> Error {
        Error::Query(QueryError {
            kind: QueryErrorKind::Constraint,
            sql: Some("INSERT INTO \"tags\" DEFAULT VALUES".to_string()),
            sqlstate: Some("23505".to_string()),
            message: "duplicate key value".to_string(),
            detail: None,
            hint: None,
            source: None,
        })
    }

    #[test]
    fn sqlstate_helpers_look_through_context() {
        let err = Error::execution("tags", Operation::Insert, unique_violation());
        assert_eq!(err.sqlstate(), Some("23505"));
        assert_eq!(err.sql(), Some("INSERT INTO \"tags\" DEFAULT VALUES"));
        if let Error::Query(q) = err.root() {
            assert!(q.is_unique_violation());
            assert!(!q.is_foreign_key_violation());
        } else {
            panic!("expected query error at the root");
        }
    }

    #[test]
    fn execution_display_names_table_and_operation() {
        let err = Error::execution("comments", Operation::Update, unique_violation());
        let msg = err.to_string();
        assert!(msg.starts_with("unable to update comments: "), "{msg}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn empty_update_flag() {
        let err = Error::empty_update("comments", Operation::Update);
        assert!(err.is_empty_update());
        assert_eq!(
            err.to_string(),
            "unable to update comments: could not build a set of columns to update"
        );
        assert!(!unique_violation().is_empty_update());
    }

    #[test]
    fn binding_error_message() {
        let err = Error::binding("tags", "colour");
        assert_eq!(err.to_string(), "column 'colour' does not map to a field of tags");
    }

    #[test]
    fn sqlstate_classification() {
        assert_eq!(QueryErrorKind::from_sqlstate("23505"), QueryErrorKind::Constraint);
        assert_eq!(QueryErrorKind::from_sqlstate("40P01"), QueryErrorKind::Deadlock);
        assert_eq!(QueryErrorKind::from_sqlstate("42601"), QueryErrorKind::Syntax);
        assert_eq!(QueryErrorKind::from_sqlstate("XX000"), QueryErrorKind::Database);
    }

    #[test]
    fn must_returns_value() {
        let ok: Result<i32> = Ok(3);
        assert_eq!(ok.must(), 3);
    }

    #[test]
    #[should_panic(expected = "no matching row in tags")]
    fn must_panics_with_message() {
        let err: Result<i32> = Err(Error::NotFound { table: "tags" });
        err.must();
    }
}
