//! [`Executor`] over a blocking `postgres::Client`.

use crate::config::PgConfig;
use crate::value::{PgValue, decode_rows};
use archivedb_core::{
    ConnectionError, ConnectionErrorKind, Dialect, Error, Executor, QueryError, QueryErrorKind,
    Result, Row, Value,
};
use postgres::tls::{MakeTlsConnect, TlsConnect};
use postgres::types::ToSql;
use postgres::{Client, NoTls, Socket};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single Postgres connection usable as an [`Executor`].
///
/// The client is guarded by a mutex, so one `PgExecutor` may be shared by
/// reference across threads; statements from different threads run one at a
/// time on the connection.
pub struct PgExecutor {
    client: Mutex<Client>,
}

impl std::fmt::Debug for PgExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgExecutor")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl PgExecutor {
    /// Connect without TLS.
    pub fn connect(config: &PgConfig) -> Result<Self> {
        if config.ssl_mode.is_required() {
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!(
                    "sslmode {:?} needs a TLS connector; use PgExecutor::connect_with",
                    config.ssl_mode
                ),
                source: None,
            }));
        }
        Self::connect_with(config, NoTls)
    }

    /// Connect using the given TLS connector.
    pub fn connect_with<T>(config: &PgConfig, tls: T) -> Result<Self>
    where
        T: MakeTlsConnect<Socket> + 'static + Send,
        T::TlsConnect: Send,
        T::Stream: Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connecting to postgres"
        );
        let client = config
            .to_postgres_config()
            .connect(tls)
            .map_err(|e| connect_error(config, e))?;
        tracing::info!(host = %config.host, database = %config.database, "postgres connection established");
        Ok(Self::from_client(client))
    }

    /// Wrap an already connected client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    /// Whether the underlying connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().is_closed()
    }

    /// Run one or more statements without parameters or results.
    pub fn batch_execute(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "batch execute");
        self.lock()
            .batch_execute(sql)
            .map_err(|e| driver_error(Some(sql), e))
    }

    /// Give back the underlying client.
    pub fn into_inner(self) -> Client {
        self.client
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Client> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn bind(params: &[Value]) -> Vec<PgValue<'_>> {
    params.iter().map(PgValue).collect()
}

fn refs<'a>(params: &'a [PgValue<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl Executor for PgExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::debug!(sql, params = params.len(), "query");
        let bound = bind(params);
        let rows = self
            .lock()
            .query(sql, &refs(&bound))
            .map_err(|e| driver_error(Some(sql), e))?;
        tracing::trace!(rows = rows.len(), "query returned");
        decode_rows(&rows)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        tracing::debug!(sql, params = params.len(), "execute");
        let bound = bind(params);
        let affected = self
            .lock()
            .execute(sql, &refs(&bound))
            .map_err(|e| driver_error(Some(sql), e))?;
        tracing::trace!(affected, "execute finished");
        Ok(affected)
    }
}

fn is_auth_sqlstate(code: &str) -> bool {
    code.starts_with("28")
}

fn connect_error(config: &PgConfig, err: postgres::Error) -> Error {
    let auth = err
        .as_db_error()
        .is_some_and(|db| is_auth_sqlstate(db.code().code()));
    let kind = if auth {
        ConnectionErrorKind::Authentication
    } else {
        ConnectionErrorKind::Connect
    };
    tracing::warn!(host = %config.host, error = %err, "postgres connection failed");
    Error::Connection(ConnectionError {
        kind,
        message: format!("failed to connect to {}: {err}", config.socket_addr()),
        source: Some(Box::new(err)),
    })
}

/// Fields of a server-reported error, detached from the driver type.
struct ServerError<'a> {
    code: &'a str,
    message: &'a str,
    detail: Option<&'a str>,
    hint: Option<&'a str>,
}

fn query_error(
    sql: Option<&str>,
    server: &ServerError<'_>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    if server.code.starts_with("08") {
        return Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Disconnected,
            message: server.message.to_string(),
            source,
        });
    }
    if is_auth_sqlstate(server.code) {
        return Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Authentication,
            message: server.message.to_string(),
            source,
        });
    }
    Error::Query(QueryError {
        kind: QueryErrorKind::from_sqlstate(server.code),
        sql: sql.map(str::to_string),
        sqlstate: Some(server.code.to_string()),
        message: server.message.to_string(),
        detail: server.detail.map(str::to_string),
        hint: server.hint.map(str::to_string),
        source,
    })
}

fn driver_error(sql: Option<&str>, err: postgres::Error) -> Error {
    if let Some(db) = err.as_db_error() {
        let server = ServerError {
            code: db.code().code(),
            message: db.message(),
            detail: db.detail(),
            hint: db.hint(),
        };
        // Copy the borrowed fields out before moving `err` into the source.
        let mapped = query_error(sql, &server, None);
        return attach_source(mapped, err);
    }
    if err.is_closed() {
        return Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Disconnected,
            message: err.to_string(),
            source: Some(Box::new(err)),
        });
    }
    Error::Query(QueryError {
        kind: QueryErrorKind::Database,
        sql: sql.map(str::to_string),
        sqlstate: None,
        message: err.to_string(),
        detail: None,
        hint: None,
        source: Some(Box::new(err)),
    })
}

fn attach_source(mut mapped: Error, err: postgres::Error) -> Error {
    match &mut mapped {
        Error::Query(q) => q.source = Some(Box::new(err)),
        Error::Connection(c) => c.source = Some(Box::new(err)),
        _ => {}
    }
    mapped
}
