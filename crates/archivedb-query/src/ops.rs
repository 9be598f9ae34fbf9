//! Entity-level operations.
//!
//! Every function takes the executor explicitly and returns a [`Result`].
//! Executor failures are wrapped with the table name and [`Operation`];
//! binding and empty-update errors are returned as-is because they are
//! detected before anything reaches the database.

use crate::compile::{UpsertShape, insert_plan, update_plan, upsert_plan};
use crate::persist::{Persist, UpsertOptions};
use archivedb_core::{
    Accessor, Entity, Error, Executor, Operation, Result, Row, Timestamp, TypeError, Value,
};
use std::collections::BTreeMap;

/// Log one statement before it is handed to the executor.
pub(crate) fn log_statement(table: &str, sql: &str, params: &[Value]) {
    tracing::debug!(table = %table, sql = %sql, params = ?params, "executing statement");
}

/// Read the parameters a plan binds, in placeholder order.
pub(crate) fn bind_values<E: Entity>(entity: &E, indices: &[usize]) -> Vec<Value> {
    let accessors = E::accessors();
    indices.iter().map(|&i| (accessors[i].get)(entity)).collect()
}

/// Write `RETURNING` values back by position.
fn write_returning<E: Entity>(entity: &mut E, indices: &[usize], row: &Row) -> Result<()> {
    let accessors: &[Accessor<E>] = E::accessors();
    for (pos, &idx) in indices.iter().enumerate() {
        let accessor = &accessors[idx];
        let value = row.get(pos).ok_or_else(|| {
            Error::Type(TypeError {
                expected: "returned column",
                actual: format!("row has {} columns", row.len()),
                column: Some(accessor.column.to_string()),
            })
        })?;
        (accessor.set)(entity, value)?;
    }
    Ok(())
}

fn wrap<E: Entity>(operation: Operation) -> impl FnOnce(Error) -> Error {
    move |err| Error::execution(E::TABLE_NAME, operation, err)
}

fn check_key<E: Entity>(key: &[Value]) -> Result<()> {
    let expected = E::descriptor().primary_key.len();
    if key.len() == expected {
        Ok(())
    } else {
        Err(Error::Custom(format!(
            "{} has a {}-column primary key, got {} values",
            E::TABLE_NAME,
            expected,
            key.len()
        )))
    }
}

fn require_key<E: Entity>(entity: &E, operation: Operation) -> Result<Vec<Value>> {
    let key = entity.primary_key_value();
    if key.iter().any(Value::is_null) {
        return Err(Error::Custom(format!(
            "unable to {} {}: primary key is null",
            operation,
            E::TABLE_NAME
        )));
    }
    Ok(key)
}

fn select_by_key_sql<E: Entity, X: Executor + ?Sized>(exec: &X, projection: &str) -> String {
    let dialect = exec.dialect();
    format!(
        "SELECT {} FROM {} WHERE {}",
        projection,
        dialect.quote_identifier(E::TABLE_NAME),
        dialect.where_equals(E::descriptor().primary_key, 1)
    )
}

/// Fetch one row by primary key.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn find<E: Entity, X: Executor + ?Sized>(exec: &X, key: &[Value]) -> Result<Option<E>> {
    check_key::<E>(key)?;
    let sql = select_by_key_sql::<E, X>(exec, "*");
    log_statement(E::TABLE_NAME, &sql, key);
    exec.query_one(&sql, key)
        .map_err(wrap::<E>(Operation::Select))?
        .map(|row| E::from_row(&row))
        .transpose()
}

/// Fetch selected columns of one row; unselected fields keep their defaults.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn find_columns<E, X, S>(exec: &X, key: &[Value], columns: &[S]) -> Result<Option<E>>
where
    E: Entity + Default,
    X: Executor + ?Sized,
    S: AsRef<str>,
{
    check_key::<E>(key)?;
    let columns = E::descriptor().canonicalize(columns)?;
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        exec.dialect().quote_list(&columns)
    };
    let sql = select_by_key_sql::<E, X>(exec, &projection);
    log_statement(E::TABLE_NAME, &sql, key);
    let Some(row) = exec
        .query_one(&sql, key)
        .map_err(wrap::<E>(Operation::Select))?
    else {
        return Ok(None);
    };
    let mut entity = E::default();
    entity.assign_row(&row)?;
    Ok(Some(entity))
}

/// Every row of the table.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn all<E: Entity, X: Executor + ?Sized>(exec: &X) -> Result<Vec<E>> {
    let sql = format!(
        "SELECT * FROM {}",
        exec.dialect().quote_identifier(E::TABLE_NAME)
    );
    log_statement(E::TABLE_NAME, &sql, &[]);
    exec.query(&sql, &[])
        .map_err(wrap::<E>(Operation::Select))?
        .iter()
        .map(E::from_row)
        .collect()
}

#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn count<E: Entity, X: Executor + ?Sized>(exec: &X) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {}",
        exec.dialect().quote_identifier(E::TABLE_NAME)
    );
    log_statement(E::TABLE_NAME, &sql, &[]);
    let row = exec
        .query_one(&sql, &[])
        .map_err(wrap::<E>(Operation::Select))?
        .ok_or(Error::NotFound {
            table: E::TABLE_NAME,
        })?;
    let n: i64 = row.get_as(0)?;
    Ok(u64::try_from(n).unwrap_or(0))
}

#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn exists<E: Entity, X: Executor + ?Sized>(exec: &X, key: &[Value]) -> Result<bool> {
    check_key::<E>(key)?;
    let dialect = exec.dialect();
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} LIMIT 1)",
        dialect.quote_identifier(E::TABLE_NAME),
        dialect.where_equals(E::descriptor().primary_key, 1)
    );
    log_statement(E::TABLE_NAME, &sql, key);
    match exec
        .query_one(&sql, key)
        .map_err(wrap::<E>(Operation::Select))?
    {
        Some(row) => row.get_as(0),
        None => Ok(false),
    }
}

/// Insert `entity`, writing database-generated values back into it.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn insert<E, X, S>(exec: &X, entity: &mut E, whitelist: &[S]) -> Result<()>
where
    E: Persist,
    X: Executor + ?Sized,
    S: AsRef<str>,
{
    entity.before_insert(Timestamp::now());

    let non_zero = entity.non_zero_defaults();
    let plan = insert_plan(
        E::statement_cache(),
        E::descriptor(),
        exec.dialect(),
        whitelist,
        &non_zero,
    )?;
    let params = bind_values(entity, &plan.values);
    log_statement(E::TABLE_NAME, &plan.sql, &params);

    if plan.expects_returning() {
        let row = exec
            .query_one(&plan.sql, &params)
            .map_err(wrap::<E>(Operation::Insert))?
            .ok_or_else(|| {
                Error::execution(
                    E::TABLE_NAME,
                    Operation::Insert,
                    Error::NotFound {
                        table: E::TABLE_NAME,
                    },
                )
            })?;
        write_returning(entity, &plan.returning, &row)?;
    } else {
        exec.execute(&plan.sql, &params)
            .map_err(wrap::<E>(Operation::Insert))?;
    }
    Ok(())
}

/// Update `entity` by primary key; returns the affected row count.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn update<E, X, S>(exec: &X, entity: &mut E, whitelist: &[S]) -> Result<u64>
where
    E: Persist,
    X: Executor + ?Sized,
    S: AsRef<str>,
{
    entity.before_update(Timestamp::now());

    let plan = update_plan(
        E::statement_cache(),
        E::descriptor(),
        exec.dialect(),
        whitelist,
    )?;
    let params = bind_values(entity, &plan.values);
    log_statement(E::TABLE_NAME, &plan.sql, &params);
    exec.execute(&plan.sql, &params)
        .map_err(wrap::<E>(Operation::Update))
}

/// Insert, or on conflict update / do nothing.
///
/// A `RETURNING` upsert that yields no row took the DO NOTHING path and is
/// still a success; the entity is left as it was.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn upsert<E, X>(exec: &X, entity: &mut E, options: &UpsertOptions) -> Result<()>
where
    E: Persist,
    X: Executor + ?Sized,
{
    let now = Timestamp::now();
    entity.before_insert(now);
    entity.before_update(now);

    let descriptor = E::descriptor();
    let shape = UpsertShape {
        update_on_conflict: options.update_on_conflict,
        conflict: descriptor.canonicalize(&options.conflict_columns)?,
        update: descriptor.canonicalize(&options.update_columns)?,
        whitelist: descriptor.canonicalize(&options.whitelist)?,
        non_zero_defaults: entity.non_zero_defaults(),
    };
    let plan = upsert_plan(E::statement_cache(), descriptor, exec.dialect(), &shape)?;
    let params = bind_values(entity, &plan.values);
    log_statement(E::TABLE_NAME, &plan.sql, &params);

    if plan.expects_returning() {
        if let Some(row) = exec
            .query_one(&plan.sql, &params)
            .map_err(wrap::<E>(Operation::Upsert))?
        {
            write_returning(entity, &plan.returning, &row)?;
        }
    } else {
        exec.execute(&plan.sql, &params)
            .map_err(wrap::<E>(Operation::Upsert))?;
    }
    Ok(())
}

/// Delete `entity` by primary key; returns the affected row count.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn delete<E: Entity, X: Executor + ?Sized>(exec: &X, entity: &E) -> Result<u64> {
    let key = require_key(entity, Operation::Delete)?;
    let dialect = exec.dialect();
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        dialect.quote_identifier(E::TABLE_NAME),
        dialect.where_equals(E::descriptor().primary_key, 1)
    );
    log_statement(E::TABLE_NAME, &sql, &key);
    exec.execute(&sql, &key)
        .map_err(wrap::<E>(Operation::Delete))
}

/// Re-read column fields from the database, keeping loaded relations.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME))]
pub fn reload<E: Entity, X: Executor + ?Sized>(exec: &X, entity: &mut E) -> Result<()> {
    let key = require_key(entity, Operation::Select)?;
    let sql = select_by_key_sql::<E, X>(exec, "*");
    log_statement(E::TABLE_NAME, &sql, &key);
    let row = exec
        .query_one(&sql, &key)
        .map_err(wrap::<E>(Operation::Select))?
        .ok_or_else(|| {
            Error::execution(
                E::TABLE_NAME,
                Operation::Select,
                Error::NotFound {
                    table: E::TABLE_NAME,
                },
            )
        })?;
    entity.assign_row(&row)
}

/// Flatten the primary keys of `entities` into one parameter list.
fn key_params<E: Entity>(entities: &[E], operation: Operation) -> Result<Vec<Value>> {
    let mut params = Vec::with_capacity(entities.len() * E::descriptor().primary_key.len());
    for entity in entities {
        params.extend(require_key(entity, operation)?);
    }
    Ok(params)
}

/// Delete every entity in one statement. An empty slice issues nothing.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME, rows = entities.len()))]
pub fn delete_all<E: Entity, X: Executor + ?Sized>(exec: &X, entities: &[E]) -> Result<u64> {
    if entities.is_empty() {
        return Ok(0);
    }
    let params = key_params(entities, Operation::Delete)?;
    let dialect = exec.dialect();
    let sql = format!(
        "DELETE FROM {} WHERE {}",
        dialect.quote_identifier(E::TABLE_NAME),
        dialect.where_in(E::descriptor().primary_key, entities.len(), 1)
    );
    log_statement(E::TABLE_NAME, &sql, &params);
    exec.execute(&sql, &params)
        .map_err(wrap::<E>(Operation::Delete))
}

/// Set the same column values on every entity's row in one statement.
///
/// Only the database is changed; the in-memory entities are not touched.
/// Columns are written in table order; a repeated name keeps its last value
/// and primary-key columns are ignored.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME, rows = entities.len()))]
pub fn update_all<E: Entity, X: Executor + ?Sized>(
    exec: &X,
    entities: &[E],
    columns: &[(&str, Value)],
) -> Result<u64> {
    if columns.is_empty() {
        return Err(Error::empty_update(E::TABLE_NAME, Operation::Update));
    }
    if entities.is_empty() {
        return Ok(0);
    }

    let descriptor = E::descriptor();
    let names: Vec<&str> = columns.iter().map(|(c, _)| *c).collect();
    let positions = descriptor.bind(&names)?;

    // Source column order, later duplicates overriding earlier ones, keys skipped.
    let mut assigned: BTreeMap<usize, &Value> = BTreeMap::new();
    for (pos, (_, value)) in positions.into_iter().zip(columns) {
        if !descriptor.columns[pos].primary_key {
            assigned.insert(pos, value);
        }
    }
    if assigned.is_empty() {
        return Err(Error::empty_update(E::TABLE_NAME, Operation::Update));
    }
    let names: Vec<&str> = assigned.keys().map(|&pos| descriptor.columns[pos].name).collect();

    let dialect = exec.dialect();
    let assignments = names
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}={}", dialect.quote_identifier(c), dialect.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        dialect.quote_identifier(E::TABLE_NAME),
        assignments,
        dialect.where_in(descriptor.primary_key, entities.len(), names.len() + 1)
    );

    let mut params: Vec<Value> = assigned.into_values().cloned().collect();
    params.extend(key_params(entities, Operation::Update)?);
    log_statement(E::TABLE_NAME, &sql, &params);
    exec.execute(&sql, &params)
        .map_err(wrap::<E>(Operation::Update))
}

/// Re-read every entity in one query. Fails with `NotFound` if any row is gone.
#[tracing::instrument(level = "debug", skip_all, fields(table = E::TABLE_NAME, rows = entities.len()))]
pub fn reload_all<E: Entity, X: Executor + ?Sized>(exec: &X, entities: &mut [E]) -> Result<()> {
    if entities.is_empty() {
        return Ok(());
    }
    let params = key_params(entities, Operation::Select)?;
    let descriptor = E::descriptor();
    let dialect = exec.dialect();
    let sql = format!(
        "SELECT * FROM {} WHERE {}",
        dialect.quote_identifier(E::TABLE_NAME),
        dialect.where_in(descriptor.primary_key, entities.len(), 1)
    );
    log_statement(E::TABLE_NAME, &sql, &params);
    let rows = exec
        .query(&sql, &params)
        .map_err(wrap::<E>(Operation::Select))?;

    // Match every entity first so nothing is overwritten on failure.
    let mut matches = Vec::with_capacity(entities.len());
    for entity in entities.iter() {
        let key = entity.primary_key_value();
        let row = rows
            .iter()
            .find(|row| row_has_key(row, descriptor.primary_key, &key))
            .ok_or_else(|| {
                Error::execution(
                    E::TABLE_NAME,
                    Operation::Select,
                    Error::NotFound {
                        table: E::TABLE_NAME,
                    },
                )
            })?;
        matches.push(row);
    }
    for (entity, row) in entities.iter_mut().zip(matches) {
        entity.assign_row(row)?;
    }
    Ok(())
}

pub(crate) fn row_has_key(row: &Row, columns: &[&str], key: &[Value]) -> bool {
    columns
        .iter()
        .zip(key)
        .all(|(c, k)| row.get_by_name(c).is_some_and(|v| v.key_eq(k)))
}
