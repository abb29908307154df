//! Master/replica handles and statement execution.
//!
//! A [`Connector`] is the connection handle pair of one backend: `master()`
//! is the single read/write handle, `replica()` a read-only one. Writes always
//! go through master; pure reads prefer a replica. When a backend has no
//! replica configured, `replica()` hands out a master handle instead.

use std::sync::MutexGuard;

use mysql::TxOpts;

use crate::backend::{mysql as mysql_backend, sqlite as sqlite_backend};
use crate::context::Context;
use crate::error::{DatastoreError, DriverError, Result};
use crate::filter::Statement;
use crate::schema::Dialect;
use crate::value::{FromRow, Row, Value};

pub trait Connector: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn master(&self) -> Result<Handle<'_>>;

    fn replica(&self) -> Result<Handle<'_>>;
}

/// Outcome of a data-modifying statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub affected: u64,
    pub last_insert_id: i64,
}

/// Runs raw SQL against a handle or an open transaction.
pub trait Executor {
    fn execute_raw(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult, DriverError>;

    fn query_raw(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError>;
}

/// A connection checked out for the duration of one operation.
pub enum Handle<'a> {
    Sqlite(MutexGuard<'a, rusqlite::Connection>),
    Mysql(mysql::PooledConn),
}

impl Handle<'_> {
    /// Opens a write transaction. Dropping the returned [`Tx`] without
    /// committing rolls it back, including during unwinding.
    pub fn begin(&mut self) -> Result<Tx<'_>, DriverError> {
        match self {
            Handle::Sqlite(conn) => {
                let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                Ok(Tx::Sqlite(tx))
            }
            Handle::Mysql(conn) => Ok(Tx::Mysql(conn.start_transaction(TxOpts::default())?)),
        }
    }
}

impl Executor for Handle<'_> {
    fn execute_raw(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult, DriverError> {
        match self {
            Handle::Sqlite(conn) => Ok(sqlite_backend::execute(conn, sql, params)?),
            Handle::Mysql(conn) => Ok(mysql_backend::execute(conn, sql, params)?),
        }
    }

    fn query_raw(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        match self {
            Handle::Sqlite(conn) => Ok(sqlite_backend::query(conn, sql, params)?),
            Handle::Mysql(conn) => Ok(mysql_backend::query(conn, sql, params)?),
        }
    }
}

pub enum Tx<'a> {
    Sqlite(rusqlite::Transaction<'a>),
    Mysql(mysql::Transaction<'a>),
}

impl Tx<'_> {
    /// A failed commit drops the transaction, and dropping rolls it back.
    pub fn commit(self) -> Result<(), DriverError> {
        match self {
            Tx::Sqlite(tx) => Ok(tx.commit()?),
            Tx::Mysql(tx) => Ok(tx.commit()?),
        }
    }

    pub fn rollback(self) -> Result<(), DriverError> {
        match self {
            Tx::Sqlite(tx) => Ok(tx.rollback()?),
            Tx::Mysql(tx) => Ok(tx.rollback()?),
        }
    }
}

impl Executor for Tx<'_> {
    fn execute_raw(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult, DriverError> {
        match self {
            Tx::Sqlite(tx) => Ok(sqlite_backend::execute(tx, sql, params)?),
            Tx::Mysql(tx) => Ok(mysql_backend::execute(tx, sql, params)?),
        }
    }

    fn query_raw(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        match self {
            Tx::Sqlite(tx) => Ok(sqlite_backend::query(tx, sql, params)?),
            Tx::Mysql(tx) => Ok(mysql_backend::query(tx, sql, params)?),
        }
    }
}

// Every statement in the stores goes through one of these, so the cancellation
// check and the error classification happen in exactly one place.

pub(crate) fn execute<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    context: &str,
    stmt: &Statement,
) -> Result<ExecResult> {
    ctx.check()?;
    ex.execute_raw(&stmt.sql, &stmt.params)
        .map_err(|e| DatastoreError::statement(context, e))
}

pub(crate) fn fetch_rows<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    context: &str,
    stmt: &Statement,
) -> Result<Vec<Row>> {
    ctx.check()?;
    ex.query_raw(&stmt.sql, &stmt.params)
        .map_err(|e| DatastoreError::statement(context, e))
}

pub(crate) fn fetch_all<T: FromRow, E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    context: &str,
    stmt: &Statement,
) -> Result<Vec<T>> {
    fetch_rows(ctx, ex, context, stmt)?
        .iter()
        .map(T::from_row)
        .collect()
}

/// First row or `None`; absence is not an error.
pub(crate) fn fetch_optional<T: FromRow, E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    context: &str,
    stmt: &Statement,
) -> Result<Option<T>> {
    fetch_rows(ctx, ex, context, stmt)?
        .first()
        .map(T::from_row)
        .transpose()
}

/// Single-column string results such as id lists.
pub(crate) fn fetch_strings<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    context: &str,
    column: &str,
    stmt: &Statement,
) -> Result<Vec<String>> {
    fetch_rows(ctx, ex, context, stmt)?
        .iter()
        .map(|row| row.text(column))
        .collect()
}

pub(crate) fn master<'c, C: Connector + ?Sized>(ctx: &Context, connector: &'c C) -> Result<Handle<'c>> {
    ctx.check()?;
    connector.master()
}

pub(crate) fn replica<'c, C: Connector + ?Sized>(ctx: &Context, connector: &'c C) -> Result<Handle<'c>> {
    ctx.check()?;
    connector.replica()
}
