use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql, params_from_iter};
use tracing::info;

use crate::config::SqliteConfig;
use crate::connection::{Connector, ExecResult, Handle};
use crate::error::{DatastoreError, Result};
use crate::schema::Dialect;
use crate::value::{Row, Value};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_value_ref(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(b) | ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

pub fn execute(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<ExecResult> {
    let affected = conn.execute(sql, params_from_iter(params.iter()))?;
    Ok(ExecResult {
        affected: affected as u64,
        last_insert_id: conn.last_insert_rowid(),
    })
}

pub fn query(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(from_value_ref(row.get_ref(idx)?));
        }
        out.push(Row::new(columns.clone(), values));
    }
    Ok(out)
}

/// Embedded backend: one writer connection as master and a small set of
/// read-only connections on the same file as replicas.
pub struct SqliteConnector {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl SqliteConnector {
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let path = config.path.as_path();
        let writer = open_writer(path)?;

        // Every connection to ":memory:" is its own database.
        let reader_count = if path == Path::new(":memory:") {
            0
        } else {
            config.readers
        };

        let mut readers = Vec::with_capacity(reader_count);
        for _ in 0..reader_count {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .and_then(|conn| conn.busy_timeout(BUSY_TIMEOUT).map(|_| conn))
            .map_err(|e| {
                DatastoreError::connection(
                    format!("An error occurred while opening sqlite replica {}", path.display()),
                    e,
                )
            })?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "SQLite datastore opened at {} (1 writer + {} readers)",
            path.display(),
            readers.len()
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }
}

fn open_writer(path: &Path) -> Result<Connection> {
    let open = || -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    };
    open().map_err(|e| {
        DatastoreError::connection(
            format!("An error occurred while opening sqlite master {}", path.display()),
            e,
        )
    })
}

impl Connector for SqliteConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn master(&self) -> Result<Handle<'_>> {
        // A panic mid-statement leaves the connection usable; the open
        // transaction, if any, was rolled back when it dropped.
        let conn = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Handle::Sqlite(conn))
    }

    fn replica(&self) -> Result<Handle<'_>> {
        if self.readers.is_empty() {
            return self.master();
        }
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx].lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Handle::Sqlite(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Executor;

    #[test]
    fn test_values_round_trip_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        execute(&conn, "CREATE TABLE t (a INTEGER, b TEXT, c REAL)", &[]).unwrap();
        let res = execute(
            &conn,
            "INSERT INTO t (a, b, c) VALUES (?, ?, ?)",
            &[Value::Integer(7), Value::Text("x".into()), Value::Null],
        )
        .unwrap();
        assert_eq!(res.affected, 1);
        assert_eq!(res.last_insert_id, 1);

        let rows = query(&conn, "SELECT a, b, c FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].int("a").unwrap(), 7);
        assert_eq!(rows[0].text("b").unwrap(), "x");
        assert!(matches!(rows[0].get("c").unwrap(), Value::Null));
    }

    #[test]
    fn test_replica_sees_committed_writes() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SqliteConnector::open(&SqliteConfig {
            path: dir.path().join("t.db"),
            readers: 2,
        })
        .unwrap();

        {
            let mut master = connector.master().unwrap();
            master.execute_raw("CREATE TABLE t (a INTEGER)", &[]).unwrap();
            master
                .execute_raw("INSERT INTO t (a) VALUES (?)", &[Value::Integer(1)])
                .unwrap();
        }

        for _ in 0..3 {
            let mut replica = connector.replica().unwrap();
            let rows = replica.query_raw("SELECT a FROM t", &[]).unwrap();
            assert_eq!(rows.len(), 1);
        }
    }

    #[test]
    fn test_replica_cannot_write() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SqliteConnector::open(&SqliteConfig {
            path: dir.path().join("t.db"),
            readers: 1,
        })
        .unwrap();
        connector
            .master()
            .unwrap()
            .execute_raw("CREATE TABLE t (a INTEGER)", &[])
            .unwrap();

        let mut replica = connector.replica().unwrap();
        assert!(replica
            .execute_raw("INSERT INTO t (a) VALUES (1)", &[])
            .is_err());
    }

    #[test]
    fn test_in_memory_replica_falls_back_to_master() {
        let connector = SqliteConnector::open(&SqliteConfig::new(":memory:")).unwrap();
        connector
            .master()
            .unwrap()
            .execute_raw("CREATE TABLE t (a INTEGER)", &[])
            .unwrap();
        let rows = connector
            .replica()
            .unwrap()
            .query_raw("SELECT a FROM t", &[])
            .unwrap();
        assert!(rows.is_empty());
    }
}
