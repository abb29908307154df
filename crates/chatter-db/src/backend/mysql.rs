use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Params, Pool};
use tracing::info;

use crate::config::{CloudSqlConfig, MysqlConfig};
use crate::connection::{Connector, ExecResult, Handle};
use crate::error::{DatastoreError, Result};
use crate::schema::Dialect;
use crate::value::{Row, Value};

fn to_params(params: &[Value]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(
        params
            .iter()
            .map(|v| match v {
                Value::Null => mysql::Value::NULL,
                Value::Integer(i) => mysql::Value::Int(*i),
                Value::Real(f) => mysql::Value::Double(*f),
                Value::Text(s) => mysql::Value::Bytes(s.as_bytes().to_vec()),
            })
            .collect(),
    )
}

fn from_mysql(v: mysql::Value) -> Value {
    match v {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Int(i) => Value::Integer(i),
        mysql::Value::UInt(u) => Value::Integer(u as i64),
        mysql::Value::Float(f) => Value::Real(f as f64),
        mysql::Value::Double(f) => Value::Real(f),
        mysql::Value::Bytes(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
        other => Value::Text(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

pub fn execute<Q: Queryable>(q: &mut Q, sql: &str, params: &[Value]) -> Result<ExecResult, mysql::Error> {
    let result = q.exec_iter(sql, to_params(params))?;
    Ok(ExecResult {
        affected: result.affected_rows(),
        last_insert_id: result.last_insert_id().unwrap_or(0) as i64,
    })
}

pub fn query<Q: Queryable>(q: &mut Q, sql: &str, params: &[Value]) -> Result<Vec<Row>, mysql::Error> {
    let rows: Vec<mysql::Row> = q.exec(sql, to_params(params))?;

    let mut columns: Option<Arc<[String]>> = None;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let cols = columns
            .get_or_insert_with(|| {
                row.columns_ref()
                    .iter()
                    .map(|c| c.name_str().into_owned())
                    .collect()
            })
            .clone();
        let values = row.unwrap().into_iter().map(from_mysql).collect();
        out.push(Row::new(cols, values));
    }
    Ok(out)
}

/// Networked backend: a master pool and zero or more replica pools.
pub struct MysqlConnector {
    master: Pool,
    replicas: Vec<Pool>,
    replica_idx: AtomicUsize,
}

impl MysqlConnector {
    pub fn connect(config: &MysqlConfig) -> Result<Self> {
        let master = Pool::new(config.master_url.as_str())
            .map_err(|e| DatastoreError::connection("An error occurred while connecting to mysql master", e))?;

        let replicas = config
            .replica_urls
            .iter()
            .map(|url| {
                Pool::new(url.as_str()).map_err(|e| {
                    DatastoreError::connection("An error occurred while connecting to mysql replica", e)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("MySQL datastore connected (1 master + {} replicas)", replicas.len());
        Ok(Self::from_pools(master, replicas))
    }

    /// Connects through the Cloud SQL proxy: `<socket_dir>/<instance>` per pool.
    pub fn connect_cloud_sql(config: &CloudSqlConfig) -> Result<Self> {
        let pool = |instance: &str| -> Result<Pool> {
            let socket = config.socket_path(instance);
            let opts = OptsBuilder::new()
                .user(Some(config.user.as_str()))
                .pass(Some(config.password.as_str()))
                .db_name(Some(config.database.as_str()))
                .socket(Some(socket.to_string_lossy().into_owned()));
            Pool::new(opts).map_err(|e| {
                DatastoreError::connection(
                    format!("An error occurred while connecting to cloud sql instance {}", instance),
                    e,
                )
            })
        };

        let master = pool(&config.instance)?;
        let replicas = config
            .replica_instances
            .iter()
            .map(|instance| pool(instance))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Cloud SQL datastore connected to {} (1 master + {} replicas)",
            config.instance,
            replicas.len()
        );
        Ok(Self::from_pools(master, replicas))
    }

    fn from_pools(master: Pool, replicas: Vec<Pool>) -> Self {
        Self {
            master,
            replicas,
            replica_idx: AtomicUsize::new(0),
        }
    }
}

impl Connector for MysqlConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn master(&self) -> Result<Handle<'_>> {
        let conn = self
            .master
            .get_conn()
            .map_err(|e| DatastoreError::connection("An error occurred while getting master connection", e))?;
        Ok(Handle::Mysql(conn))
    }

    fn replica(&self) -> Result<Handle<'_>> {
        if self.replicas.is_empty() {
            return self.master();
        }
        let idx = self.replica_idx.fetch_add(1, Ordering::Relaxed) % self.replicas.len();
        let conn = self.replicas[idx]
            .get_conn()
            .map_err(|e| DatastoreError::connection("An error occurred while getting replica connection", e))?;
        Ok(Handle::Mysql(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_bind_positionally() {
        assert!(matches!(to_params(&[]), Params::Empty));
        match to_params(&[Value::Integer(1), Value::Text("a".into()), Value::Null]) {
            Params::Positional(values) => assert_eq!(
                values,
                vec![
                    mysql::Value::Int(1),
                    mysql::Value::Bytes(b"a".to_vec()),
                    mysql::Value::NULL
                ]
            ),
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_driver_values_decode() {
        assert_eq!(from_mysql(mysql::Value::UInt(5)), Value::Integer(5));
        assert_eq!(
            from_mysql(mysql::Value::Bytes(b"hello".to_vec())),
            Value::Text("hello".into())
        );
        assert_eq!(from_mysql(mysql::Value::NULL), Value::Null);
    }
}
