use std::path::PathBuf;

use anyhow::{Context as _, bail};

use chatter_db::{CloudSqlConfig, DatastoreConfig, MysqlConfig, ProviderKind, SqliteConfig};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub datastore: DatastoreConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let list = |key: &str| -> Vec<String> {
            get(key)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };

        let host = get("CHATTER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("CHATTER_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("CHATTER_PORT must be a port number")?;

        let kind: ProviderKind = get("CHATTER_DATASTORE").unwrap_or_default().parse()?;
        let datastore = match kind {
            ProviderKind::Embedded => {
                let mut sqlite = SqliteConfig::new(
                    get("CHATTER_SQLITE_PATH").unwrap_or_else(|| "chatter.db".into()),
                );
                if let Some(readers) = get("CHATTER_SQLITE_READERS") {
                    sqlite.readers = readers
                        .parse()
                        .context("CHATTER_SQLITE_READERS must be a non-negative integer")?;
                }
                DatastoreConfig::Embedded(sqlite)
            }
            ProviderKind::Networked => {
                let Some(master_url) = get("CHATTER_MYSQL_MASTER_URL") else {
                    bail!("CHATTER_MYSQL_MASTER_URL is required for the {} datastore", kind);
                };
                DatastoreConfig::Networked(MysqlConfig {
                    master_url,
                    replica_urls: list("CHATTER_MYSQL_REPLICA_URLS"),
                })
            }
            ProviderKind::ManagedCloud => {
                let Some(instance) = get("CHATTER_CLOUDSQL_INSTANCE") else {
                    bail!("CHATTER_CLOUDSQL_INSTANCE is required for the {} datastore", kind);
                };
                DatastoreConfig::ManagedCloud(CloudSqlConfig {
                    instance,
                    user: get("CHATTER_CLOUDSQL_USER").unwrap_or_default(),
                    password: get("CHATTER_CLOUDSQL_PASSWORD").unwrap_or_default(),
                    database: get("CHATTER_CLOUDSQL_DATABASE").unwrap_or_default(),
                    replica_instances: list("CHATTER_CLOUDSQL_REPLICA_INSTANCES"),
                    socket_dir: PathBuf::from(
                        get("CHATTER_CLOUDSQL_SOCKET_DIR").unwrap_or_else(|| "/cloudsql".into()),
                    ),
                })
            }
        };

        Ok(Self {
            host,
            port,
            datastore,
        })
    }
}
