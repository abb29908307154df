use std::path::PathBuf;

/// Settings for the embedded SQLite backend.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    /// Read-only replica connections. Zero routes replica reads to master.
    pub readers: usize,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            readers: 4,
        }
    }
}

/// Settings for the networked MySQL backend.
#[derive(Debug, Clone)]
pub struct MysqlConfig {
    pub master_url: String,
    pub replica_urls: Vec<String>,
}

/// Settings for MySQL reached through the Cloud SQL proxy socket directory.
#[derive(Debug, Clone)]
pub struct CloudSqlConfig {
    pub instance: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub replica_instances: Vec<String>,
    pub socket_dir: PathBuf,
}

impl CloudSqlConfig {
    pub fn socket_path(&self, instance: &str) -> PathBuf {
        self.socket_dir.join(instance)
    }
}

#[derive(Debug, Clone)]
pub enum DatastoreConfig {
    Embedded(SqliteConfig),
    ManagedCloud(CloudSqlConfig),
    Networked(MysqlConfig),
}
