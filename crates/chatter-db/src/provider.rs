//! Backend selection.
//!
//! [`Provider`] is the closed set of backends. The server opens exactly one at
//! startup and shares it behind an `Arc`; every store method is available on
//! it through the [`Connector`] blanket impls in [`crate::stores`].

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::backend::{MysqlConnector, SqliteConnector};
use crate::config::DatastoreConfig;
use crate::connection::{Connector, Handle};
use crate::context::Context;
use crate::error::{DatastoreError, Result};
use crate::schema::{self, Dialect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Embedded,
    ManagedCloud,
    Networked,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Embedded => "embedded",
            ProviderKind::ManagedCloud => "managed-cloud",
            ProviderKind::Networked => "networked",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DatastoreError;

    /// Empty input selects the default backend; unknown names are rejected.
    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "embedded" | "sqlite" => Ok(ProviderKind::Embedded),
            "managed-cloud" | "gcpsql" => Ok(ProviderKind::ManagedCloud),
            "networked" | "mysql" => Ok(ProviderKind::Networked),
            other => Err(DatastoreError::config(format!("unknown datastore backend {:?}", other))),
        }
    }
}

pub enum Provider {
    Embedded(SqliteConnector),
    ManagedCloud(MysqlConnector),
    Networked(MysqlConnector),
}

impl Provider {
    /// Connects the configured backend and bootstraps its tables.
    pub fn open(config: &DatastoreConfig) -> Result<Self> {
        let provider = match config {
            DatastoreConfig::Embedded(c) => Provider::Embedded(SqliteConnector::open(c)?),
            DatastoreConfig::ManagedCloud(c) => Provider::ManagedCloud(MysqlConnector::connect_cloud_sql(c)?),
            DatastoreConfig::Networked(c) => Provider::Networked(MysqlConnector::connect(c)?),
        };

        let failed = schema::create_tables(&Context::background(), &provider);
        if !failed.is_empty() {
            warn!("Continuing without tables: {}", failed.join(", "));
        }

        info!("Datastore provider ready: {}", provider.kind());
        Ok(provider)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Embedded(_) => ProviderKind::Embedded,
            Provider::ManagedCloud(_) => ProviderKind::ManagedCloud,
            Provider::Networked(_) => ProviderKind::Networked,
        }
    }
}

impl Connector for Provider {
    fn dialect(&self) -> Dialect {
        match self {
            Provider::Embedded(c) => c.dialect(),
            Provider::ManagedCloud(c) | Provider::Networked(c) => c.dialect(),
        }
    }

    fn master(&self) -> Result<Handle<'_>> {
        match self {
            Provider::Embedded(c) => c.master(),
            Provider::ManagedCloud(c) | Provider::Networked(c) => c.master(),
        }
    }

    fn replica(&self) -> Result<Handle<'_>> {
        match self {
            Provider::Embedded(c) => c.replica(),
            Provider::ManagedCloud(c) | Provider::Networked(c) => c.replica(),
        }
    }
}
