//! Relational datastore for the chat backend.
//!
//! One [`Provider`] is opened at startup from a [`DatastoreConfig`] and shared
//! for the life of the process. Every entity operation is a method of one of
//! the store traits re-exported here, callable on the provider (or on any
//! single [`Connector`]) with a [`Context`].

pub mod backend;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod filter;
mod models;
pub mod provider;
pub mod schema;
pub mod stores;
pub mod tx;
pub mod value;

pub use config::{CloudSqlConfig, DatastoreConfig, MysqlConfig, SqliteConfig};
pub use connection::{Connector, ExecResult, Executor, Handle, Tx};
pub use context::Context;
pub use error::{DatastoreError, DriverError, Result};
pub use filter::{Direction, Filter, QueryBuilder, Statement};
pub use provider::{Provider, ProviderKind};
pub use stores::{
    BlockUserStore, DeviceStore, InsertPolicy, RoomStore, RoomUserStore, SettingStore, Store,
    SubscriptionStore, UserExpansions, UserRoleStore, UserStore,
};
pub use tx::with_transaction;
pub use value::{FromRow, Row, Value};
