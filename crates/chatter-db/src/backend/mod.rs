//! Driver glue for the concrete engines.

pub mod mysql;
pub mod sqlite;

pub use self::mysql::MysqlConnector;
pub use self::sqlite::SqliteConnector;
