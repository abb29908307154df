//! Table declarations and the idempotent startup bootstrap.
//!
//! Each entity is declared once as a [`Table`]; a [`Dialect`] renders it into
//! `CREATE TABLE IF NOT EXISTS` (plus index) statements for its engine.

use tracing::{error, info};

use crate::connection::{Connector, execute};
use crate::context::Context;
use crate::filter::Statement;

pub const TABLE_USER: &str = "user";
pub const TABLE_ROOM: &str = "room";
pub const TABLE_ROOM_USER: &str = "room_user";
pub const TABLE_BLOCK_USER: &str = "block_user";
pub const TABLE_DEVICE: &str = "device";
pub const TABLE_USER_ROLE: &str = "user_role";
pub const TABLE_SETTING: &str = "setting";
pub const TABLE_SUBSCRIPTION: &str = "subscription";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Auto-increment surrogate primary key.
    Id,
    /// Short indexed string (ids, tokens).
    Key,
    Text,
    Integer,
    Bool,
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub unique: &'static [&'static [&'static str]],
    pub indexes: &'static [&'static [&'static str]],
}

use ColumnType::{Bool, Id, Integer, Key, Text};

pub static USER: Table = Table {
    name: TABLE_USER,
    columns: &[
        col("id", Id),
        col("user_id", Key),
        col("name", Text),
        col("picture_url", Text),
        col("information_url", Text),
        col("meta_data", Text),
        col("is_bot", Bool),
        col("is_public", Bool),
        col("is_show_users", Bool),
        col("can_block", Bool),
        col("unread_count", Integer),
        col("access_token", Key),
        col("last_accessed", Integer),
        col("created", Integer),
        col("modified", Integer),
        col("deleted", Integer),
    ],
    unique: &[&["user_id"]],
    indexes: &[],
};

pub static ROOM: Table = Table {
    name: TABLE_ROOM,
    columns: &[
        col("id", Id),
        col("room_id", Key),
        col("user_id", Key),
        col("name", Text),
        col("picture_url", Text),
        col("information_url", Text),
        col("type", Integer),
        col("can_left", Bool),
        col("meta_data", Text),
        col("last_message", Text),
        col("last_message_updated", Integer),
        col("message_count", Integer),
        col("created", Integer),
        col("modified", Integer),
        col("deleted", Integer),
    ],
    unique: &[&["room_id"]],
    indexes: &[],
};

pub static ROOM_USER: Table = Table {
    name: TABLE_ROOM_USER,
    columns: &[
        col("room_id", Key),
        col("user_id", Key),
        col("unread_count", Integer),
        col("display", Bool),
        col("meta_data", Text),
        col("created", Integer),
        col("modified", Integer),
    ],
    unique: &[&["room_id", "user_id"]],
    indexes: &[&["user_id"]],
};

pub static BLOCK_USER: Table = Table {
    name: TABLE_BLOCK_USER,
    columns: &[
        col("user_id", Key),
        col("block_user_id", Key),
        col("created", Integer),
    ],
    unique: &[&["user_id", "block_user_id"]],
    indexes: &[&["block_user_id"]],
};

pub static DEVICE: Table = Table {
    name: TABLE_DEVICE,
    columns: &[
        col("user_id", Key),
        col("platform", Integer),
        col("token", Key),
        col("notification_device_id", Key),
    ],
    unique: &[&["user_id", "platform"]],
    indexes: &[&["token"]],
};

pub static USER_ROLE: Table = Table {
    name: TABLE_USER_ROLE,
    columns: &[col("user_id", Key), col("role_id", Integer)],
    unique: &[&["user_id", "role_id"]],
    indexes: &[&["role_id"]],
};

pub static SETTING: Table = Table {
    name: TABLE_SETTING,
    columns: &[
        col("id", Id),
        col("content", Text),
        col("expired", Integer),
        col("created", Integer),
    ],
    unique: &[],
    indexes: &[&["created"]],
};

pub static SUBSCRIPTION: Table = Table {
    name: TABLE_SUBSCRIPTION,
    columns: &[
        col("room_id", Key),
        col("user_id", Key),
        col("platform", Integer),
        col("notification_subscription_id", Key),
        col("created", Integer),
        col("deleted", Integer),
    ],
    unique: &[&["room_id", "user_id", "platform"]],
    indexes: &[&["user_id"]],
};

/// Every table, in bootstrap order.
pub static TABLES: [&Table; 8] = [
    &USER,
    &ROOM,
    &ROOM_USER,
    &BLOCK_USER,
    &DEVICE,
    &USER_ROLE,
    &SETTING,
    &SUBSCRIPTION,
];

impl Dialect {
    fn column_sql(self, column: &Column) -> String {
        let ty = match (self, column.ty) {
            (Dialect::Sqlite, Id) => "INTEGER PRIMARY KEY AUTOINCREMENT",
            (Dialect::Sqlite, Key) => "TEXT NOT NULL",
            (Dialect::Sqlite, Text) => "TEXT NOT NULL DEFAULT ''",
            (Dialect::Sqlite, Integer) | (Dialect::Sqlite, Bool) => "INTEGER NOT NULL DEFAULT 0",
            (Dialect::Mysql, Id) => "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
            (Dialect::Mysql, Key) => "VARCHAR(255) NOT NULL",
            // TEXT columns cannot carry a default on older MySQL servers
            (Dialect::Mysql, Text) => "TEXT NOT NULL",
            (Dialect::Mysql, Integer) => "BIGINT NOT NULL DEFAULT 0",
            (Dialect::Mysql, Bool) => "TINYINT(1) NOT NULL DEFAULT 0",
        };
        format!("{} {}", column.name, ty)
    }

    /// Renders the bootstrap statements for one table.
    ///
    /// MySQL has no `CREATE INDEX IF NOT EXISTS`, so secondary indexes are
    /// declared inline there and as separate statements on SQLite.
    pub fn create_table(self, table: &Table) -> Vec<String> {
        let mut defs: Vec<String> = table.columns.iter().map(|c| self.column_sql(c)).collect();
        for cols in table.unique {
            defs.push(format!("UNIQUE ({})", cols.join(", ")));
        }
        if self == Dialect::Mysql {
            for cols in table.indexes {
                defs.push(format!("INDEX {} ({})", index_name(table, cols), cols.join(", ")));
            }
        }

        let suffix = match self {
            Dialect::Sqlite => "",
            Dialect::Mysql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        };
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} ({}){}",
            table.name,
            defs.join(", "),
            suffix
        )];

        if self == Dialect::Sqlite {
            for cols in table.indexes {
                statements.push(format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    index_name(table, cols),
                    table.name,
                    cols.join(", ")
                ));
            }
        }
        statements
    }
}

fn index_name(table: &Table, cols: &[&str]) -> String {
    format!("idx_{}_{}", table.name, cols.join("_"))
}

/// Creates every table that does not exist yet, against master.
///
/// Failures are logged and skipped so startup can continue; queries against a
/// missing table fail individually later. Returns the tables that failed.
pub fn create_tables<C: Connector + ?Sized>(ctx: &Context, connector: &C) -> Vec<&'static str> {
    let dialect = connector.dialect();
    let mut failed = Vec::new();

    let mut master = match connector.master() {
        Ok(master) => master,
        Err(e) => {
            error!("An error occurred while creating tables: {}", e);
            return TABLES.iter().map(|t| t.name).collect();
        }
    };

    for table in TABLES {
        for sql in dialect.create_table(table) {
            let context = format!("An error occurred while creating {} table", table.name);
            if let Err(e) = execute(ctx, &mut master, &context, &Statement::new(sql)) {
                error!("{}", e);
                failed.push(table.name);
                break;
            }
        }
    }

    info!(
        "Schema bootstrap complete ({} tables, {} failed)",
        TABLES.len(),
        failed.len()
    );
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_block_user_ddl() {
        let stmts = Dialect::Sqlite.create_table(&BLOCK_USER);
        assert_eq!(
            stmts[0],
            "CREATE TABLE IF NOT EXISTS block_user (user_id TEXT NOT NULL, \
             block_user_id TEXT NOT NULL, created INTEGER NOT NULL DEFAULT 0, \
             UNIQUE (user_id, block_user_id))"
        );
        assert_eq!(
            stmts[1],
            "CREATE INDEX IF NOT EXISTS idx_block_user_block_user_id ON block_user (block_user_id)"
        );
    }

    #[test]
    fn test_mysql_inlines_indexes() {
        let stmts = Dialect::Mysql.create_table(&DEVICE);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("user_id VARCHAR(255) NOT NULL"));
        assert!(stmts[0].contains("UNIQUE (user_id, platform)"));
        assert!(stmts[0].contains("INDEX idx_device_token (token)"));
        assert!(stmts[0].ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
    }

    #[test]
    fn test_surrogate_keys_per_dialect() {
        let sqlite = Dialect::Sqlite.create_table(&SETTING);
        assert!(sqlite[0].contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));

        let mysql = Dialect::Mysql.create_table(&SETTING);
        assert!(mysql[0].contains("id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
    }

    #[test]
    fn test_every_join_table_declares_its_composite_key() {
        for (table, key) in [
            (&ROOM_USER, ["room_id", "user_id"]),
            (&BLOCK_USER, ["user_id", "block_user_id"]),
            (&DEVICE, ["user_id", "platform"]),
            (&USER_ROLE, ["user_id", "role_id"]),
        ] {
            assert!(
                table.unique.iter().any(|u| *u == key),
                "{} is missing its unique key",
                table.name
            );
        }
    }
}
