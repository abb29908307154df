#![allow(dead_code)]

use chatter_db::{Connector, Context, DatastoreConfig, Executor, Provider, SqliteConfig};
use chatter_types::models::{Room, RoomType, User};
use tempfile::TempDir;

pub const NOW: i64 = 1_700_000_000;

/// Embedded provider on a fresh file. Keep the `TempDir` alive for the test.
pub fn provider() -> (TempDir, Provider) {
    let dir = tempfile::tempdir().unwrap();
    let provider = Provider::open(&DatastoreConfig::Embedded(SqliteConfig {
        path: dir.path().join("chatter.db"),
        readers: 2,
    }))
    .unwrap();
    (dir, provider)
}

pub fn ctx() -> Context {
    Context::background()
}

pub fn user(id: &str) -> User {
    let mut user = User::new(id, id.to_uppercase(), NOW);
    user.access_token = format!("token-{}", id);
    user
}

pub fn room(id: &str, owner: &str, room_type: RoomType) -> Room {
    Room::new(id, owner, room_type, NOW)
}

/// Runs raw SQL on master, for setting up failure triggers.
pub fn exec(provider: &Provider, sql: &str) {
    provider.master().unwrap().execute_raw(sql, &[]).unwrap();
}

pub fn count(provider: &Provider, sql: &str) -> i64 {
    let rows = provider.master().unwrap().query_raw(sql, &[]).unwrap();
    rows[0].int("n").unwrap()
}
