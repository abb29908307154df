use std::collections::HashSet;

use chatter_types::models::{RoomType, RoomUser};

use crate::connection::{Connector, Executor, execute, fetch_all, fetch_optional, fetch_strings, replica};
use crate::context::Context;
use crate::error::Result;
use crate::filter::{Filter, QueryBuilder, Statement, in_placeholders};
use crate::schema::{TABLE_ROOM, TABLE_ROOM_USER};
use crate::stores::InsertPolicy;
use crate::tx::with_transaction;

const COLUMNS: &str = "room_id, user_id, unread_count, display, meta_data, created, modified";
const SELECT_FIELDS: &[&str] = &[
    "room_id",
    "user_id",
    "unread_count",
    "display",
    "created",
    "modified",
];
const DELETE_FIELDS: &[&str] = &["room_id", "user_id"];

pub trait RoomUserStore {
    /// Clean-then-insert first removes every member of each room present in
    /// `room_users`.
    fn insert_room_users(
        &self,
        ctx: &Context,
        room_users: &[RoomUser],
        policy: InsertPolicy,
    ) -> Result<()>;

    fn select_room_users(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<RoomUser>>;

    fn select_room_user(&self, ctx: &Context, room_id: &str, user_id: &str) -> Result<Option<RoomUser>>;

    /// The opponent's membership in an alive one-on-one room shared with `my_user_id`.
    fn select_room_user_of_one_on_one(
        &self,
        ctx: &Context,
        my_user_id: &str,
        opponent_user_id: &str,
    ) -> Result<Option<RoomUser>>;

    fn select_user_ids_of_room_user(&self, ctx: &Context, room_id: &str) -> Result<Vec<String>>;

    fn update_room_user(&self, ctx: &Context, room_user: &RoomUser) -> Result<()>;

    fn delete_room_users(&self, ctx: &Context, filters: &[Filter]) -> Result<()>;
}

impl<C: Connector + ?Sized> RoomUserStore for C {
    #[tracing::instrument(skip_all, fields(count = room_users.len(), policy = ?policy), err)]
    fn insert_room_users(
        &self,
        ctx: &Context,
        room_users: &[RoomUser],
        policy: InsertPolicy,
    ) -> Result<()> {
        if room_users.is_empty() {
            return Ok(());
        }
        with_transaction(ctx, self, "inserting room users", |tx| {
            insert_room_users_in(ctx, tx, room_users, policy)
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_room_users(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<RoomUser>> {
        let stmt = QueryBuilder::select(format!("SELECT {} FROM {}", COLUMNS, TABLE_ROOM_USER), SELECT_FIELDS)
            .apply(filters)?
            .build()?;
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting room users", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_room_user(&self, ctx: &Context, room_id: &str, user_id: &str) -> Result<Option<RoomUser>> {
        select_room_user_in(ctx, &mut replica(ctx, self)?, room_id, user_id)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_room_user_of_one_on_one(
        &self,
        ctx: &Context,
        my_user_id: &str,
        opponent_user_id: &str,
    ) -> Result<Option<RoomUser>> {
        let stmt = Statement::new(format!(
            "SELECT ru.room_id AS room_id, ru.user_id AS user_id, ru.unread_count AS unread_count, \
             ru.display AS display, ru.meta_data AS meta_data, ru.created AS created, \
             ru.modified AS modified \
             FROM {ru} AS ru JOIN {room} AS r ON ru.room_id = r.room_id \
             WHERE ru.user_id = ? AND r.type = ? AND r.deleted = 0 \
             AND ru.room_id IN (SELECT room_id FROM {ru} WHERE user_id = ?) \
             ORDER BY ru.created, ru.room_id LIMIT 1",
            ru = TABLE_ROOM_USER,
            room = TABLE_ROOM,
        ))
        .bind(opponent_user_id)
        .bind(i32::from(RoomType::OneOnOne))
        .bind(my_user_id);
        fetch_optional(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting one-on-one room user",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_user_ids_of_room_user(&self, ctx: &Context, room_id: &str) -> Result<Vec<String>> {
        let stmt = Statement::new(format!(
            "SELECT user_id FROM {} WHERE room_id = ? ORDER BY created, user_id",
            TABLE_ROOM_USER
        ))
        .bind(room_id);
        fetch_strings(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting user ids of room",
            "user_id",
            &stmt,
        )
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn update_room_user(&self, ctx: &Context, room_user: &RoomUser) -> Result<()> {
        let stmt = Statement::new(format!(
            "UPDATE {} SET unread_count = ?, display = ?, meta_data = ?, modified = ? \
             WHERE room_id = ? AND user_id = ?",
            TABLE_ROOM_USER
        ))
        .bind(room_user.unread_count)
        .bind(room_user.display)
        .bind(&room_user.meta_data)
        .bind(room_user.modified)
        .bind(&room_user.room_id)
        .bind(&room_user.user_id);
        with_transaction(ctx, self, "updating room user", |tx| {
            execute(ctx, tx, "An error occurred while updating room user", &stmt)?;
            Ok(())
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn delete_room_users(&self, ctx: &Context, filters: &[Filter]) -> Result<()> {
        let stmt = QueryBuilder::delete(TABLE_ROOM_USER, DELETE_FIELDS)
            .apply(filters)?
            .build()?;
        with_transaction(ctx, self, "deleting room users", |tx| {
            execute(ctx, tx, "An error occurred while deleting room users", &stmt)?;
            Ok(())
        })
    }
}

fn select_room_user_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    room_id: &str,
    user_id: &str,
) -> Result<Option<RoomUser>> {
    let stmt = Statement::new(format!(
        "SELECT {} FROM {} WHERE room_id = ? AND user_id = ?",
        COLUMNS, TABLE_ROOM_USER
    ))
    .bind(room_id)
    .bind(user_id);
    fetch_optional(ctx, ex, "An error occurred while getting room user", &stmt)
}

/// Removes every membership of the given rooms.
pub(crate) fn delete_members_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    room_ids: &[&str],
) -> Result<()> {
    if room_ids.is_empty() {
        return Ok(());
    }
    let mut stmt = Statement::new(format!(
        "DELETE FROM {} WHERE room_id IN ({})",
        TABLE_ROOM_USER,
        in_placeholders(room_ids.len())
    ));
    for id in room_ids {
        stmt = stmt.bind(*id);
    }
    execute(ctx, ex, "An error occurred while deleting room users", &stmt)?;
    Ok(())
}

pub(crate) fn insert_room_users_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    room_users: &[RoomUser],
    policy: InsertPolicy,
) -> Result<()> {
    if policy == InsertPolicy::CleanThenInsert {
        let mut rooms: Vec<&str> = room_users.iter().map(|ru| ru.room_id.as_str()).collect();
        rooms.sort_unstable();
        rooms.dedup();
        delete_members_in(ctx, ex, &rooms)?;
    }

    let insert = format!(
        "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
        TABLE_ROOM_USER, COLUMNS
    );
    let mut seen = HashSet::new();
    for ru in room_users {
        if !seen.insert((ru.room_id.as_str(), ru.user_id.as_str())) {
            continue;
        }
        if policy == InsertPolicy::DedupeOnInsert
            && select_room_user_in(ctx, ex, &ru.room_id, &ru.user_id)?.is_some()
        {
            continue;
        }
        let stmt = Statement::new(insert.as_str())
            .bind(&ru.room_id)
            .bind(&ru.user_id)
            .bind(ru.unread_count)
            .bind(ru.display)
            .bind(&ru.meta_data)
            .bind(ru.created)
            .bind(ru.modified);
        execute(ctx, ex, "An error occurred while inserting room users", &stmt)?;
    }
    Ok(())
}
