use chatter_types::models::{MiniUser, Room, RoomUser};
use chatter_types::unix_now;

use crate::connection::{Connector, execute, fetch_all, fetch_optional, fetch_rows, master, replica};
use crate::context::Context;
use crate::error::Result;
use crate::filter::{Filter, QueryBuilder, Statement};
use crate::schema::{TABLE_ROOM, TABLE_ROOM_USER, TABLE_SUBSCRIPTION, TABLE_USER};
use crate::stores::InsertPolicy;
use crate::stores::room_user::insert_room_users_in;
use crate::tx::with_transaction;

const COLUMNS: &str = "room_id, user_id, name, picture_url, information_url, type, can_left, \
                       meta_data, last_message, last_message_updated, message_count, created, \
                       modified, deleted";
const FIELDS: &[&str] = &[
    "room_id",
    "user_id",
    "name",
    "type",
    "can_left",
    "last_message_updated",
    "message_count",
    "created",
    "modified",
];

pub trait RoomStore {
    /// Inserts the room together with its initial memberships.
    fn insert_room(&self, ctx: &Context, room: &Room, members: &[RoomUser]) -> Result<Room>;

    /// Alive rooms only.
    fn select_room(&self, ctx: &Context, room_id: &str) -> Result<Option<Room>>;

    fn select_rooms(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<Room>>;

    /// Counts alive rooms. Paging and ordering directives are ignored.
    fn select_count_rooms(&self, ctx: &Context, filters: &[Filter]) -> Result<i64>;

    /// Alive members of the room, with their per-room `display` flag.
    fn select_users_for_room(&self, ctx: &Context, room_id: &str) -> Result<Vec<MiniUser>>;

    fn update_room(&self, ctx: &Context, room: &Room) -> Result<()>;

    /// Drops the room's memberships, soft-deletes its subscriptions and then
    /// the room itself, in one transaction.
    fn update_room_deleted(&self, ctx: &Context, room_id: &str) -> Result<()>;
}

impl<C: Connector + ?Sized> RoomStore for C {
    #[tracing::instrument(skip_all, fields(room_id = %room.room_id, members = members.len()), err)]
    fn insert_room(&self, ctx: &Context, room: &Room, members: &[RoomUser]) -> Result<Room> {
        let stmt = Statement::new(format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TABLE_ROOM, COLUMNS
        ))
        .bind(&room.room_id)
        .bind(&room.user_id)
        .bind(&room.name)
        .bind(&room.picture_url)
        .bind(&room.information_url)
        .bind(i32::from(room.room_type))
        .bind(room.can_left)
        .bind(&room.meta_data)
        .bind(&room.last_message)
        .bind(room.last_message_updated)
        .bind(room.message_count)
        .bind(room.created)
        .bind(room.modified)
        .bind(room.deleted);

        with_transaction(ctx, self, "inserting room", |tx| {
            execute(ctx, tx, "An error occurred while inserting room", &stmt)?;
            insert_room_users_in(ctx, tx, members, InsertPolicy::DedupeOnInsert)
        })?;
        Ok(room.clone())
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_room(&self, ctx: &Context, room_id: &str) -> Result<Option<Room>> {
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE room_id = ? AND deleted = 0",
            COLUMNS, TABLE_ROOM
        ))
        .bind(room_id);
        fetch_optional(ctx, &mut replica(ctx, self)?, "An error occurred while getting room", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_rooms(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<Room>> {
        let stmt = QueryBuilder::select(format!("SELECT {} FROM {}", COLUMNS, TABLE_ROOM), FIELDS)
            .condition("deleted = 0", [])
            .apply(filters)?
            .build()?;
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting rooms", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_count_rooms(&self, ctx: &Context, filters: &[Filter]) -> Result<i64> {
        let conditions: Vec<Filter> = filters
            .iter()
            .filter(|f| matches!(f, Filter::ByIds { .. } | Filter::ByEquality { .. }))
            .cloned()
            .collect();
        let stmt = QueryBuilder::select(format!("SELECT COUNT(*) AS count FROM {}", TABLE_ROOM), FIELDS)
            .condition("deleted = 0", [])
            .apply(&conditions)?
            .build()?;
        let rows = fetch_rows(ctx, &mut replica(ctx, self)?, "An error occurred while counting rooms", &stmt)?;
        match rows.first() {
            Some(row) => row.int("count"),
            None => Ok(0),
        }
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_users_for_room(&self, ctx: &Context, room_id: &str) -> Result<Vec<MiniUser>> {
        let stmt = Statement::new(format!(
            "SELECT u.user_id AS user_id, u.name AS name, u.picture_url AS picture_url, \
             u.information_url AS information_url, u.meta_data AS meta_data, \
             u.can_block AS can_block, u.last_accessed AS last_accessed, \
             u.created AS created, u.modified AS modified, ru.display AS display \
             FROM {} AS ru JOIN {} AS u ON ru.user_id = u.user_id \
             WHERE ru.room_id = ? AND u.deleted = 0 \
             ORDER BY ru.created, u.user_id",
            TABLE_ROOM_USER, TABLE_USER
        ))
        .bind(room_id);
        fetch_all(
            ctx,
            &mut replica(ctx, self)?,
            "An error occurred while getting room's users",
            &stmt,
        )
    }

    #[tracing::instrument(skip_all, fields(room_id = %room.room_id), err)]
    fn update_room(&self, ctx: &Context, room: &Room) -> Result<()> {
        let stmt = Statement::new(format!(
            "UPDATE {} SET name = ?, picture_url = ?, information_url = ?, type = ?, can_left = ?, \
             meta_data = ?, last_message = ?, last_message_updated = ?, message_count = ?, \
             modified = ? WHERE room_id = ? AND deleted = 0",
            TABLE_ROOM
        ))
        .bind(&room.name)
        .bind(&room.picture_url)
        .bind(&room.information_url)
        .bind(i32::from(room.room_type))
        .bind(room.can_left)
        .bind(&room.meta_data)
        .bind(&room.last_message)
        .bind(room.last_message_updated)
        .bind(room.message_count)
        .bind(room.modified)
        .bind(&room.room_id);
        execute(ctx, &mut master(ctx, self)?, "An error occurred while updating room", &stmt)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn update_room_deleted(&self, ctx: &Context, room_id: &str) -> Result<()> {
        let now = unix_now();
        with_transaction(ctx, self, "deleting room", |tx| {
            let stmt = Statement::new(format!("DELETE FROM {} WHERE room_id = ?", TABLE_ROOM_USER))
                .bind(room_id);
            execute(ctx, tx, "An error occurred while deleting room's users", &stmt)?;

            let stmt = Statement::new(format!(
                "UPDATE {} SET deleted = ? WHERE room_id = ? AND deleted = 0",
                TABLE_SUBSCRIPTION
            ))
            .bind(now)
            .bind(room_id);
            execute(ctx, tx, "An error occurred while updating subscriptions", &stmt)?;

            let stmt = Statement::new(format!(
                "UPDATE {} SET deleted = ? WHERE room_id = ? AND deleted = 0",
                TABLE_ROOM
            ))
            .bind(now)
            .bind(room_id);
            execute(ctx, tx, "An error occurred while updating room", &stmt)?;
            Ok(())
        })
    }
}
