use chatter_types::models::{MiniUser, RoomForUser, RoomType, User, UserRole};
use chatter_types::unix_now;

use crate::connection::{Connector, Executor, execute, fetch_all, fetch_optional, fetch_rows, replica};
use crate::context::Context;
use crate::error::Result;
use crate::filter::{Filter, QueryBuilder, Statement, in_placeholders};
use crate::schema::{TABLE_BLOCK_USER, TABLE_DEVICE, TABLE_ROOM, TABLE_ROOM_USER, TABLE_SUBSCRIPTION, TABLE_USER};
use crate::stores::block_user::select_block_user_ids_in;
use crate::stores::device::{insert_device_in, select_devices_of_user_in};
use crate::stores::user_role::{insert_user_roles_in, select_role_ids_in};
use crate::tx::with_transaction;
use crate::value::FromRow;

const COLUMNS: &str = "user_id, name, picture_url, information_url, meta_data, is_bot, is_public, \
                       is_show_users, can_block, unread_count, access_token, last_accessed, \
                       created, modified, deleted";
const FIELDS: &[&str] = &[
    "user_id",
    "name",
    "is_bot",
    "is_public",
    "is_show_users",
    "can_block",
    "unread_count",
    "last_accessed",
    "created",
    "modified",
];

/// Which optional collections `select_user` fills in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserExpansions {
    pub rooms: bool,
    pub devices: bool,
    pub blocks: bool,
    pub roles: bool,
}

impl UserExpansions {
    pub fn all() -> Self {
        Self {
            rooms: true,
            devices: true,
            blocks: true,
            roles: true,
        }
    }
}

pub trait UserStore {
    /// Inserts the user along with `user.devices` and `user.roles`, atomically.
    fn insert_user(&self, ctx: &Context, user: &User) -> Result<User>;

    /// Alive user by id. Expansions are separate replica reads and are not
    /// transactional with the base row.
    fn select_user(&self, ctx: &Context, user_id: &str, expand: UserExpansions) -> Result<Option<User>>;

    /// Looks the row up by id whether or not it has been soft-deleted.
    fn select_user_including_deleted(&self, ctx: &Context, user_id: &str) -> Result<Option<User>>;

    fn select_user_by_user_id_and_access_token(
        &self,
        ctx: &Context,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<User>>;

    /// Alive users matching `filters`.
    fn select_users(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<User>>;

    /// The subset of `user_ids` that exist and are alive.
    fn select_user_ids_by_user_ids(&self, ctx: &Context, user_ids: &[String]) -> Result<Vec<String>>;

    /// Public users plus members of the caller's non-notice rooms, excluding
    /// the caller, most recently modified first.
    fn select_contacts(&self, ctx: &Context, user_id: &str) -> Result<Vec<User>>;

    /// Writes the mutable columns. An unread count of zero also clears the
    /// user's per-room unread counts in the same transaction.
    fn update_user(&self, ctx: &Context, user: &User) -> Result<()>;

    /// Soft-deletes the user and cascades to memberships, devices, outbound
    /// blocks and subscriptions, in one transaction.
    fn update_user_deleted(&self, ctx: &Context, user_id: &str) -> Result<()>;
}

impl<C: Connector + ?Sized> UserStore for C {
    #[tracing::instrument(skip_all, fields(user_id = %user.user_id), err)]
    fn insert_user(&self, ctx: &Context, user: &User) -> Result<User> {
        let stmt = Statement::new(format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TABLE_USER, COLUMNS
        ))
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(&user.picture_url)
        .bind(&user.information_url)
        .bind(&user.meta_data)
        .bind(user.is_bot)
        .bind(user.is_public)
        .bind(user.is_show_users)
        .bind(user.can_block)
        .bind(user.unread_count)
        .bind(&user.access_token)
        .bind(user.last_accessed)
        .bind(user.created)
        .bind(user.modified)
        .bind(user.deleted);

        let roles: Vec<UserRole> = user
            .roles
            .iter()
            .flatten()
            .map(|&role_id| UserRole {
                user_id: user.user_id.clone(),
                role_id,
            })
            .collect();

        with_transaction(ctx, self, "inserting user", |tx| {
            execute(ctx, tx, "An error occurred while inserting user", &stmt)?;
            for device in user.devices.iter().flatten() {
                insert_device_in(ctx, tx, device)?;
            }
            insert_user_roles_in(ctx, tx, &roles)
        })?;
        Ok(user.clone())
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_user(&self, ctx: &Context, user_id: &str, expand: UserExpansions) -> Result<Option<User>> {
        let mut conn = replica(ctx, self)?;
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE user_id = ? AND deleted = 0",
            COLUMNS, TABLE_USER
        ))
        .bind(user_id);
        let Some(mut user) =
            fetch_optional::<User, _>(ctx, &mut conn, "An error occurred while getting user", &stmt)?
        else {
            return Ok(None);
        };

        if expand.rooms {
            user.rooms = Some(select_rooms_for_user_in(ctx, &mut conn, user_id)?);
        }
        if expand.devices {
            user.devices = Some(select_devices_of_user_in(ctx, &mut conn, user_id)?);
        }
        if expand.blocks {
            user.blocks = Some(select_block_user_ids_in(ctx, &mut conn, user_id)?);
        }
        if expand.roles {
            user.roles = Some(select_role_ids_in(ctx, &mut conn, user_id)?);
        }
        Ok(Some(user))
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_user_including_deleted(&self, ctx: &Context, user_id: &str) -> Result<Option<User>> {
        let stmt = Statement::new(format!("SELECT {} FROM {} WHERE user_id = ?", COLUMNS, TABLE_USER))
            .bind(user_id);
        fetch_optional(ctx, &mut replica(ctx, self)?, "An error occurred while getting user", &stmt)
    }

    #[tracing::instrument(skip(self, ctx, access_token), err)]
    fn select_user_by_user_id_and_access_token(
        &self,
        ctx: &Context,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<User>> {
        if access_token.is_empty() {
            return Ok(None);
        }
        let stmt = Statement::new(format!(
            "SELECT {} FROM {} WHERE user_id = ? AND access_token = ? AND deleted = 0",
            COLUMNS, TABLE_USER
        ))
        .bind(user_id)
        .bind(access_token);
        fetch_optional(ctx, &mut replica(ctx, self)?, "An error occurred while getting user", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_users(&self, ctx: &Context, filters: &[Filter]) -> Result<Vec<User>> {
        let stmt = QueryBuilder::select(format!("SELECT {} FROM {}", COLUMNS, TABLE_USER), FIELDS)
            .condition("deleted = 0", [])
            .apply(filters)?
            .build()?;
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting user list", &stmt)
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_user_ids_by_user_ids(&self, ctx: &Context, user_ids: &[String]) -> Result<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let stmt = QueryBuilder::select(format!("SELECT user_id FROM {}", TABLE_USER), FIELDS)
            .condition("deleted = 0", [])
            .apply(&[Filter::by_ids("user_id", user_ids.iter().cloned())])?
            .build()?;
        fetch_rows(ctx, &mut replica(ctx, self)?, "An error occurred while getting user ids", &stmt)?
            .iter()
            .map(|row| row.text("user_id"))
            .collect()
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn select_contacts(&self, ctx: &Context, user_id: &str) -> Result<Vec<User>> {
        let stmt = Statement::new(format!(
            "SELECT {cols} FROM {user} \
             WHERE deleted = 0 AND user_id != ? AND (is_public = 1 OR user_id IN ( \
             SELECT ru.user_id FROM {ru} AS ru JOIN {room} AS r ON ru.room_id = r.room_id \
             WHERE r.type != ? AND r.deleted = 0 \
             AND ru.room_id IN (SELECT room_id FROM {ru} WHERE user_id = ?))) \
             ORDER BY modified DESC, user_id ASC",
            cols = COLUMNS,
            user = TABLE_USER,
            ru = TABLE_ROOM_USER,
            room = TABLE_ROOM,
        ))
        .bind(user_id)
        .bind(i32::from(RoomType::Notice))
        .bind(user_id);
        fetch_all(ctx, &mut replica(ctx, self)?, "An error occurred while getting contacts", &stmt)
    }

    #[tracing::instrument(skip_all, fields(user_id = %user.user_id), err)]
    fn update_user(&self, ctx: &Context, user: &User) -> Result<()> {
        let stmt = Statement::new(format!(
            "UPDATE {} SET name = ?, picture_url = ?, information_url = ?, meta_data = ?, \
             is_bot = ?, is_public = ?, is_show_users = ?, can_block = ?, unread_count = ?, \
             last_accessed = ?, modified = ? WHERE user_id = ? AND deleted = 0",
            TABLE_USER
        ))
        .bind(&user.name)
        .bind(&user.picture_url)
        .bind(&user.information_url)
        .bind(&user.meta_data)
        .bind(user.is_bot)
        .bind(user.is_public)
        .bind(user.is_show_users)
        .bind(user.can_block)
        .bind(user.unread_count)
        .bind(user.last_accessed)
        .bind(user.modified)
        .bind(&user.user_id);

        with_transaction(ctx, self, "updating user", |tx| {
            execute(ctx, tx, "An error occurred while updating user", &stmt)?;
            if user.unread_count == 0 {
                let stmt = Statement::new(format!(
                    "UPDATE {} SET unread_count = 0 WHERE user_id = ?",
                    TABLE_ROOM_USER
                ))
                .bind(&user.user_id);
                execute(ctx, tx, "An error occurred while updating room user", &stmt)?;
            }
            Ok(())
        })
    }

    #[tracing::instrument(skip(self, ctx), err)]
    fn update_user_deleted(&self, ctx: &Context, user_id: &str) -> Result<()> {
        let now = unix_now();
        with_transaction(ctx, self, "deleting user", |tx| {
            let stmt = Statement::new(format!("DELETE FROM {} WHERE user_id = ?", TABLE_ROOM_USER)).bind(user_id);
            execute(ctx, tx, "An error occurred while deleting room's users", &stmt)?;

            let stmt = Statement::new(format!("DELETE FROM {} WHERE user_id = ?", TABLE_DEVICE)).bind(user_id);
            execute(ctx, tx, "An error occurred while deleting devices", &stmt)?;

            let stmt = Statement::new(format!("DELETE FROM {} WHERE user_id = ?", TABLE_BLOCK_USER)).bind(user_id);
            execute(ctx, tx, "An error occurred while deleting block users", &stmt)?;

            let stmt = Statement::new(format!(
                "UPDATE {} SET deleted = ? WHERE user_id = ? AND deleted = 0",
                TABLE_SUBSCRIPTION
            ))
            .bind(now)
            .bind(user_id);
            execute(ctx, tx, "An error occurred while updating subscriptions", &stmt)?;

            let stmt = Statement::new(format!(
                "UPDATE {} SET deleted = ? WHERE user_id = ? AND deleted = 0",
                TABLE_USER
            ))
            .bind(now)
            .bind(user_id);
            execute(ctx, tx, "An error occurred while updating user", &stmt)?;
            Ok(())
        })
    }
}

/// The user's alive rooms, newest message first, each with its members.
fn select_rooms_for_user_in<E: Executor + ?Sized>(
    ctx: &Context,
    ex: &mut E,
    user_id: &str,
) -> Result<Vec<RoomForUser>> {
    let stmt = Statement::new(format!(
        "SELECT r.room_id AS room_id, r.user_id AS user_id, r.name AS name, \
         r.picture_url AS picture_url, r.information_url AS information_url, \
         r.meta_data AS meta_data, r.type AS type, r.last_message AS last_message, \
         r.last_message_updated AS last_message_updated, r.can_left AS can_left, \
         r.created AS created, r.modified AS modified, \
         ru.unread_count AS ru_unread_count, ru.meta_data AS ru_meta_data, \
         ru.created AS ru_created, ru.modified AS ru_modified \
         FROM {ru} AS ru JOIN {room} AS r ON ru.room_id = r.room_id \
         WHERE ru.user_id = ? AND r.deleted = 0 \
         ORDER BY r.last_message_updated DESC, r.room_id ASC",
        ru = TABLE_ROOM_USER,
        room = TABLE_ROOM,
    ))
    .bind(user_id);
    let mut rooms: Vec<RoomForUser> =
        fetch_all(ctx, ex, "An error occurred while getting user rooms", &stmt)?;
    if rooms.is_empty() {
        return Ok(rooms);
    }

    let mut stmt = Statement::new(format!(
        "SELECT ru.room_id AS room_id, u.user_id AS user_id, u.name AS name, \
         u.picture_url AS picture_url, u.information_url AS information_url, \
         u.meta_data AS meta_data, u.can_block AS can_block, \
         u.last_accessed AS last_accessed, u.created AS created, u.modified AS modified, \
         ru.display AS display \
         FROM {ru} AS ru JOIN {user} AS u ON ru.user_id = u.user_id \
         WHERE ru.room_id IN ({ids}) AND u.deleted = 0 \
         ORDER BY ru.room_id, ru.created, u.user_id",
        ru = TABLE_ROOM_USER,
        user = TABLE_USER,
        ids = in_placeholders(rooms.len()),
    ));
    for room in &rooms {
        stmt = stmt.bind(&room.room_id);
    }
    let members = fetch_rows(ctx, ex, "An error occurred while getting user rooms", &stmt)?;

    for row in &members {
        let room_id = row.text("room_id")?;
        if let Some(room) = rooms.iter_mut().find(|r| r.room_id == room_id) {
            room.users.push(MiniUser::from_row(row)?);
        }
    }
    Ok(rooms)
}
