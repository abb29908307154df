//! Row decoding for the entity types.

use chatter_types::models::{
    BlockUser, Device, MiniUser, Room, RoomForUser, RoomType, RoomUser, Setting, Subscription,
    User, UserRole,
};

use crate::error::{DatastoreError, Result};
use crate::value::{FromRow, Row};

fn room_type(row: &Row, column: &str) -> Result<RoomType> {
    RoomType::try_from(row.int32(column)?).map_err(|e| DatastoreError::decode("decoding room", e))
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(User {
            user_id: row.text("user_id")?,
            name: row.text("name")?,
            picture_url: row.text("picture_url")?,
            information_url: row.text("information_url")?,
            meta_data: row.json("meta_data")?,
            is_bot: row.bool("is_bot")?,
            is_public: row.bool("is_public")?,
            is_show_users: row.bool("is_show_users")?,
            can_block: row.bool("can_block")?,
            unread_count: row.int("unread_count")?,
            access_token: row.text("access_token")?,
            last_accessed: row.int("last_accessed")?,
            created: row.int("created")?,
            modified: row.int("modified")?,
            deleted: row.int("deleted")?,
            rooms: None,
            devices: None,
            blocks: None,
            roles: None,
        })
    }
}

impl FromRow for MiniUser {
    fn from_row(row: &Row) -> Result<Self> {
        let display = if row.has("display") {
            Some(row.bool("display")?)
        } else {
            None
        };
        Ok(MiniUser {
            user_id: row.text("user_id")?,
            name: row.text("name")?,
            picture_url: row.text("picture_url")?,
            information_url: row.text("information_url")?,
            meta_data: row.json("meta_data")?,
            can_block: row.bool("can_block")?,
            last_accessed: row.int("last_accessed")?,
            created: row.int("created")?,
            modified: row.int("modified")?,
            display,
        })
    }
}

impl FromRow for Room {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Room {
            room_id: row.text("room_id")?,
            user_id: row.text("user_id")?,
            name: row.text("name")?,
            picture_url: row.text("picture_url")?,
            information_url: row.text("information_url")?,
            room_type: room_type(row, "type")?,
            can_left: row.bool("can_left")?,
            meta_data: row.json("meta_data")?,
            last_message: row.text("last_message")?,
            last_message_updated: row.int("last_message_updated")?,
            message_count: row.int("message_count")?,
            created: row.int("created")?,
            modified: row.int("modified")?,
            deleted: row.int("deleted")?,
            users: None,
        })
    }
}

impl FromRow for RoomForUser {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(RoomForUser {
            room_id: row.text("room_id")?,
            user_id: row.text("user_id")?,
            name: row.text("name")?,
            picture_url: row.text("picture_url")?,
            information_url: row.text("information_url")?,
            meta_data: row.json("meta_data")?,
            room_type: room_type(row, "type")?,
            last_message: row.text("last_message")?,
            last_message_updated: row.int("last_message_updated")?,
            can_left: row.bool("can_left")?,
            created: row.int("created")?,
            modified: row.int("modified")?,
            ru_unread_count: row.int("ru_unread_count")?,
            ru_meta_data: row.json("ru_meta_data")?,
            ru_created: row.int("ru_created")?,
            ru_modified: row.int("ru_modified")?,
            users: Vec::new(),
        })
    }
}

impl FromRow for RoomUser {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(RoomUser {
            room_id: row.text("room_id")?,
            user_id: row.text("user_id")?,
            unread_count: row.int("unread_count")?,
            display: row.bool("display")?,
            meta_data: row.json("meta_data")?,
            created: row.int("created")?,
            modified: row.int("modified")?,
        })
    }
}

impl FromRow for BlockUser {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(BlockUser {
            user_id: row.text("user_id")?,
            block_user_id: row.text("block_user_id")?,
            created: row.int("created")?,
        })
    }
}

impl FromRow for Device {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Device {
            user_id: row.text("user_id")?,
            platform: row.int32("platform")?,
            token: row.text("token")?,
            notification_device_id: row.text("notification_device_id")?,
        })
    }
}

impl FromRow for UserRole {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(UserRole {
            user_id: row.text("user_id")?,
            role_id: row.int32("role_id")?,
        })
    }
}

impl FromRow for Setting {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Setting {
            id: row.int("id")?,
            values: row.json("content")?,
            expired: row.int("expired")?,
            created: row.int("created")?,
        })
    }
}

impl FromRow for Subscription {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Subscription {
            room_id: row.text("room_id")?,
            user_id: row.text("user_id")?,
            platform: row.int32("platform")?,
            notification_subscription_id: row.text("notification_subscription_id")?,
            created: row.int("created")?,
            deleted: row.int("deleted")?,
        })
    }
}
