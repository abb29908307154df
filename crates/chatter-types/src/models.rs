use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind of room. Stored as its integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum RoomType {
    OneOnOne = 1,
    Private = 2,
    Public = 3,
    /// Broadcast-only room. Notice rooms never make their members contacts.
    Notice = 4,
}

impl TryFrom<i32> for RoomType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::OneOnOne),
            2 => Ok(Self::Private),
            3 => Ok(Self::Public),
            4 => Ok(Self::Notice),
            other => Err(format!("unknown room type {}", other)),
        }
    }
}

impl From<RoomType> for i32 {
    fn from(value: RoomType) -> Self {
        value as i32
    }
}

pub const PLATFORM_IOS: i32 = 1;
pub const PLATFORM_ANDROID: i32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub picture_url: String,
    pub information_url: String,
    pub meta_data: JsonValue,
    pub is_bot: bool,
    pub is_public: bool,
    pub is_show_users: bool,
    pub can_block: bool,
    pub unread_count: i64,
    #[serde(skip)]
    pub access_token: String,
    pub last_accessed: i64,
    pub created: i64,
    pub modified: i64,
    /// Soft-delete marker, 0 while the user is alive.
    #[serde(skip)]
    pub deleted: i64,

    // Optional expansions, filled by `select_user` on request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<Vec<RoomForUser>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<Device>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<i32>>,
}

impl User {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, now: i64) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            picture_url: String::new(),
            information_url: String::new(),
            meta_data: JsonValue::Object(Default::default()),
            is_bot: false,
            is_public: false,
            is_show_users: true,
            can_block: true,
            unread_count: 0,
            access_token: String::new(),
            last_accessed: now,
            created: now,
            modified: now,
            deleted: 0,
            rooms: None,
            devices: None,
            blocks: None,
            roles: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.deleted == 0
    }
}

/// Reduced user projection used in member and block listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniUser {
    pub user_id: String,
    pub name: String,
    pub picture_url: String,
    pub information_url: String,
    pub meta_data: JsonValue,
    pub can_block: bool,
    pub last_accessed: i64,
    pub created: i64,
    pub modified: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: String,
    /// Owner of the room.
    pub user_id: String,
    pub name: String,
    pub picture_url: String,
    pub information_url: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub can_left: bool,
    pub meta_data: JsonValue,
    pub last_message: String,
    pub last_message_updated: i64,
    pub message_count: i64,
    pub created: i64,
    pub modified: i64,
    #[serde(skip)]
    pub deleted: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<MiniUser>>,
}

impl Room {
    pub fn new(
        room_id: impl Into<String>,
        owner: impl Into<String>,
        room_type: RoomType,
        now: i64,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: owner.into(),
            name: String::new(),
            picture_url: String::new(),
            information_url: String::new(),
            room_type,
            can_left: room_type != RoomType::OneOnOne,
            meta_data: JsonValue::Object(Default::default()),
            last_message: String::new(),
            last_message_updated: 0,
            message_count: 0,
            created: now,
            modified: now,
            deleted: 0,
            users: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.deleted == 0
    }
}

/// A room as seen from one member, carrying that member's RoomUser columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomForUser {
    pub room_id: String,
    pub user_id: String,
    pub name: String,
    pub picture_url: String,
    pub information_url: String,
    pub meta_data: JsonValue,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub last_message: String,
    pub last_message_updated: i64,
    pub can_left: bool,
    pub created: i64,
    pub modified: i64,
    pub ru_unread_count: i64,
    pub ru_meta_data: JsonValue,
    pub ru_created: i64,
    pub ru_modified: i64,
    pub users: Vec<MiniUser>,
}

/// Membership of a user in a room, keyed by (room_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub room_id: String,
    pub user_id: String,
    pub unread_count: i64,
    pub display: bool,
    pub meta_data: JsonValue,
    pub created: i64,
    pub modified: i64,
}

impl RoomUser {
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>, now: i64) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            unread_count: 0,
            display: true,
            meta_data: JsonValue::Object(Default::default()),
            created: now,
            modified: now,
        }
    }
}

/// Directional block: `user_id` blocks `block_user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUser {
    pub user_id: String,
    pub block_user_id: String,
    pub created: i64,
}

impl BlockUser {
    pub fn new(user_id: impl Into<String>, block_user_id: impl Into<String>, now: i64) -> Self {
        Self {
            user_id: user_id.into(),
            block_user_id: block_user_id.into(),
            created: now,
        }
    }
}

/// Push-notification endpoint, one per (user_id, platform).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub user_id: String,
    pub platform: i32,
    pub token: String,
    pub notification_device_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub user_id: String,
    pub role_id: i32,
}

/// Append-only server setting; the newest non-expired row is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: i64,
    pub values: JsonValue,
    /// 0 means the setting never expires.
    pub expired: i64,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub room_id: String,
    pub user_id: String,
    pub platform: i32,
    pub notification_subscription_id: String,
    pub created: i64,
    pub deleted: i64,
}
