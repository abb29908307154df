use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::{Device, MiniUser, Room, RoomType, User};

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Generated when absent.
    pub user_id: Option<String>,
    pub name: String,
    pub picture_url: Option<String>,
    pub information_url: Option<String>,
    pub meta_data: Option<JsonValue>,
    pub is_bot: Option<bool>,
    pub is_public: Option<bool>,
    pub is_show_users: Option<bool>,
    pub can_block: Option<bool>,
    #[serde(default)]
    pub role_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    #[serde(flatten)]
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub picture_url: Option<String>,
    pub information_url: Option<String>,
    pub meta_data: Option<JsonValue>,
    pub is_public: Option<bool>,
    pub is_show_users: Option<bool>,
    pub can_block: Option<bool>,
    pub unread_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

/// Body shared by the block-list and room-member endpoints.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UserIdsRequest {
    pub user_ids: Vec<String>,
    /// Replace the whole existing set instead of adding to it.
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUsersResponse {
    pub block_users: Vec<MiniUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedUsersResponse {
    pub blocked_users: Vec<MiniUser>,
}

// -- Devices --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PutDeviceRequest {
    pub token: String,
    pub notification_device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

// -- Roles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UserRolesRequest {
    pub role_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleIdsResponse {
    pub role_ids: Vec<i32>,
}

// -- Rooms --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub room_id: Option<String>,
    pub user_id: String,
    pub name: Option<String>,
    pub picture_url: Option<String>,
    pub information_url: Option<String>,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub can_left: Option<bool>,
    pub meta_data: Option<JsonValue>,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateRoomRequest {
    pub name: Option<String>,
    pub picture_url: Option<String>,
    pub information_url: Option<String>,
    pub meta_data: Option<JsonValue>,
    pub can_left: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsResponse {
    pub rooms: Vec<Room>,
    pub all_count: i64,
    pub limit: i64,
    pub offset: i64,
}
