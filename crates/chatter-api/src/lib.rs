pub mod blocks;
pub mod devices;
pub mod error;
pub mod middleware;
pub mod rooms;
pub mod setting;
pub mod state;
pub mod users;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// All REST routes. Everything except user registration and the setting
/// lookup requires a bearer token plus the `X-Sub-User-Id` header.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/users", post(users::create_user))
        .route("/setting", get(setting::get_setting))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route(
            "/users/{user_id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/users/{user_id}/contacts", get(users::get_contacts))
        .route(
            "/users/{user_id}/roles",
            get(users::get_roles).put(users::put_roles).delete(users::delete_roles),
        )
        .route(
            "/users/{user_id}/blocks",
            get(blocks::get_blocks).put(blocks::put_blocks).delete(blocks::delete_blocks),
        )
        .route("/users/{user_id}/blocked", get(blocks::get_blocked))
        .route("/users/{user_id}/devices", get(devices::list_devices))
        .route(
            "/users/{user_id}/devices/{platform}",
            get(devices::get_device)
                .put(devices::put_device)
                .delete(devices::delete_device),
        )
        .route("/rooms", post(rooms::create_room).get(rooms::list_rooms))
        .route(
            "/rooms/{room_id}",
            get(rooms::get_room).put(rooms::update_room).delete(rooms::delete_room),
        )
        .route(
            "/rooms/{room_id}/users",
            put(rooms::put_room_users).delete(rooms::delete_room_users),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
