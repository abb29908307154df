use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use chatter_db::{Context, Direction, Filter, InsertPolicy, Provider, RoomStore, RoomUserStore};
use chatter_types::api::{CreateRoomRequest, RoomsResponse, UpdateRoomRequest, UserIdsRequest};
use chatter_types::models::{Room, RoomType, RoomUser};
use chatter_types::unix_now;

use crate::blocks::confirm_users_exist;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::{AppState, run_blocking};
use crate::users::PageQuery;

fn room_with_users(provider: &Provider, ctx: &Context, room_id: &str) -> Result<Room, ApiError> {
    let mut room = provider
        .select_room(ctx, room_id)?
        .ok_or(ApiError::NotFound("room"))?;
    room.users = Some(provider.select_users_for_room(ctx, room_id)?);
    Ok(room)
}

/// Loads a live room the caller belongs to. Missing rooms are 404, rooms
/// the caller is not a member of are 403.
fn member_room(
    provider: &Provider,
    ctx: &Context,
    room_id: &str,
    auth: &AuthUser,
) -> Result<Room, ApiError> {
    let room = provider
        .select_room(ctx, room_id)?
        .ok_or(ApiError::NotFound("room"))?;
    provider
        .select_room_user(ctx, room_id, &auth.user_id)?
        .ok_or(ApiError::Forbidden)?;
    Ok(room)
}

/// Owner first, then the requested members in order, without repeats.
fn member_ids(owner: &str, user_ids: &[String]) -> Vec<String> {
    let mut members = vec![owner.to_string()];
    for id in user_ids {
        if !members.contains(id) {
            members.push(id.clone());
        }
    }
    members
}

pub async fn create_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.user_id.is_empty() {
        return Err(ApiError::invalid("userId is required"));
    }
    auth.ensure_self(&req.user_id)?;
    let members = member_ids(&req.user_id, &req.user_ids);
    if req.room_type == RoomType::OneOnOne && members.len() != 2 {
        return Err(ApiError::invalid("a one-on-one room needs exactly one other user"));
    }

    let now = unix_now();
    let mut room = Room::new(
        req.room_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        req.user_id,
        req.room_type,
        now,
    );
    room.name = req.name.unwrap_or_default();
    room.picture_url = req.picture_url.unwrap_or_default();
    room.information_url = req.information_url.unwrap_or_default();
    if let Some(can_left) = req.can_left {
        room.can_left = can_left;
    }
    if let Some(meta_data) = req.meta_data {
        room.meta_data = meta_data;
    }

    let room = run_blocking(&state, move |provider, ctx| {
        confirm_users_exist(provider, ctx, &members)?;
        if room.room_type == RoomType::OneOnOne {
            if let Some(existing) = provider.select_room_user_of_one_on_one(ctx, &members[0], &members[1])? {
                return room_with_users(provider, ctx, &existing.room_id);
            }
        }
        let rows: Vec<RoomUser> = members
            .iter()
            .map(|user_id| RoomUser::new(room.room_id.as_str(), user_id.as_str(), now))
            .collect();
        provider.insert_room(ctx, &room, &rows)?;
        room_with_users(provider, ctx, &room.room_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn list_rooms(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Extension(_auth): Extension<AuthUser>,
) -> Result<Json<RoomsResponse>, ApiError> {
    page.validate()?;
    let (limit, offset) = (page.limit, page.offset);
    let (rooms, all_count) = run_blocking(&state, move |provider, ctx| {
        let filters = [
            Filter::ordering("created", Direction::Desc),
            Filter::ordering("room_id", Direction::Asc),
            Filter::paging(limit, offset),
        ];
        let rooms = provider.select_rooms(ctx, &filters)?;
        let all_count = provider.select_count_rooms(ctx, &filters)?;
        Ok((rooms, all_count))
    })
    .await?;
    Ok(Json(RoomsResponse {
        rooms,
        all_count,
        limit,
        offset,
    }))
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Room>, ApiError> {
    let room = run_blocking(&state, move |provider, ctx| {
        member_room(provider, ctx, &room_id, &auth)?;
        room_with_users(provider, ctx, &room_id)
    })
    .await?;
    Ok(Json(room))
}

pub async fn update_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateRoomRequest>,
) -> Result<Json<Room>, ApiError> {
    let room = run_blocking(&state, move |provider, ctx| {
        let mut room = member_room(provider, ctx, &room_id, &auth)?;
        if let Some(name) = req.name {
            room.name = name;
        }
        if let Some(picture_url) = req.picture_url {
            room.picture_url = picture_url;
        }
        if let Some(information_url) = req.information_url {
            room.information_url = information_url;
        }
        if let Some(meta_data) = req.meta_data {
            room.meta_data = meta_data;
        }
        if let Some(can_left) = req.can_left {
            if room.room_type == RoomType::OneOnOne && can_left {
                return Err(ApiError::invalid("one-on-one rooms cannot be left"));
            }
            room.can_left = can_left;
        }
        room.modified = unix_now();
        provider.update_room(ctx, &room)?;
        room_with_users(provider, ctx, &room_id)
    })
    .await?;
    Ok(Json(room))
}

pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    run_blocking(&state, move |provider, ctx| {
        member_room(provider, ctx, &room_id, &auth)?;
        Ok(provider.update_room_deleted(ctx, &room_id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_room_users(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UserIdsRequest>,
) -> Result<Json<Room>, ApiError> {
    if req.user_ids.is_empty() {
        return Err(ApiError::invalid("userIds must not be empty"));
    }

    let room = run_blocking(&state, move |provider, ctx| {
        let room = member_room(provider, ctx, &room_id, &auth)?;
        if room.room_type == RoomType::OneOnOne {
            return Err(ApiError::invalid("members of a one-on-one room are fixed"));
        }
        confirm_users_exist(provider, ctx, &req.user_ids)?;

        let now = unix_now();
        let rows: Vec<RoomUser> = req
            .user_ids
            .iter()
            .map(|user_id| RoomUser::new(room_id.as_str(), user_id.as_str(), now))
            .collect();
        let policy = if req.replace {
            InsertPolicy::CleanThenInsert
        } else {
            InsertPolicy::DedupeOnInsert
        };
        provider.insert_room_users(ctx, &rows, policy)?;
        room_with_users(provider, ctx, &room_id)
    })
    .await?;
    Ok(Json(room))
}

pub async fn delete_room_users(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UserIdsRequest>,
) -> Result<Json<Room>, ApiError> {
    if req.user_ids.is_empty() {
        return Err(ApiError::invalid("userIds must not be empty"));
    }

    let room = run_blocking(&state, move |provider, ctx| {
        let room = member_room(provider, ctx, &room_id, &auth)?;
        if room.room_type == RoomType::OneOnOne {
            return Err(ApiError::invalid("members of a one-on-one room are fixed"));
        }
        provider.delete_room_users(
            ctx,
            &[
                Filter::by_equality("room_id", room_id.as_str()),
                Filter::by_ids("user_id", req.user_ids),
            ],
        )?;
        room_with_users(provider, ctx, &room_id)
    })
    .await?;
    Ok(Json(room))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_ids_put_the_owner_first_without_repeats() {
        let ids = vec!["bob".to_string(), "alice".to_string(), "bob".to_string()];
        assert_eq!(member_ids("alice", &ids), vec!["alice", "bob"]);
        assert_eq!(member_ids("alice", &[]), vec!["alice"]);
    }
}
