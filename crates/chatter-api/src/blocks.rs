use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use chatter_db::{BlockUserStore, Context, InsertPolicy, Provider, UserExpansions, UserStore};
use chatter_types::api::{BlockUsersResponse, BlockedUsersResponse, UserIdsRequest};
use chatter_types::models::BlockUser;
use chatter_types::unix_now;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::{AppState, run_blocking};

/// Fails unless every id names a live user.
pub(crate) fn confirm_users_exist(
    provider: &Provider,
    ctx: &Context,
    user_ids: &[String],
) -> Result<(), ApiError> {
    let found: HashSet<String> = provider
        .select_user_ids_by_user_ids(ctx, user_ids)?
        .into_iter()
        .collect();
    let missing: Vec<&str> = user_ids
        .iter()
        .filter(|id| !found.contains(*id))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::invalid(format!("unknown user ids: {}", missing.join(", "))))
    }
}

pub async fn get_blocks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<BlockUsersResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    let block_users = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_block_users(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(BlockUsersResponse { block_users }))
}

pub async fn put_blocks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UserIdsRequest>,
) -> Result<Json<BlockUsersResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    if req.user_ids.is_empty() {
        return Err(ApiError::invalid("userIds must not be empty"));
    }
    if req.user_ids.contains(&user_id) {
        return Err(ApiError::invalid("a user cannot block themselves"));
    }

    let block_users = run_blocking(&state, move |provider, ctx| {
        provider
            .select_user(ctx, &user_id, UserExpansions::default())?
            .ok_or(ApiError::NotFound("user"))?;
        confirm_users_exist(provider, ctx, &req.user_ids)?;

        let now = unix_now();
        let rows: Vec<BlockUser> = req
            .user_ids
            .iter()
            .map(|target| BlockUser::new(user_id.as_str(), target.as_str(), now))
            .collect();
        let policy = if req.replace {
            InsertPolicy::CleanThenInsert
        } else {
            InsertPolicy::DedupeOnInsert
        };
        provider.insert_block_users(ctx, &rows, policy)?;
        Ok(provider.select_block_users(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(BlockUsersResponse { block_users }))
}

/// Removes the listed targets from the caller's block list. Blocks by
/// other users, and the caller's remaining blocks, are left untouched.
pub async fn delete_blocks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UserIdsRequest>,
) -> Result<Json<BlockUsersResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    if req.user_ids.is_empty() {
        return Err(ApiError::invalid("userIds must not be empty"));
    }

    let block_users = run_blocking(&state, move |provider, ctx| {
        provider.delete_blocks_of_user(ctx, &user_id, &req.user_ids)?;
        Ok(provider.select_block_users(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(BlockUsersResponse { block_users }))
}

pub async fn get_blocked(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<BlockedUsersResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    let blocked_users = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_blocked_users(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(BlockedUsersResponse { blocked_users }))
}
