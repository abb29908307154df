use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Deserialize;
use uuid::Uuid;

use chatter_db::{Direction, Filter, UserExpansions, UserRoleStore, UserStore};
use chatter_types::api::{
    CreateUserRequest, CreateUserResponse, RoleIdsResponse, UpdateUserRequest, UserRolesRequest,
    UsersResponse,
};
use chatter_types::models::{User, UserRole};
use chatter_types::unix_now;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::{AppState, run_blocking};

const ACCESS_TOKEN_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

impl PageQuery {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(1..=100).contains(&self.limit) || self.offset < 0 {
            return Err(ApiError::invalid("limit must be 1..=100 and offset non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpandQuery {
    #[serde(default)]
    pub rooms: bool,
    #[serde(default)]
    pub devices: bool,
    #[serde(default)]
    pub blocks: bool,
}

fn generate_access_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid("name is required"));
    }
    let user_id = req.user_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    if user_id.is_empty() {
        return Err(ApiError::invalid("userId must not be empty"));
    }

    let mut user = User::new(user_id, req.name, unix_now());
    user.picture_url = req.picture_url.unwrap_or_default();
    user.information_url = req.information_url.unwrap_or_default();
    if let Some(meta_data) = req.meta_data {
        user.meta_data = meta_data;
    }
    user.is_bot = req.is_bot.unwrap_or(false);
    user.is_public = req.is_public.unwrap_or(false);
    user.is_show_users = req.is_show_users.unwrap_or(true);
    user.can_block = req.can_block.unwrap_or(true);
    user.access_token = generate_access_token();
    if !req.role_ids.is_empty() {
        user.roles = Some(req.role_ids);
    }

    let user = run_blocking(&state, move |provider, ctx| Ok(provider.insert_user(ctx, &user)?)).await?;
    let access_token = user.access_token.clone();

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse { user, access_token }),
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Extension(_auth): Extension<AuthUser>,
) -> Result<Json<UsersResponse>, ApiError> {
    page.validate()?;
    let users = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_users(
            ctx,
            &[
                Filter::ordering("created", Direction::Asc),
                Filter::ordering("user_id", Direction::Asc),
                Filter::paging(page.limit, page.offset),
            ],
        )?)
    })
    .await?;
    Ok(Json(UsersResponse { users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(expand): Query<ExpandQuery>,
    Extension(_auth): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    let expand = UserExpansions {
        rooms: expand.rooms,
        devices: expand.devices,
        blocks: expand.blocks,
        roles: false,
    };
    let user = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_user(ctx, &user_id, expand)?)
    })
    .await?
    .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    auth.ensure_self(&user_id)?;
    if matches!(&req.name, Some(name) if name.trim().is_empty()) {
        return Err(ApiError::invalid("name must not be empty"));
    }
    if matches!(req.unread_count, Some(n) if n < 0) {
        return Err(ApiError::invalid("unreadCount must not be negative"));
    }

    let user = run_blocking(&state, move |provider, ctx| {
        let mut user = provider
            .select_user(ctx, &user_id, UserExpansions::default())?
            .ok_or(ApiError::NotFound("user"))?;
        if let Some(name) = req.name {
            user.name = name;
        }
        if let Some(picture_url) = req.picture_url {
            user.picture_url = picture_url;
        }
        if let Some(information_url) = req.information_url {
            user.information_url = information_url;
        }
        if let Some(meta_data) = req.meta_data {
            user.meta_data = meta_data;
        }
        if let Some(is_public) = req.is_public {
            user.is_public = is_public;
        }
        if let Some(is_show_users) = req.is_show_users {
            user.is_show_users = is_show_users;
        }
        if let Some(can_block) = req.can_block {
            user.can_block = can_block;
        }
        if let Some(unread_count) = req.unread_count {
            user.unread_count = unread_count;
        }
        user.modified = unix_now();
        provider.update_user(ctx, &user)?;
        Ok(user)
    })
    .await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    auth.ensure_self(&user_id)?;
    run_blocking(&state, move |provider, ctx| {
        provider
            .select_user(ctx, &user_id, UserExpansions::default())?
            .ok_or(ApiError::NotFound("user"))?;
        Ok(provider.update_user_deleted(ctx, &user_id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_contacts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UsersResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    let users = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_contacts(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(UsersResponse { users }))
}

pub async fn get_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(_auth): Extension<AuthUser>,
) -> Result<Json<RoleIdsResponse>, ApiError> {
    let role_ids = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_role_ids_of_user_role(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(RoleIdsResponse { role_ids }))
}

pub async fn put_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UserRolesRequest>,
) -> Result<Json<RoleIdsResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    if req.role_ids.is_empty() {
        return Err(ApiError::invalid("roleIds must not be empty"));
    }

    let role_ids = run_blocking(&state, move |provider, ctx| {
        provider
            .select_user(ctx, &user_id, UserExpansions::default())?
            .ok_or(ApiError::NotFound("user"))?;
        let rows: Vec<UserRole> = req
            .role_ids
            .iter()
            .map(|&role_id| UserRole {
                user_id: user_id.clone(),
                role_id,
            })
            .collect();
        provider.insert_user_roles(ctx, &rows)?;
        Ok(provider.select_role_ids_of_user_role(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(RoleIdsResponse { role_ids }))
}

pub async fn delete_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UserRolesRequest>,
) -> Result<Json<RoleIdsResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    if req.role_ids.is_empty() {
        return Err(ApiError::invalid("roleIds must not be empty"));
    }

    let role_ids = run_blocking(&state, move |provider, ctx| {
        provider.delete_user_roles(
            ctx,
            &[
                Filter::by_equality("user_id", user_id.as_str()),
                Filter::by_ids("role_id", req.role_ids.iter().map(|id| id.to_string())),
            ],
        )?;
        Ok(provider.select_role_ids_of_user_role(ctx, &user_id)?)
    })
    .await?;
    Ok(Json(RoleIdsResponse { role_ids }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_tokens_are_alphanumeric_and_distinct() {
        let a = generate_access_token();
        let b = generate_access_token();
        assert_eq!(a.len(), ACCESS_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_page_query_bounds() {
        assert!(PageQuery { limit: 10, offset: 0 }.validate().is_ok());
        assert!(PageQuery { limit: 0, offset: 0 }.validate().is_err());
        assert!(PageQuery { limit: 101, offset: 0 }.validate().is_err());
        assert!(PageQuery { limit: 10, offset: -1 }.validate().is_err());
    }
}
