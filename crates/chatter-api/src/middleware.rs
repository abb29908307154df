use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use chatter_db::UserStore;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// Header naming the user the bearer token belongs to.
pub const SUB_USER_ID: &str = "x-sub-user-id";

/// The caller, as verified by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl AuthUser {
    /// Rejects requests acting on another user's resources.
    pub fn ensure_self(&self, user_id: &str) -> Result<(), ApiError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

fn credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())?;
    let user_id = headers
        .get(SUB_USER_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|u| !u.is_empty())?;
    Some((user_id.to_string(), token.to_string()))
}

/// Resolve the bearer token and sub user id to a live user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (user_id, token) = credentials(req.headers()).ok_or(ApiError::Unauthorized)?;

    let user = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_user_by_user_id_and_access_token(ctx, &user_id, &token)?)
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(AuthUser {
        user_id: user.user_id,
    });
    Ok(next.run(req).await)
}
