use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use chatter_db::{DeviceStore, Filter, UserExpansions, UserStore};
use chatter_types::api::{DevicesResponse, PutDeviceRequest};
use chatter_types::models::{Device, PLATFORM_ANDROID, PLATFORM_IOS};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::{AppState, run_blocking};

fn check_platform(platform: i32) -> Result<i32, ApiError> {
    match platform {
        PLATFORM_IOS | PLATFORM_ANDROID => Ok(platform),
        other => Err(ApiError::invalid(format!("unknown platform {}", other))),
    }
}

pub async fn list_devices(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DevicesResponse>, ApiError> {
    auth.ensure_self(&user_id)?;
    let devices = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_devices(ctx, &[Filter::by_equality("user_id", user_id)])?)
    })
    .await?;
    Ok(Json(DevicesResponse { devices }))
}

pub async fn get_device(
    State(state): State<AppState>,
    Path((user_id, platform)): Path<(String, i32)>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Device>, ApiError> {
    auth.ensure_self(&user_id)?;
    let platform = check_platform(platform)?;
    let device = run_blocking(&state, move |provider, ctx| {
        Ok(provider.select_device(ctx, &user_id, platform)?)
    })
    .await?
    .ok_or(ApiError::NotFound("device"))?;
    Ok(Json(device))
}

/// Registers the device, or replaces the token of an existing one.
pub async fn put_device(
    State(state): State<AppState>,
    Path((user_id, platform)): Path<(String, i32)>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<PutDeviceRequest>,
) -> Result<Json<Device>, ApiError> {
    auth.ensure_self(&user_id)?;
    let platform = check_platform(platform)?;
    if req.token.is_empty() {
        return Err(ApiError::invalid("token is required"));
    }

    let device = run_blocking(&state, move |provider, ctx| {
        provider
            .select_user(ctx, &user_id, UserExpansions::default())?
            .ok_or(ApiError::NotFound("user"))?;

        let existing = provider.select_device(ctx, &user_id, platform)?;
        let device = Device {
            user_id,
            platform,
            token: req.token,
            notification_device_id: req.notification_device_id.unwrap_or_default(),
        };
        match existing {
            Some(current) if current == device => Ok(device),
            Some(_) => {
                provider.update_device(ctx, &device)?;
                Ok(device)
            }
            None => Ok(provider.insert_device(ctx, &device)?),
        }
    })
    .await?;
    Ok(Json(device))
}

pub async fn delete_device(
    State(state): State<AppState>,
    Path((user_id, platform)): Path<(String, i32)>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    auth.ensure_self(&user_id)?;
    let platform = check_platform(platform)?;
    run_blocking(&state, move |provider, ctx| {
        provider
            .select_device(ctx, &user_id, platform)?
            .ok_or(ApiError::NotFound("device"))?;
        Ok(provider.delete_device(ctx, &user_id, platform)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_known_platforms_are_accepted() {
        assert_eq!(check_platform(PLATFORM_IOS).unwrap(), 1);
        assert_eq!(check_platform(PLATFORM_ANDROID).unwrap(), 2);
        assert!(check_platform(3).is_err());
    }
}
