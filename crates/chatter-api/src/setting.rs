use axum::{Json, extract::State};

use chatter_db::SettingStore;
use chatter_types::models::Setting;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// The newest setting that has not expired.
pub async fn get_setting(State(state): State<AppState>) -> Result<Json<Setting>, ApiError> {
    let setting = run_blocking(&state, |provider, ctx| Ok(provider.select_latest_setting(ctx)?))
        .await?
        .ok_or(ApiError::NotFound("setting"))?;
    Ok(Json(setting))
}
