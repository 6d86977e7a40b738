//! System settings HTTP handlers

use axum::{extract::State, Json};

use crate::services::settings::{SettingsService, SystemSettings, UpdateSettingsInput};
use crate::error::AppResult;
use crate::AppState;

/// Get the system settings, creating the default row on first read
pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<SystemSettings>> {
    let service = SettingsService::new(state.db.clone());
    let settings = service.get_settings().await?;
    Ok(Json(settings))
}

/// Update the USD to GTQ exchange rate
pub async fn update_settings(
    State(state): State<AppState>,
    Json(input): Json<UpdateSettingsInput>,
) -> AppResult<Json<SystemSettings>> {
    let service = SettingsService::new(state.db.clone());
    let settings = service.update_settings(input).await?;
    Ok(Json(settings))
}
