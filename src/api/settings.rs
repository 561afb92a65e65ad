use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::middleware::CurrentUser;
use crate::access::{require, Capability};
use crate::error::ApiError;
use crate::settings::{self, AlertThresholds, NotificationSettings};
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct ProfileFieldRequest {
    name: String,
}

pub async fn get_settings(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Settings)?;
    Ok((StatusCode::OK, Json(state.settings().await?)).into_response())
}

pub async fn update_thresholds(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(thresholds): Json<AlertThresholds>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Settings)?;

    let saved = settings::update_thresholds(state.backend.as_ref(), thresholds).await?;
    tracing::Span::current()
        .record("table", "system_settings")
        .record("action", "update_alert_thresholds")
        .record("business_event", "Alert thresholds updated");

    Ok((StatusCode::OK, Json(saved)).into_response())
}

pub async fn update_notifications(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(channels): Json<NotificationSettings>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Settings)?;

    let saved = settings::update_notifications(state.backend.as_ref(), channels).await?;
    tracing::Span::current()
        .record("table", "system_settings")
        .record("action", "update_notification_settings");

    Ok((StatusCode::OK, Json(saved)).into_response())
}

pub async fn add_profile_field(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ProfileFieldRequest>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Settings)?;

    let fields = settings::add_profile_field(state.backend.as_ref(), &payload.name).await?;
    tracing::Span::current()
        .record("table", "system_settings")
        .record("action", "add_profile_field");

    Ok((StatusCode::CREATED, Json(json!({"student_profile_fields": fields}))).into_response())
}

pub async fn remove_profile_field(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Settings)?;

    let fields = settings::remove_profile_field(state.backend.as_ref(), &name).await?;
    tracing::Span::current()
        .record("table", "system_settings")
        .record("action", "remove_profile_field");

    Ok((StatusCode::OK, Json(json!({"student_profile_fields": fields}))).into_response())
}
