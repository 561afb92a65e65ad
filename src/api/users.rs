use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::field::display;
use uuid::Uuid;

use super::middleware::CurrentUser;
use crate::access::{require, Capability};
use crate::error::ApiError;
use crate::models::{Role, UserStatus};
use crate::state::AppState;
use crate::users::{self, CreateUser};

#[derive(serde::Deserialize)]
pub struct RoleRequest {
    role: Role,
}

#[derive(serde::Deserialize)]
pub struct StatusRequest {
    status: UserStatus,
}

pub async fn list_users(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageUsers)?;
    let all = users::list(state.backend.as_ref()).await?;
    Ok((StatusCode::OK, Json(all)).into_response())
}

pub async fn create_user(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(form): Json<CreateUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageUsers)?;

    let created = users::create(state.backend.as_ref(), form).await?;
    tracing::Span::current()
        .record("table", "user_profiles")
        .record("action", "create_user")
        .record("business_event", "User created by admin");

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn update_role(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleRequest>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageUsers)?;

    let updated = users::update_role(state.backend.as_ref(), id, payload.role).await?;
    tracing::Span::current()
        .record("table", "user_profiles")
        .record("action", "update_role")
        .record("business_event", display(format!("Role set to {}", updated.role)));

    Ok((StatusCode::OK, Json(updated)).into_response())
}

pub async fn update_status(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageUsers)?;

    let updated = users::update_status(state.backend.as_ref(), id, payload.status).await?;
    tracing::Span::current()
        .record("table", "user_profiles")
        .record("action", "update_status")
        .record("business_event", updated.status.as_str());

    Ok((StatusCode::OK, Json(updated)).into_response())
}

pub async fn approve_user(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageUsers)?;

    let updated = users::approve(state.backend.as_ref(), id).await?;
    tracing::Span::current()
        .record("table", "user_profiles")
        .record("action", "approve_user")
        .record("business_event", "User approved");

    Ok((StatusCode::OK, Json(updated)).into_response())
}

pub async fn delete_user(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageUsers)?;

    users::delete(state.backend.as_ref(), &user, id).await?;
    tracing::Span::current()
        .record("table", "user_profiles")
        .record("action", "delete_user")
        .record("business_event", "User deleted");

    Ok((StatusCode::OK, Json(json!({"status": "deleted"}))).into_response())
}
