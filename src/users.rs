//! Admin user management.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::models::{Role, User, UserStatus};
use crate::session::{email_conflict, hash_password, validate_account_fields};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub status: Option<UserStatus>,
    #[serde(default)]
    pub school_id: Option<String>,
    #[serde(default)]
    pub bus_id: Option<String>,
}

pub async fn list(backend: &dyn Backend) -> Result<Vec<User>, ApiError> {
    Ok(backend.list_users().await?)
}

/// Admin-created accounts are approved unless a status is given.
pub async fn create(backend: &dyn Backend, form: CreateUser) -> Result<User, ApiError> {
    validate_account_fields(&form.name, &form.email, &form.password)?;

    let now = chrono::Utc::now().naive_utc();
    let user = User {
        id: Uuid::new_v4(),
        name: form.name.trim().to_string(),
        email: form.email.trim().to_lowercase(),
        phone: form.phone.trim().to_string(),
        role: form.role,
        status: form.status.unwrap_or(UserStatus::Approved),
        school_id: form.school_id,
        bus_id: form.bus_id,
        password_hash: hash_password(&form.password)?,
        created_at: now,
        updated_at: now,
    };
    let user = backend.insert_user(user).await.map_err(email_conflict)?;
    crate::metrics::increment_users_total();
    info!("User {} created as {}", user.email, user.role);
    Ok(user)
}

async fn modify<F>(backend: &dyn Backend, id: Uuid, change: F) -> Result<User, ApiError>
where
    F: FnOnce(&mut User),
{
    let mut user = backend
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    change(&mut user);
    user.updated_at = chrono::Utc::now().naive_utc();
    backend
        .update_user(user)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn update_role(backend: &dyn Backend, id: Uuid, role: Role) -> Result<User, ApiError> {
    let user = modify(backend, id, |u| u.role = role).await?;
    info!("User {} is now {}", user.email, role);
    Ok(user)
}

pub async fn update_status(
    backend: &dyn Backend,
    id: Uuid,
    status: UserStatus,
) -> Result<User, ApiError> {
    let user = modify(backend, id, |u| u.status = status).await?;
    info!("User {} is now {}", user.email, status.as_str());
    Ok(user)
}

pub async fn approve(backend: &dyn Backend, id: Uuid) -> Result<User, ApiError> {
    update_status(backend, id, UserStatus::Approved).await
}

pub async fn delete(backend: &dyn Backend, actor: &User, id: Uuid) -> Result<(), ApiError> {
    if actor.id == id {
        return Err(ApiError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    if !backend.delete_user(id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    crate::metrics::decrement_users_total();
    info!("User {} deleted by {}", id, actor.email);
    Ok(())
}
