use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};
use tracing::field::display;

use super::middleware::CurrentUser;
use crate::error::ApiError;
use crate::session::{self, SignUpForm, SESSION_COOKIE};
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    email: String,
    password: String,
}

pub async fn login(
    Extension(state): Extension<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let (token, user) = match state
        .sessions
        .login(
            state.backend.as_ref(),
            state.config.demo_logins,
            &payload.email,
            &payload.password,
        )
        .await
    {
        Ok(found) => found,
        Err(e) => {
            tracing::Span::current()
                .record("table", "user_profiles")
                .record("action", "login_failed");
            return Err(e);
        }
    };

    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_max_age(tower_cookies::cookie::time::Duration::seconds(
        i64::try_from(state.sessions.ttl().as_secs()).unwrap_or(i64::MAX),
    ));
    cookies.add(cookie);

    tracing::Span::current()
        .record("table", "user_profiles")
        .record("action", "login")
        .record("user_id", display(user.id))
        .record("business_event", "User logged in");

    Ok((StatusCode::OK, Json(json!({"message": "Login successful", "user": user}))).into_response())
}

pub async fn sign_up(
    Extension(state): Extension<AppState>,
    Json(form): Json<SignUpForm>,
) -> Result<Response, ApiError> {
    let user = session::sign_up(
        state.backend.as_ref(),
        state.functions.as_ref(),
        state.forwards_auth(),
        form,
    )
    .await?;

    tracing::Span::current()
        .record("table", "user_profiles")
        .record("action", "sign_up")
        .record("user_id", display(user.id))
        .record("business_event", "User signed up, pending approval");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created. An administrator must approve it before you can sign in.",
            "user": user,
        })),
    )
        .into_response())
}

pub async fn logout(Extension(state): Extension<AppState>, cookies: Cookies) -> Response {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Ok(token) = cookie.value().parse() {
            state.sessions.logout(token).await;
        }
    }
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    cookies.remove(removal);

    (StatusCode::OK, Json(json!({"message": "Logged out"}))).into_response()
}

/// Returns the account even while it is pending, so clients can show the approval notice.
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Response {
    (StatusCode::OK, Json(user)).into_response()
}
