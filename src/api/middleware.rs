use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::Cookies;
use tracing::field::display;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::User;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// The signed-in user, inserted by [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[derive(Clone, Copy, Debug)]
pub struct SessionToken(pub Uuid);

pub async fn auth_middleware(
    Extension(state): Extension<AppState>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let token = cookies
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<Uuid>().ok());

    if let Some(token) = token {
        match state.sessions.current(state.backend.as_ref(), token).await {
            Ok(Some(user)) => {
                tracing::Span::current().record("user_id", display(user.id));
                request.extensions_mut().insert(CurrentUser(user));
                request.extensions_mut().insert(SessionToken(token));
                return next.run(request).await;
            }
            Ok(None) => {}
            Err(e) => return e.into_response(),
        }
    }
    ApiError::Unauthorized("Unauthorized".to_string()).into_response()
}
