pub mod alerts;
pub mod auth;
pub mod import;
pub mod middleware;
pub mod reports;
pub mod scans;
pub mod settings;
pub mod students;
pub mod users;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Extension, Router,
};

use crate::state::AppState;

async fn health_check() -> &'static str {
    "OK"
}

pub(crate) fn csv_attachment(filename: String, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// Every API route. The binary adds tracing, CORS and metrics layers on top.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/refresh", post(students::refresh))
        .route(
            "/students",
            get(students::list_students).post(students::create_student),
        )
        .route(
            "/students/:id",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route("/scans", get(scans::history).post(scans::submit_scan))
        .route("/scans/export", get(scans::export_history))
        .route("/scans/locations", get(scans::locations))
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/:id/resolve", post(alerts::resolve_alert))
        .route("/alerts/unscanned", get(alerts::list_unscanned))
        .route(
            "/alerts/unscanned/:student_id/notify",
            post(alerts::notify_unscanned),
        )
        .route("/alerts/allergy", get(alerts::active_allergy_alerts))
        .route(
            "/alerts/allergy/:id/acknowledge",
            post(alerts::acknowledge_allergy_alert),
        )
        .route("/tracker", get(reports::live_tracker))
        .route("/reports/attendance", get(reports::attendance))
        .route("/reports/attendance/export", get(reports::export_attendance))
        .route("/reports/analytics", get(reports::analytics))
        .route("/settings", get(settings::get_settings))
        .route("/settings/thresholds", put(settings::update_thresholds))
        .route("/settings/notifications", put(settings::update_notifications))
        .route("/settings/profile-fields", post(settings::add_profile_field))
        .route(
            "/settings/profile-fields/:name",
            delete(settings::remove_profile_field),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", delete(users::delete_user))
        .route("/users/:id/role", patch(users::update_role))
        .route("/users/:id/status", patch(users::update_status))
        .route("/users/:id/approve", post(users::approve_user))
        .route("/import/students", post(import::import_students))
        .route("/import/students/template", get(import::student_template))
        .route("/import/schedule", post(import::import_schedule))
        .route("/import/csv", post(import::process_remote))
        .route_layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(Extension(state))
        .layer(tower_cookies::CookieManagerLayer::new())
}
