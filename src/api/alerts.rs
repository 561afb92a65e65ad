use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

use super::middleware::CurrentUser;
use crate::access::{require, Capability};
use crate::alerts;
use crate::error::ApiError;
use crate::state::AppState;

// GET /alerts
pub async fn list_alerts(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Alerts)?;

    let clock = state.clock().await?;
    let (students, scans) = state.cache.snapshot().await;
    let mut derived = alerts::derive_alerts(&students, &scans, &clock, chrono::Utc::now().naive_utc());
    state.resolved_alerts.apply(&mut derived).await;

    Ok((StatusCode::OK, Json(derived)).into_response())
}

// POST /alerts/:id/resolve
pub async fn resolve_alert(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(alert_id): Path<String>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Alerts)?;

    let clock = state.clock().await?;
    let (students, scans) = state.cache.snapshot().await;
    let current = alerts::derive_alerts(&students, &scans, &clock, chrono::Utc::now().naive_utc());
    if !current.iter().any(|a| a.id == alert_id) {
        return Err(ApiError::NotFound("Alert not found".to_string()));
    }
    state.resolved_alerts.resolve(&alert_id).await;

    tracing::Span::current()
        .record("action", "resolve_alert")
        .record("business_event", "Alert resolved");

    Ok((StatusCode::OK, Json(json!({"status": "resolved"}))).into_response())
}

// GET /alerts/unscanned
pub async fn list_unscanned(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Alerts)?;

    let clock = state.clock().await?;
    let (students, scans) = state.cache.snapshot().await;
    let unscanned =
        alerts::unscanned_students(&students, &scans, &clock, chrono::Utc::now().naive_utc());

    Ok((StatusCode::OK, Json(unscanned)).into_response())
}

// POST /alerts/unscanned/:student_id/notify
pub async fn notify_unscanned(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(student_id): Path<String>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Alerts)?;

    let settings = state.settings().await?;
    let clock = state.clock().await?;
    let student = state
        .cache
        .student(&student_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    let scans = state.cache.scan_logs().await;

    let sent = alerts::notify_unscanned(
        &student,
        &scans,
        &clock,
        chrono::Utc::now().naive_utc(),
        state.functions.as_ref(),
        &settings.notification_settings,
    )
    .await?;

    tracing::Span::current()
        .record("action", "notify_unscanned")
        .record("student_id", student.id.as_str())
        .record(
            "business_event",
            if sent {
                "Parent notified"
            } else {
                "Notification skipped"
            },
        );

    Ok((StatusCode::OK, Json(json!({"sent": sent}))).into_response())
}

// GET /alerts/allergy
pub async fn active_allergy_alerts(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Scan)?;
    let active = state
        .allergy_board
        .active(chrono::Utc::now().naive_utc())
        .await;
    Ok((StatusCode::OK, Json(active)).into_response())
}

// POST /alerts/allergy/:id/acknowledge
pub async fn acknowledge_allergy_alert(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Scan)?;
    if !state.allergy_board.acknowledge(id).await {
        return Err(ApiError::NotFound("Alert not found".to_string()));
    }
    Ok((StatusCode::OK, Json(json!({"status": "acknowledged"}))).into_response())
}
