use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::middleware::CurrentUser;
use crate::access::{require, Capability};
use crate::error::ApiError;
use crate::models::SCAN_LOCATIONS;
use crate::reports::{self, HistoryQuery};
use crate::scan::{self, ScanRequest};
use crate::state::AppState;

pub async fn submit_scan(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<ScanRequest>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Scan)?;

    let channels = state.settings().await?.notification_settings;
    let outcome = scan::submit_scan(
        &state.cache,
        state.functions.as_ref(),
        &state.allergy_board,
        &channels,
        &user,
        request,
        chrono::Utc::now().naive_utc(),
    )
    .await?;

    let span = tracing::Span::current();
    span.record("table", "scan_events")
        .record("action", outcome.event.action.as_str())
        .record("student_id", outcome.event.student_id.as_str());
    if outcome.allergy_alert.is_some() {
        span.record("business_event", "Allergy alert raised");
    } else {
        span.record("business_event", "Scan recorded");
    }

    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

pub async fn locations(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Scan)?;
    Ok((StatusCode::OK, Json(SCAN_LOCATIONS)).into_response())
}

pub async fn history(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Reports)?;

    let clock = state.clock().await?;
    let date = query
        .date
        .unwrap_or_else(|| clock.local_date(chrono::Utc::now().naive_utc()));
    let (students, scans) = state.cache.snapshot().await;
    let rows = reports::scan_history(&students, &scans, &clock, date, &query);

    Ok((StatusCode::OK, Json(rows)).into_response())
}

pub async fn export_history(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Reports)?;

    let clock = state.clock().await?;
    let date = query
        .date
        .unwrap_or_else(|| clock.local_date(chrono::Utc::now().naive_utc()));
    let (students, scans) = state.cache.snapshot().await;
    let rows = reports::scan_history(&students, &scans, &clock, date, &query);

    Ok(super::csv_attachment(
        format!("scan-history-{}.csv", date),
        reports::history_csv(&rows, &clock),
    ))
}
