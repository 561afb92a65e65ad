use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::middleware::CurrentUser;
use crate::access::{require, Capability};
use crate::clock::SchoolClock;
use crate::error::ApiError;
use crate::reports;
use crate::state::AppState;
use crate::tracker;

#[derive(Deserialize)]
pub struct DateQuery {
    date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct TrackerQuery {
    grade: Option<String>,
}

fn selected_date(query: &DateQuery, clock: &SchoolClock) -> NaiveDate {
    query
        .date
        .unwrap_or_else(|| clock.local_date(chrono::Utc::now().naive_utc()))
}

// GET /tracker
pub async fn live_tracker(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<TrackerQuery>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Tracker)?;

    let clock = state.clock().await?;
    let (students, scans) = state.cache.snapshot().await;
    let board = tracker::live_board(
        &students,
        &scans,
        &clock,
        chrono::Utc::now().naive_utc(),
        query.grade.as_deref(),
    );
    Ok((StatusCode::OK, Json(board)).into_response())
}

// GET /reports/attendance
pub async fn attendance(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<DateQuery>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Reports)?;

    let clock = state.clock().await?;
    let (students, scans) = state.cache.snapshot().await;
    let report = reports::attendance_report(&students, &scans, &clock, selected_date(&query, &clock));
    Ok((StatusCode::OK, Json(report)).into_response())
}

// GET /reports/attendance/export
pub async fn export_attendance(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<DateQuery>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Reports)?;

    let clock = state.clock().await?;
    let date = selected_date(&query, &clock);
    let (students, scans) = state.cache.snapshot().await;
    let report = reports::attendance_report(&students, &scans, &clock, date);

    Ok(super::csv_attachment(
        format!("attendance-report-{}.csv", date),
        reports::attendance_csv(&report),
    ))
}

// GET /reports/analytics
pub async fn analytics(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<DateQuery>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Reports)?;

    let clock = state.clock().await?;
    let (students, scans) = state.cache.snapshot().await;
    let analytics = reports::analytics(&students, &scans, &clock, selected_date(&query, &clock));
    Ok((StatusCode::OK, Json(analytics)).into_response())
}
