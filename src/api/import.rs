use axum::{
    extract::{Extension, Json, Multipart, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::middleware::CurrentUser;
use crate::access::{require, Capability};
use crate::csv_import::{self, STUDENT_TEMPLATE};
use crate::error::ApiError;
use crate::notifications::CsvUpload;
use crate::state::AppState;

const MAX_CSV_BYTES: usize = 5 * 1024 * 1024;

#[derive(serde::Deserialize)]
pub struct CsvKindQuery {
    #[serde(default = "default_kind", rename = "type")]
    kind: String,
}

fn default_kind() -> String {
    "students".to_string()
}

fn is_csv_upload(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    let by_name = file_name.map_or(false, |n| n.to_lowercase().ends_with(".csv"));
    let by_type = content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .map_or(false, |m| {
            m.essence_str() == mime::TEXT_CSV.essence_str()
                || m.essence_str() == mime::TEXT_PLAIN.essence_str()
        });
    by_name || by_type
}

/// Text of the multipart `file` field.
async fn read_csv_field(multipart: &mut Multipart) -> Result<String, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if !is_csv_upload(field.file_name(), field.content_type()) {
            return Err(ApiError::Validation("Please upload a CSV file".to_string()));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if data.len() > MAX_CSV_BYTES {
            return Err(ApiError::Validation("File too large".to_string()));
        }
        return String::from_utf8(data.to_vec())
            .map_err(|_| ApiError::Validation("The CSV file must be UTF-8 text".to_string()));
    }
    Err(ApiError::Validation("No file uploaded".to_string()))
}

// POST /import/students
pub async fn import_students(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    require(&user, Capability::Import)?;

    let csv = read_csv_field(&mut multipart).await?;
    let summary = csv_import::import_students(&state.cache, &csv).await?;

    tracing::Span::current()
        .record("table", "students")
        .record("action", "import_students")
        .record("business_event", "Student CSV imported");

    Ok((StatusCode::OK, Json(summary)).into_response())
}

// POST /import/schedule
pub async fn import_schedule(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    require(&user, Capability::Import)?;

    let csv = read_csv_field(&mut multipart).await?;
    let summary = csv_import::import_schedule(&state.cache, state.backend.as_ref(), &csv).await?;

    tracing::Span::current()
        .record("table", "schedule_entries")
        .record("action", "import_schedule")
        .record("business_event", "Schedule CSV imported");

    Ok((StatusCode::OK, Json(summary)).into_response())
}

// POST /import/csv?type=students
pub async fn process_remote(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<CsvKindQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    require(&user, Capability::Import)?;

    let csv = read_csv_field(&mut multipart).await?;
    let result = state
        .functions
        .process_csv(&CsvUpload {
            csv_data: csv,
            kind: query.kind,
        })
        .await?;

    tracing::Span::current()
        .record("action", "process_csv")
        .record("business_event", "CSV sent to csv-processor");

    Ok((StatusCode::OK, Json(result)).into_response())
}

// GET /import/students/template
pub async fn student_template(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Import)?;
    Ok(super::csv_attachment(
        "student-import-template.csv".to_string(),
        STUDENT_TEMPLATE.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_detection_by_name_or_type() {
        assert!(is_csv_upload(Some("Roster.CSV"), None));
        assert!(is_csv_upload(None, Some("text/csv; charset=utf-8")));
        assert!(is_csv_upload(Some("export"), Some("text/plain")));
        assert!(!is_csv_upload(Some("photo.png"), Some("image/png")));
        assert!(!is_csv_upload(None, None));
    }
}
