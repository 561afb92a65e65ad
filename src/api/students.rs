use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::middleware::CurrentUser;
use crate::access::{require, Capability};
use crate::csv_import::next_student_id;
use crate::error::ApiError;
use crate::models::{ScanEvent, Student, Transportation};
use crate::settings::DEFAULT_PROFILE_FIELDS;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct StudentQuery {
    grade: Option<String>,
    search: Option<String>,
}

#[derive(Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    id: Option<String>,
    name: String,
    grade: String,
    #[serde(default)]
    emergency_contact: String,
    #[serde(default)]
    emergency_phone: String,
    #[serde(default)]
    parent_email: Option<String>,
    #[serde(default)]
    parent_phone: Option<String>,
    #[serde(default)]
    allergies: Vec<String>,
    #[serde(default)]
    medical_notes: String,
    #[serde(default = "default_transportation")]
    transportation: Transportation,
    #[serde(default)]
    bus_route: Option<String>,
    #[serde(default)]
    teacher_name: Option<String>,
    #[serde(default)]
    classroom_number: Option<String>,
    #[serde(default)]
    custom_fields: serde_json::Map<String, serde_json::Value>,
}

fn default_transportation() -> Transportation {
    Transportation::Walker
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl StudentForm {
    /// Checks required fields and that custom fields are configured profile fields.
    fn into_student(self, id: String, profile_fields: &[String]) -> Result<Student, ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Student name is required".to_string()));
        }
        if self.grade.trim().is_empty() {
            return Err(ApiError::Validation("Grade is required".to_string()));
        }
        if let Some(unknown) = self.custom_fields.keys().find(|k| {
            DEFAULT_PROFILE_FIELDS.contains(&k.as_str()) || !profile_fields.contains(k)
        }) {
            return Err(ApiError::Validation(format!(
                "Unknown profile field: {}",
                unknown
            )));
        }

        Ok(Student {
            id,
            name: self.name.trim().to_string(),
            grade: self.grade.trim().to_string(),
            emergency_contact: self.emergency_contact.trim().to_string(),
            emergency_phone: self.emergency_phone.trim().to_string(),
            parent_email: non_empty(self.parent_email),
            parent_phone: non_empty(self.parent_phone),
            allergies: self
                .allergies
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            medical_notes: self.medical_notes.trim().to_string(),
            transportation: self.transportation,
            bus_route: non_empty(self.bus_route),
            teacher_name: non_empty(self.teacher_name),
            classroom_number: non_empty(self.classroom_number),
            custom_fields: self.custom_fields,
        })
    }
}

pub async fn list_students(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<StudentQuery>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Roster)?;

    let needle = query.search.unwrap_or_default().trim().to_lowercase();
    let students: Vec<Student> = state
        .cache
        .students()
        .await
        .into_iter()
        .filter(|s| match query.grade.as_deref() {
            None | Some("all") => true,
            Some(g) => s.grade == g,
        })
        .filter(|s| {
            needle.is_empty()
                || s.name.to_lowercase().contains(&needle)
                || s.id.to_lowercase().contains(&needle)
        })
        .collect();

    Ok((StatusCode::OK, Json(students)).into_response())
}

pub async fn get_student(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Roster)?;

    let student = state
        .cache
        .student(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    let scans: Vec<ScanEvent> = state
        .cache
        .scan_logs()
        .await
        .into_iter()
        .filter(|e| e.student_id == id)
        .collect();

    Ok((StatusCode::OK, Json(json!({"student": student, "scans": scans}))).into_response())
}

pub async fn create_student(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(form): Json<StudentForm>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageStudents)?;

    let profile_fields = state.settings().await?.student_profile_fields;
    let id = match non_empty(form.id.clone()) {
        Some(id) => id,
        None => next_student_id(&state.cache.students().await).ok_or_else(|| {
            ApiError::Validation("No student ids left; enter one explicitly".to_string())
        })?,
    };
    let student = form.into_student(id, &profile_fields)?;
    let student = state.cache.add_student(student).await.map_err(|e| match e {
        crate::error::BackendError::Conflict(_) => {
            ApiError::Conflict("A student with this ID already exists".to_string())
        }
        other => other.into(),
    })?;

    tracing::Span::current()
        .record("table", "students")
        .record("action", "create_student")
        .record("student_id", student.id.as_str())
        .record("business_event", "Student added");

    Ok((StatusCode::CREATED, Json(student)).into_response())
}

pub async fn update_student(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(form): Json<StudentForm>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageStudents)?;

    let profile_fields = state.settings().await?.student_profile_fields;
    let student = form.into_student(id, &profile_fields)?;
    let updated = state
        .cache
        .update_student(student)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    tracing::Span::current()
        .record("table", "students")
        .record("action", "update_student")
        .record("student_id", updated.id.as_str());

    Ok((StatusCode::OK, Json(updated)).into_response())
}

pub async fn delete_student(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require(&user, Capability::ManageStudents)?;

    if !state.cache.remove_student(&id).await? {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    tracing::Span::current()
        .record("table", "students")
        .record("action", "delete_student")
        .record("student_id", id.as_str())
        .record("business_event", "Student removed");

    Ok((StatusCode::OK, Json(json!({"status": "deleted"}))).into_response())
}

/// Reloads the roster and scan log from the backend.
pub async fn refresh(
    Extension(state): Extension<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    require(&user, Capability::Roster)?;
    state.cache.refresh().await?;
    Ok((StatusCode::OK, Json(json!({"status": "refreshed"}))).into_response())
}
