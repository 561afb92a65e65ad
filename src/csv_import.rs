//! Bulk CSV import of students and class schedules.
//!
//! Files are split naively on commas (no quoting), the first line is a header.

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::cache::DomainCache;
use crate::error::ApiError;
use crate::models::{ScheduleEntry, Student, Transportation};

pub const STUDENT_TEMPLATE: &str = "name,grade,emergency_contact,allergies,transportation_status\n\
Jane Doe,3rd,Mary Doe (555-0100),Peanuts;Latex,bus\n\
John Roe,5th,Rick Roe (555-0101),,walker\n";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: Vec<String>,
}

fn data_rows(csv: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    csv.lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.split(',').map(str::trim).collect()))
}

/// Highest numeric suffix among `STU###` ids.
fn max_student_number<'a>(ids: impl Iterator<Item = &'a str>) -> u32 {
    ids.filter_map(|id| id.strip_prefix("STU"))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

pub fn student_id(n: u32) -> String {
    format!("STU{:03}", n)
}

const IDS_EXHAUSTED: &str = "No student ids left after STU4294967295";

/// `None` once the numeric range is used up.
pub fn next_student_id(existing: &[Student]) -> Option<String> {
    max_student_number(existing.iter().map(|s| s.id.as_str()))
        .checked_add(1)
        .map(student_id)
}

/// Columns: name, grade, emergency contact, `;`-separated allergies, transportation.
/// Missing transportation means walker. Ids continue after the highest existing one.
pub fn parse_students(csv: &str, existing: &[Student]) -> (Vec<Student>, Vec<String>) {
    let mut next = max_student_number(existing.iter().map(|s| s.id.as_str()));
    let mut students = Vec::new();
    let mut errors = Vec::new();

    for (line_no, fields) in data_rows(csv) {
        let field = |i: usize| fields.get(i).copied().unwrap_or("");

        let name = field(0);
        if name.is_empty() {
            errors.push(format!("Line {}: missing student name", line_no));
            continue;
        }

        let transportation = match field(4) {
            "" => Transportation::Walker,
            raw => match raw.parse::<Transportation>() {
                Ok(t) => t,
                Err(e) => {
                    errors.push(format!("Line {}: {}", line_no, e));
                    continue;
                }
            },
        };

        let Some(n) = next.checked_add(1) else {
            errors.push(format!("Line {}: {}", line_no, IDS_EXHAUSTED));
            continue;
        };
        next = n;
        students.push(Student {
            id: student_id(next),
            name: name.to_string(),
            grade: field(1).to_string(),
            emergency_contact: field(2).to_string(),
            emergency_phone: String::new(),
            parent_email: None,
            parent_phone: None,
            allergies: field(3)
                .split(';')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect(),
            medical_notes: String::new(),
            transportation,
            bus_route: None,
            teacher_name: None,
            classroom_number: None,
            custom_fields: Default::default(),
        });
    }

    (students, errors)
}

/// Columns: student id, period, subject, room, teacher. Rows with fewer than four
/// fields are skipped.
pub fn parse_schedule(csv: &str) -> Vec<ScheduleEntry> {
    data_rows(csv)
        .filter(|(_, fields)| fields.len() >= 4)
        .map(|(_, fields)| ScheduleEntry {
            student_id: fields[0].to_string(),
            period: fields[1].to_string(),
            subject: fields[2].to_string(),
            room: fields[3].to_string(),
            teacher: fields.get(4).copied().unwrap_or("").to_string(),
        })
        .collect()
}

/// Adds each parsed student through the cache. A row the backend rejects is
/// reported and the rest still go in.
pub async fn import_students(cache: &DomainCache, csv: &str) -> Result<ImportSummary, ApiError> {
    let existing = cache.students().await;
    let (students, mut errors) = parse_students(csv, &existing);
    if students.is_empty() && errors.is_empty() {
        return Err(ApiError::Validation("The CSV file has no student rows".to_string()));
    }

    let mut imported = 0;
    for student in students {
        let id = student.id.clone();
        match cache.add_student(student).await {
            Ok(_) => imported += 1,
            Err(e) => {
                warn!("Import of {} failed: {}", id, e);
                errors.push(format!("{}: {}", id, e));
            }
        }
    }

    info!("Imported {} students ({} errors)", imported, errors.len());
    Ok(ImportSummary { imported, errors })
}

/// Rows naming a student that isn't on the roster are reported and left out.
pub async fn import_schedule(
    cache: &DomainCache,
    backend: &dyn Backend,
    csv: &str,
) -> Result<ImportSummary, ApiError> {
    let parsed = parse_schedule(csv);
    if parsed.is_empty() {
        return Err(ApiError::Validation("The CSV file has no schedule rows".to_string()));
    }

    let roster = cache.students().await;
    let (entries, unknown): (Vec<ScheduleEntry>, Vec<ScheduleEntry>) = parsed
        .into_iter()
        .partition(|e| roster.iter().any(|s| s.id == e.student_id));
    let errors: Vec<String> = unknown
        .iter()
        .map(|e| format!("{}: unknown student", e.student_id))
        .collect();

    let imported = backend.insert_schedule_entries(entries).await?;
    info!("Imported {} schedule entries ({} skipped)", imported, errors.len());
    Ok(ImportSummary { imported, errors })
}
