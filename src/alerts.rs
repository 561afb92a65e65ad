//! Alert and unscanned-student derivation.
//!
//! Derivation is a pure function of the cached roster, the cached scan log and
//! the current instant; it is recomputed wholesale on every request. The only state
//! is [`ResolvedAlerts`], which lives in memory and is never persisted.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::clock::SchoolClock;
use crate::error::ApiError;
use crate::models::{ScanAction, ScanEvent, Student};
use crate::notifications::{AttendanceNotification, NotificationTemplates, RemoteFunctions};
use crate::settings::NotificationSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissedType {
    Morning,
    Afternoon,
}

impl MissedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissedType::Morning => "morning",
            MissedType::Afternoon => "afternoon",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnscannedStudent {
    #[serde(flatten)]
    pub student: Student,
    pub missed_type: MissedType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Allergy,
    MissedScan,
    LateArrival,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub student_id: String,
    pub message: String,
    pub timestamp: NaiveDateTime,
    pub severity: Severity,
    pub resolved: bool,
}

/// Scans belonging to `student_id` on the school-local day `day`.
fn scans_on_day<'a>(
    scans: &'a [ScanEvent],
    student_id: &'a str,
    clock: &'a SchoolClock,
    day: NaiveDate,
) -> impl Iterator<Item = &'a ScanEvent> + 'a {
    scans
        .iter()
        .filter(move |e| e.student_id == student_id && clock.same_local_day(e.timestamp, day))
}

/// Which required scan, if any, `student` is missing at `now`.
///
/// Walkers are never missing. A morning check-in counts only when it happened
/// before noon and no later than the morning cutoff; an afternoon check-out counts
/// when it happened at or after noon.
pub fn missed_scan(
    student: &Student,
    scans: &[ScanEvent],
    clock: &SchoolClock,
    now: NaiveDateTime,
) -> Option<MissedType> {
    if student.is_walker() {
        return None;
    }

    let local_now = clock.local(now);
    let today = local_now.date();

    let mut has_morning = false;
    let mut has_afternoon = false;
    for event in scans_on_day(scans, &student.id, clock, today) {
        let at = clock.local(event.timestamp).time();
        match event.action {
            ScanAction::In if at.hour() < 12 && at <= clock.morning_cutoff => has_morning = true,
            ScanAction::Out if at.hour() >= 12 => has_afternoon = true,
            _ => {}
        }
    }

    if local_now.time() > clock.morning_cutoff && !has_morning {
        Some(MissedType::Morning)
    } else if local_now.time() > clock.afternoon_cutoff && !has_afternoon {
        Some(MissedType::Afternoon)
    } else {
        None
    }
}

/// Students missing a required scan, in roster order.
pub fn unscanned_students(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
    now: NaiveDateTime,
) -> Vec<UnscannedStudent> {
    students
        .iter()
        .filter_map(|student| {
            missed_scan(student, scans, clock, now).map(|missed_type| UnscannedStudent {
                student: student.clone(),
                missed_type,
            })
        })
        .collect()
}

/// Allergy, missed-scan and late-arrival alerts ordered high → medium → low.
///
/// Within one severity alerts keep discovery order (roster order). Ids only depend
/// on the kind, the student and the school day, so the same inputs always produce
/// the same list.
pub fn derive_alerts(
    students: &[Student],
    scans: &[ScanEvent],
    clock: &SchoolClock,
    now: NaiveDateTime,
) -> Vec<Alert> {
    let local_now = clock.local(now);
    let today = local_now.date();
    let mut alerts = Vec::new();

    for student in students {
        let todays: Vec<&ScanEvent> = scans_on_day(scans, &student.id, clock, today).collect();

        if student.has_allergies() {
            let latest_recent = todays
                .iter()
                .filter(|e| now - e.timestamp < Duration::hours(1))
                .map(|e| e.timestamp)
                .max();
            if let Some(ts) = latest_recent {
                alerts.push(Alert {
                    id: format!("allergy-{}-{}", student.id, today),
                    kind: AlertKind::Allergy,
                    student_id: student.id.clone(),
                    message: format!(
                        "{} has allergies: {}. Recently scanned in.",
                        student.name,
                        student.allergies.join(", ")
                    ),
                    timestamp: ts,
                    severity: Severity::High,
                    resolved: false,
                });
            }
        }

        if todays.is_empty() && local_now.time() > clock.school_start {
            alerts.push(Alert {
                id: format!("missed-{}-{}", student.id, today),
                kind: AlertKind::MissedScan,
                student_id: student.id.clone(),
                message: format!("{} has not been scanned in today.", student.name),
                timestamp: now,
                severity: Severity::Medium,
                resolved: false,
            });
        }

        let first_in = todays
            .iter()
            .filter(|e| e.action == ScanAction::In)
            .map(|e| e.timestamp)
            .min();
        if let Some(ts) = first_in {
            let local = clock.local(ts);
            if local.time() > clock.late_cutoff {
                alerts.push(Alert {
                    id: format!("late-{}-{}", student.id, today),
                    kind: AlertKind::LateArrival,
                    student_id: student.id.clone(),
                    message: format!(
                        "{} arrived late at {}.",
                        student.name,
                        local.format("%H:%M:%S")
                    ),
                    timestamp: ts,
                    severity: Severity::Low,
                    resolved: false,
                });
            }
        }
    }

    // sort_by_key is stable
    alerts.sort_by_key(|a| a.severity.rank());
    alerts
}

/// Alerts resolved by staff during this process lifetime.
#[derive(Default)]
pub struct ResolvedAlerts {
    ids: RwLock<HashSet<String>>,
}

impl ResolvedAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(&self, alert_id: &str) -> bool {
        self.ids.write().await.insert(alert_id.to_string())
    }

    pub async fn apply(&self, alerts: &mut [Alert]) {
        let ids = self.ids.read().await;
        for alert in alerts.iter_mut() {
            alert.resolved = ids.contains(&alert.id);
        }
    }
}

/// Sends the parent `attendance-notification` for a student currently missing a scan.
///
/// Returns `false` when every notification channel is switched off and nothing was sent.
pub async fn notify_unscanned(
    student: &Student,
    scans: &[ScanEvent],
    clock: &SchoolClock,
    now: NaiveDateTime,
    functions: &dyn RemoteFunctions,
    channels: &NotificationSettings,
) -> Result<bool, ApiError> {
    let missed = missed_scan(student, scans, clock, now).ok_or_else(|| {
        ApiError::Validation(format!("{} is not missing a scan", student.name))
    })?;

    if !channels.any_enabled() {
        tracing::info!(
            "All notification channels disabled, attendance notification for {} skipped",
            student.id
        );
        return Ok(false);
    }

    let payload = AttendanceNotification {
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        message: NotificationTemplates::unscanned_message(&student.name, missed),
        parent_email: student.parent_email.clone(),
        parent_phone: student.parent_phone.clone(),
        notification_type: missed.as_str().to_string(),
    };
    functions.attendance_notification(&payload).await?;
    Ok(true)
}
