//! Scan submission: validate, record, and raise the allergy alert when needed.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::DomainCache;
use crate::error::ApiError;
use crate::models::{NewScanEvent, ScanAction, ScanEvent, User, SCAN_LOCATIONS};
use crate::notifications::{AllergyNotification, RemoteFunctions};
use crate::settings::NotificationSettings;

/// How long an allergy alert stays on screen unless acknowledged first.
pub const ALLERGY_ALERT_TIMEOUT_SECS: i64 = 10;

#[derive(Clone, Debug, Deserialize)]
pub struct ScanRequest {
    pub student_id: String,
    pub location: String,
    pub action: ScanAction,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllergyAlert {
    pub id: Uuid,
    pub student_id: String,
    pub student_name: String,
    pub allergies: Vec<String>,
    pub location: String,
    pub scanned_by: String,
    pub raised_at: NaiveDateTime,
    pub dismiss_at: NaiveDateTime,
}

/// Allergy alerts currently shown to staff.
#[derive(Default)]
pub struct AllergyBoard {
    alerts: RwLock<Vec<AllergyAlert>>,
}

impl AllergyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn raise(&self, alert: AllergyAlert) {
        self.alerts.write().await.push(alert);
    }

    /// Unacknowledged alerts not yet past their dismiss time. Expired ones are dropped.
    pub async fn active(&self, now: NaiveDateTime) -> Vec<AllergyAlert> {
        let mut alerts = self.alerts.write().await;
        alerts.retain(|a| a.dismiss_at > now);
        alerts.clone()
    }

    pub async fn acknowledge(&self, id: Uuid) -> bool {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| a.id != id);
        alerts.len() != before
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScanOutcome {
    pub event: ScanEvent,
    pub allergy_alert: Option<AllergyAlert>,
    /// `false` when the allergy notification failed or was switched off.
    pub nurse_notified: bool,
}

fn validate(request: &ScanRequest) -> Result<(String, String), ApiError> {
    let student_id = request.student_id.trim();
    if student_id.is_empty() {
        return Err(ApiError::Validation("Please enter a student ID".to_string()));
    }
    let location = request.location.trim();
    if location.is_empty() {
        return Err(ApiError::Validation("Please select a scan location".to_string()));
    }
    if !SCAN_LOCATIONS.contains(&location) {
        return Err(ApiError::Validation(format!("Unknown scan location: {}", location)));
    }
    Ok((student_id.to_string(), location.to_string()))
}

pub fn utc_rfc3339(ts: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc).to_rfc3339()
}

/// Records one scan by `actor`.
///
/// A student with allergies gets exactly one alert on the board and exactly one
/// `allergy-notification` call. A failed notification never undoes the scan.
pub async fn submit_scan(
    cache: &DomainCache,
    functions: &dyn RemoteFunctions,
    board: &AllergyBoard,
    channels: &NotificationSettings,
    actor: &User,
    request: ScanRequest,
    now: NaiveDateTime,
) -> Result<ScanOutcome, ApiError> {
    let (student_id, location) = validate(&request)?;

    let student = cache
        .student(&student_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let event = cache
        .add_scan_log(NewScanEvent {
            student_id: student.id.clone(),
            location: location.clone(),
            action: request.action,
            timestamp: now,
            scanned_by: actor.name.clone(),
            notes: request.notes.filter(|n| !n.trim().is_empty()),
        })
        .await
        .map_err(|e| {
            warn!("Scan for {} not recorded: {}", student.id, e);
            ApiError::from(e)
        })?;

    crate::metrics::increment_scans(event.action, &event.location);
    info!(
        "{} scanned {} at {} by {}",
        student.name,
        event.action.as_str(),
        event.location,
        event.scanned_by
    );

    if !student.has_allergies() {
        return Ok(ScanOutcome {
            event,
            allergy_alert: None,
            nurse_notified: false,
        });
    }

    let alert = AllergyAlert {
        id: Uuid::new_v4(),
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        allergies: student.allergies.clone(),
        location: event.location.clone(),
        scanned_by: event.scanned_by.clone(),
        raised_at: event.timestamp,
        dismiss_at: event.timestamp + Duration::seconds(ALLERGY_ALERT_TIMEOUT_SECS),
    };
    board.raise(alert.clone()).await;
    crate::metrics::increment_allergy_alerts(&event.location);

    let nurse_notified = if channels.any_enabled() {
        let payload = AllergyNotification {
            student_name: student.name.clone(),
            allergies: student.allergies.clone(),
            location: event.location.clone(),
            scanned_by: event.scanned_by.clone(),
            timestamp: utc_rfc3339(event.timestamp),
        };
        match functions.allergy_notification(&payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Allergy notification for {} failed: {}", student.id, e);
                false
            }
        }
    } else {
        info!(
            "All notification channels disabled, allergy notification for {} skipped",
            student.id
        );
        false
    };

    Ok(ScanOutcome {
        event,
        allergy_alert: Some(alert),
        nurse_notified,
    })
}
