//! Admin-managed system settings stored as key → JSON rows in `system_settings`.

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::ApiError;

pub const ALERT_THRESHOLDS_KEY: &str = "alert_thresholds";
pub const NOTIFICATION_SETTINGS_KEY: &str = "notification_settings";
pub const PROFILE_FIELDS_KEY: &str = "student_profile_fields";

/// Profile fields every student has; they can't be removed.
pub const DEFAULT_PROFILE_FIELDS: [&str; 3] = ["name", "student_id", "grade"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Minutes after school start before a student without a morning scan is unscanned.
    pub unscanned_minutes: u32,
    /// Minutes after school start before a first check-in counts as late.
    pub late_arrival_minutes: u32,
    /// Shown and edited on the settings screen only. Alert derivation doesn't
    /// read it; it is validated and stored so existing clients keep their value.
    pub missed_scan_hours: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            unscanned_minutes: 30,
            late_arrival_minutes: 30,
            missed_scan_hours: 2,
        }
    }
}

impl AlertThresholds {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(1..=120).contains(&self.unscanned_minutes) {
            return Err(ApiError::Validation(
                "Unscanned alert must be between 1 and 120 minutes".to_string(),
            ));
        }
        if !(1..=120).contains(&self.late_arrival_minutes) {
            return Err(ApiError::Validation(
                "Late arrival alert must be between 1 and 120 minutes".to_string(),
            ));
        }
        if !(1..=24).contains(&self.missed_scan_hours) {
            return Err(ApiError::Validation(
                "Missed scan alert must be between 1 and 24 hours".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub push_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_enabled: true,
            sms_enabled: true,
            push_enabled: false,
        }
    }
}

impl NotificationSettings {
    pub fn any_enabled(&self) -> bool {
        self.email_enabled || self.sms_enabled || self.push_enabled
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub alert_thresholds: AlertThresholds,
    pub notification_settings: NotificationSettings,
    pub student_profile_fields: Vec<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            alert_thresholds: AlertThresholds::default(),
            notification_settings: NotificationSettings::default(),
            student_profile_fields: DEFAULT_PROFILE_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

async fn load_key<T>(backend: &dyn Backend, key: &str) -> Result<Option<T>, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    match backend.load_setting(key).await? {
        Some(value) => match serde_json::from_value(value) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                // A malformed row falls back to defaults instead of locking admins out.
                tracing::warn!("Ignoring malformed setting {}: {}", key, e);
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

async fn store_key<T: Serialize>(backend: &dyn Backend, key: &str, value: &T) -> Result<(), ApiError> {
    let json = serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))?;
    backend.store_setting(key, json).await?;
    Ok(())
}

pub async fn load(backend: &dyn Backend) -> Result<SystemSettings, ApiError> {
    let defaults = SystemSettings::default();
    Ok(SystemSettings {
        alert_thresholds: load_key(backend, ALERT_THRESHOLDS_KEY)
            .await?
            .unwrap_or(defaults.alert_thresholds),
        notification_settings: load_key(backend, NOTIFICATION_SETTINGS_KEY)
            .await?
            .unwrap_or(defaults.notification_settings),
        student_profile_fields: load_key(backend, PROFILE_FIELDS_KEY)
            .await?
            .unwrap_or(defaults.student_profile_fields),
    })
}

pub async fn update_thresholds(
    backend: &dyn Backend,
    thresholds: AlertThresholds,
) -> Result<AlertThresholds, ApiError> {
    thresholds.validate()?;
    store_key(backend, ALERT_THRESHOLDS_KEY, &thresholds).await?;
    Ok(thresholds)
}

pub async fn update_notifications(
    backend: &dyn Backend,
    notifications: NotificationSettings,
) -> Result<NotificationSettings, ApiError> {
    store_key(backend, NOTIFICATION_SETTINGS_KEY, &notifications).await?;
    Ok(notifications)
}

/// `"Bus Route"` → `"bus_route"`.
pub fn normalize_field_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

pub async fn add_profile_field(backend: &dyn Backend, raw: &str) -> Result<Vec<String>, ApiError> {
    let field = normalize_field_name(raw);
    if field.is_empty() {
        return Err(ApiError::Validation("Field name is required".to_string()));
    }

    let mut fields = load(backend).await?.student_profile_fields;
    if fields.contains(&field) {
        return Err(ApiError::Conflict("This field already exists".to_string()));
    }
    fields.push(field);
    store_key(backend, PROFILE_FIELDS_KEY, &fields).await?;
    Ok(fields)
}

pub async fn remove_profile_field(
    backend: &dyn Backend,
    raw: &str,
) -> Result<Vec<String>, ApiError> {
    let field = normalize_field_name(raw);
    if DEFAULT_PROFILE_FIELDS.contains(&field.as_str()) {
        return Err(ApiError::Validation(
            "This is a required field and cannot be removed".to_string(),
        ));
    }

    let mut fields = load(backend).await?.student_profile_fields;
    let before = fields.len();
    fields.retain(|f| f != &field);
    if fields.len() == before {
        return Err(ApiError::NotFound(format!("Unknown profile field: {}", field)));
    }
    store_key(backend, PROFILE_FIELDS_KEY, &fields).await?;
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_are_snake_cased() {
        assert_eq!(normalize_field_name("  Bus Route "), "bus_route");
        assert_eq!(normalize_field_name("Preferred   Name"), "preferred_name");
        assert_eq!(normalize_field_name("   "), "");
    }

    #[test]
    fn thresholds_are_range_checked() {
        assert!(AlertThresholds::default().validate().is_ok());
        let too_long = AlertThresholds {
            unscanned_minutes: 121,
            ..AlertThresholds::default()
        };
        assert!(matches!(too_long.validate(), Err(ApiError::Validation(_))));
        let zero_hours = AlertThresholds {
            missed_scan_hours: 0,
            ..AlertThresholds::default()
        };
        assert!(zero_hours.validate().is_err());
    }

    #[tokio::test]
    async fn missed_scan_hours_round_trips_through_storage() {
        let backend = crate::backend::MemoryBackend::new();
        let thresholds = AlertThresholds {
            missed_scan_hours: 6,
            ..AlertThresholds::default()
        };
        update_thresholds(&backend, thresholds.clone()).await.unwrap();
        assert_eq!(load(&backend).await.unwrap().alert_thresholds, thresholds);
    }

    #[test]
    fn all_channels_off_disables_notifications() {
        let off = NotificationSettings {
            email_enabled: false,
            sms_enabled: false,
            push_enabled: false,
        };
        assert!(!off.any_enabled());
        assert!(NotificationSettings::default().any_enabled());
    }
}
