//! Outbound calls to the remote serverless functions (allergy and attendance
//! notifications, CSV processing, auth operations).

pub mod functions_client;
pub mod templates;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FunctionError;

pub use functions_client::FunctionsClient;
pub use templates::NotificationTemplates;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyNotification {
    pub student_name: String,
    pub allergies: Vec<String>,
    pub location: String,
    pub scanned_by: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceNotification {
    pub student_id: String,
    pub student_name: String,
    pub message: String,
    pub parent_email: Option<String>,
    pub parent_phone: Option<String>,
    /// `morning` or `afternoon`.
    pub notification_type: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvUpload {
    pub csv_data: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvProcessed {
    #[serde(default)]
    pub processed: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOperation {
    pub action: String,
    pub user_data: serde_json::Value,
}

/// The remote functions as black boxes. Production uses [`FunctionsClient`].
#[async_trait]
pub trait RemoteFunctions: Send + Sync {
    async fn allergy_notification(&self, payload: &AllergyNotification) -> Result<(), FunctionError>;
    async fn attendance_notification(
        &self,
        payload: &AttendanceNotification,
    ) -> Result<(), FunctionError>;
    async fn process_csv(&self, payload: &CsvUpload) -> Result<CsvProcessed, FunctionError>;
    async fn auth_operation(&self, payload: &AuthOperation) -> Result<serde_json::Value, FunctionError>;
}
