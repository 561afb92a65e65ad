#![allow(dead_code)]

use async_trait::async_trait;
use safepass::error::FunctionError;
use safepass::models::{Student, Transportation};
use safepass::notifications::{
    AllergyNotification, AttendanceNotification, AuthOperation, CsvProcessed, CsvUpload,
    RemoteFunctions,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Remote functions double that records every call.
#[derive(Default)]
pub struct RecordingFunctions {
    pub allergy: Mutex<Vec<AllergyNotification>>,
    pub attendance: Mutex<Vec<AttendanceNotification>>,
    pub auth: Mutex<Vec<AuthOperation>>,
    pub fail: AtomicBool,
}

impl RecordingFunctions {
    pub fn failing() -> Self {
        let f = Self::default();
        f.fail.store(true, Ordering::SeqCst);
        f
    }

    pub fn allergy_calls(&self) -> Vec<AllergyNotification> {
        self.allergy.lock().unwrap().clone()
    }

    pub fn attendance_calls(&self) -> Vec<AttendanceNotification> {
        self.attendance.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<(), FunctionError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(FunctionError("503 Service Unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteFunctions for RecordingFunctions {
    async fn allergy_notification(&self, payload: &AllergyNotification) -> Result<(), FunctionError> {
        self.allergy.lock().unwrap().push(payload.clone());
        self.outcome()
    }

    async fn attendance_notification(
        &self,
        payload: &AttendanceNotification,
    ) -> Result<(), FunctionError> {
        self.attendance.lock().unwrap().push(payload.clone());
        self.outcome()
    }

    async fn process_csv(&self, payload: &CsvUpload) -> Result<CsvProcessed, FunctionError> {
        self.outcome()?;
        Ok(CsvProcessed {
            processed: payload.csv_data.lines().count().saturating_sub(1),
            errors: Vec::new(),
        })
    }

    async fn auth_operation(&self, payload: &AuthOperation) -> Result<serde_json::Value, FunctionError> {
        self.auth.lock().unwrap().push(payload.clone());
        self.outcome()?;
        Ok(serde_json::Value::Null)
    }
}

pub fn student(id: &str, name: &str, allergies: &[&str]) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        grade: "3rd".to_string(),
        emergency_contact: "Pat Parent".to_string(),
        emergency_phone: "555-0100".to_string(),
        parent_email: Some("parent@example.com".to_string()),
        parent_phone: Some("555-0111".to_string()),
        allergies: allergies.iter().map(|a| a.to_string()).collect(),
        medical_notes: String::new(),
        transportation: Transportation::Bus,
        bus_route: Some("Route 1".to_string()),
        teacher_name: None,
        classroom_number: None,
        custom_fields: Default::default(),
    }
}
