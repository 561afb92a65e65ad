use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Staff role. Decides which operations a user can reach, see [`crate::access`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Driver,
    Monitor,
    Nurse,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Teacher,
        Role::Driver,
        Role::Monitor,
        Role::Nurse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Driver => "driver",
            Role::Monitor => "monitor",
            Role::Nurse => "nurse",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Approved,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Approved => "approved",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(UserStatus::Pending),
            "approved" => Ok(UserStatus::Approved),
            "suspended" => Ok(UserStatus::Suspended),
            other => Err(format!("Unknown user status: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transportation {
    Bus,
    Pickup,
    Walker,
}

impl Transportation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transportation::Bus => "bus",
            Transportation::Pickup => "pickup",
            Transportation::Walker => "walker",
        }
    }
}

impl FromStr for Transportation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bus" => Ok(Transportation::Bus),
            "pickup" => Ok(Transportation::Pickup),
            "walker" => Ok(Transportation::Walker),
            other => Err(format!("Unknown transportation status: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    In,
    Out,
}

impl ScanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanAction::In => "in",
            ScanAction::Out => "out",
        }
    }
}

impl FromStr for ScanAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(ScanAction::In),
            "out" => Ok(ScanAction::Out),
            other => Err(format!("Unknown scan action: {}", other)),
        }
    }
}

/// Scanner locations offered to staff.
pub const SCAN_LOCATIONS: [&str; 6] = [
    "Bus #1",
    "Bus #2",
    "Classroom 101",
    "Classroom 205",
    "Main Entrance",
    "Cafeteria",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub status: UserStatus,
    pub school_id: Option<String>,
    pub bus_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn is_approved(&self) -> bool {
        self.status == UserStatus::Approved
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub parent_email: Option<String>,
    pub parent_phone: Option<String>,
    pub allergies: Vec<String>,
    pub medical_notes: String,
    pub transportation: Transportation,
    pub bus_route: Option<String>,
    pub teacher_name: Option<String>,
    pub classroom_number: Option<String>,
    #[serde(default)]
    pub custom_fields: serde_json::Map<String, serde_json::Value>,
}

impl Student {
    pub fn has_allergies(&self) -> bool {
        !self.allergies.is_empty()
    }

    pub fn is_walker(&self) -> bool {
        self.transportation == Transportation::Walker
    }
}

/// Append-only record of a check-in or check-out. Timestamps are UTC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: Uuid,
    pub student_id: String,
    pub location: String,
    pub action: ScanAction,
    pub timestamp: NaiveDateTime,
    pub scanned_by: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewScanEvent {
    pub student_id: String,
    pub location: String,
    pub action: ScanAction,
    pub timestamp: NaiveDateTime,
    pub scanned_by: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub student_id: String,
    pub period: String,
    pub subject: String,
    pub room: String,
    pub teacher: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Nurse".parse::<Role>(), Ok(Role::Nurse));
        assert_eq!(" admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("staff".parse::<Role>().is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = chrono::Utc::now().naive_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@school.test".into(),
            phone: String::new(),
            role: Role::Teacher,
            status: UserStatus::Approved,
            school_id: None,
            bus_id: None,
            password_hash: "secret-hash".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"teacher\""));
    }
}
