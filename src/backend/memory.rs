use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Backend;
use crate::error::BackendError;
use crate::models::{NewScanEvent, ScanEvent, ScheduleEntry, Student, User};

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    scans: Vec<ScanEvent>,
    users: Vec<User>,
    settings: HashMap<String, serde_json::Value>,
    schedule: Vec<ScheduleEntry>,
}

/// In-process tables with the same contract as the Postgres backend.
///
/// `fail_writes` makes every write return a database error, which lets callers
/// check that nothing local changes when the remote write fails.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    pub fail_writes: AtomicBool,
    pub read_calls: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_students(students: Vec<Student>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                students,
                ..Tables::default()
            }),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn schedule_entries(&self) -> Vec<ScheduleEntry> {
        self.tables.lock().await.schedule.clone()
    }

    /// Writes a scan straight into the table, bypassing any cache, the way another
    /// client of the same database would.
    pub async fn push_external_scan(&self, event: ScanEvent) {
        self.tables.lock().await.scans.push(event);
    }

    fn check_write(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Database("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list_students(&self) -> Result<Vec<Student>, BackendError> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        let mut students = self.tables.lock().await.students.clone();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }

    async fn insert_student(&self, student: Student) -> Result<Student, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        if t.students.iter().any(|s| s.id == student.id) {
            return Err(BackendError::Conflict(format!(
                "student {} already exists",
                student.id
            )));
        }
        t.students.push(student.clone());
        Ok(student)
    }

    async fn update_student(&self, student: Student) -> Result<Option<Student>, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        match t.students.iter_mut().find(|s| s.id == student.id) {
            Some(existing) => {
                *existing = student.clone();
                Ok(Some(student))
            }
            None => Ok(None),
        }
    }

    async fn delete_student(&self, id: &str) -> Result<bool, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        let before = t.students.len();
        t.students.retain(|s| s.id != id);
        let removed = t.students.len() != before;
        if removed {
            t.scans.retain(|e| e.student_id != id);
            t.schedule.retain(|e| e.student_id != id);
        }
        Ok(removed)
    }

    async fn list_scan_events(&self) -> Result<Vec<ScanEvent>, BackendError> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        let mut scans = self.tables.lock().await.scans.clone();
        scans.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(scans)
    }

    async fn insert_scan_event(&self, event: NewScanEvent) -> Result<ScanEvent, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        if !t.students.iter().any(|s| s.id == event.student_id) {
            return Err(BackendError::Database(format!(
                "scan_events.student_id {} violates foreign key",
                event.student_id
            )));
        }
        let stored = ScanEvent {
            id: Uuid::new_v4(),
            student_id: event.student_id,
            location: event.location,
            action: event.action,
            timestamp: event.timestamp,
            scanned_by: event.scanned_by,
            notes: event.notes,
        };
        t.scans.push(stored.clone());
        Ok(stored)
    }

    async fn list_users(&self) -> Result<Vec<User>, BackendError> {
        let mut users = self.tables.lock().await.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, BackendError> {
        let email = email.to_lowercase();
        Ok(self
            .tables
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: User) -> Result<User, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(BackendError::Conflict(format!(
                "duplicate key value violates unique constraint: email {}",
                user.email
            )));
        }
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<Option<User>, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        match t.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = User { created_at, ..user };
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        Ok(t.users.len() != before)
    }

    async fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>, BackendError> {
        Ok(self.tables.lock().await.settings.get(key).cloned())
    }

    async fn store_setting(&self, key: &str, value: serde_json::Value) -> Result<(), BackendError> {
        self.check_write()?;
        self.tables
            .lock()
            .await
            .settings
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn insert_schedule_entries(&self, entries: Vec<ScheduleEntry>) -> Result<usize, BackendError> {
        self.check_write()?;
        let mut t = self.tables.lock().await;
        let count = entries.len();
        t.schedule.extend(entries);
        Ok(count)
    }
}
