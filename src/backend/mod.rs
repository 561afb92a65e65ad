//! Persistence seam. Every table the service reads or writes goes through [`Backend`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::{NewScanEvent, ScanEvent, ScheduleEntry, Student, User};

pub mod memory;
pub mod sea;

pub use memory::MemoryBackend;
pub use sea::SeaOrmBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// All students ordered by name.
    async fn list_students(&self) -> Result<Vec<Student>, BackendError>;
    async fn insert_student(&self, student: Student) -> Result<Student, BackendError>;
    /// `Ok(None)` when no student has that id.
    async fn update_student(&self, student: Student) -> Result<Option<Student>, BackendError>;
    async fn delete_student(&self, id: &str) -> Result<bool, BackendError>;

    /// All scan events, newest first.
    async fn list_scan_events(&self) -> Result<Vec<ScanEvent>, BackendError>;
    async fn insert_scan_event(&self, event: NewScanEvent) -> Result<ScanEvent, BackendError>;

    async fn list_users(&self) -> Result<Vec<User>, BackendError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, BackendError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, BackendError>;
    async fn insert_user(&self, user: User) -> Result<User, BackendError>;
    async fn update_user(&self, user: User) -> Result<Option<User>, BackendError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, BackendError>;

    async fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>, BackendError>;
    async fn store_setting(&self, key: &str, value: serde_json::Value) -> Result<(), BackendError>;

    async fn insert_schedule_entries(&self, entries: Vec<ScheduleEntry>) -> Result<usize, BackendError>;
}
