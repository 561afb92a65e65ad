//! Cached roster and scan log shared by every request handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::backend::Backend;
use crate::error::BackendError;
use crate::models::{NewScanEvent, ScanEvent, Student};

/// Published after every change to the cached collections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    ScanLogged { student_id: String },
    StudentsChanged,
    Refreshed,
}

impl CacheEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CacheEvent::ScanLogged { .. } => "scan_logged",
            CacheEvent::StudentsChanged => "students_changed",
            CacheEvent::Refreshed => "refreshed",
        }
    }

    /// Whether the refresher should reload from the backend on this event.
    pub fn needs_reload(&self) -> bool {
        !matches!(self, CacheEvent::Refreshed)
    }
}

/// Students (ordered by name) and scan events (newest first).
///
/// Writes go to the backend first; the cached copy only changes once the backend
/// has accepted them.
pub struct DomainCache {
    backend: Arc<dyn Backend>,
    students: RwLock<Vec<Student>>,
    scans: RwLock<Vec<ScanEvent>>,
    events: broadcast::Sender<CacheEvent>,
    /// Bumped under the write lock by every local mutation.
    generation: AtomicU64,
}

impl DomainCache {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            students: RwLock::new(Vec::new()),
            scans: RwLock::new(Vec::new()),
            events,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Reloads both collections concurrently and replaces the cached copies.
    ///
    /// A snapshot fetched while a local mutation landed is discarded; the
    /// mutation's own event schedules the next reload.
    /// Returns whether the snapshot was installed.
    pub async fn refresh(&self) -> Result<bool, BackendError> {
        let started = self.generation.load(Ordering::SeqCst);
        let (students, scans) = futures::try_join!(
            self.backend.list_students(),
            self.backend.list_scan_events()
        )?;

        let mut cached_students = self.students.write().await;
        let mut cached_scans = self.scans.write().await;
        if self.generation.load(Ordering::SeqCst) != started {
            debug!("Discarding cache refresh that raced a local write");
            return Ok(false);
        }

        debug!(
            "Cache refreshed from {}: {} students, {} scans",
            self.backend.backend_tag(),
            students.len(),
            scans.len()
        );
        crate::metrics::set_students_total(students.len());

        *cached_students = students;
        *cached_scans = scans;
        drop(cached_scans);
        drop(cached_students);
        self.publish(CacheEvent::Refreshed);
        Ok(true)
    }

    pub async fn add_scan_log(&self, event: NewScanEvent) -> Result<ScanEvent, BackendError> {
        let stored = self.backend.insert_scan_event(event).await?;
        {
            let mut scans = self.scans.write().await;
            scans.insert(0, stored.clone());
            self.bump();
        }
        self.publish(CacheEvent::ScanLogged {
            student_id: stored.student_id.clone(),
        });
        Ok(stored)
    }

    pub async fn add_student(&self, student: Student) -> Result<Student, BackendError> {
        let stored = self.backend.insert_student(student).await?;
        let total = {
            let mut students = self.students.write().await;
            students.push(stored.clone());
            self.bump();
            students.len()
        };
        info!("Student {} added", stored.id);
        crate::metrics::set_students_total(total);
        self.publish(CacheEvent::StudentsChanged);
        Ok(stored)
    }

    pub async fn update_student(&self, student: Student) -> Result<Option<Student>, BackendError> {
        let Some(stored) = self.backend.update_student(student).await? else {
            return Ok(None);
        };
        {
            let mut students = self.students.write().await;
            if let Some(existing) = students.iter_mut().find(|s| s.id == stored.id) {
                *existing = stored.clone();
            }
            self.bump();
        }
        self.publish(CacheEvent::StudentsChanged);
        Ok(Some(stored))
    }

    /// Removes the student and, matching the cascading foreign key, their scans.
    pub async fn remove_student(&self, id: &str) -> Result<bool, BackendError> {
        if !self.backend.delete_student(id).await? {
            return Ok(false);
        }
        let total = {
            let mut students = self.students.write().await;
            students.retain(|s| s.id != id);
            self.bump();
            students.len()
        };
        self.scans.write().await.retain(|e| e.student_id != id);
        crate::metrics::set_students_total(total);
        self.publish(CacheEvent::StudentsChanged);
        Ok(true)
    }

    pub async fn students(&self) -> Vec<Student> {
        self.students.read().await.clone()
    }

    pub async fn scan_logs(&self) -> Vec<ScanEvent> {
        self.scans.read().await.clone()
    }

    pub async fn student(&self, id: &str) -> Option<Student> {
        self.students
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Roster and scan log read together.
    pub async fn snapshot(&self) -> (Vec<Student>, Vec<ScanEvent>) {
        let students = self.students.read().await.clone();
        let scans = self.scans.read().await.clone();
        (students, scans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::{ScanAction, Transportation};
    use chrono::NaiveDate;

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            grade: "5th".to_string(),
            emergency_contact: "Parent".to_string(),
            emergency_phone: "555-0101".to_string(),
            parent_email: None,
            parent_phone: None,
            allergies: vec![],
            medical_notes: String::new(),
            transportation: Transportation::Pickup,
            bus_route: None,
            teacher_name: None,
            classroom_number: None,
            custom_fields: Default::default(),
        }
    }

    fn new_scan(student_id: &str, minute: u32) -> NewScanEvent {
        NewScanEvent {
            student_id: student_id.to_string(),
            location: "Main Entrance".to_string(),
            action: ScanAction::In,
            timestamp: NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(7, minute, 0)
                .unwrap(),
            scanned_by: "Monitor User".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn refresh_orders_students_by_name() {
        let backend = Arc::new(MemoryBackend::with_students(vec![
            student("STU002", "Zed"),
            student("STU001", "Amy"),
        ]));
        let cache = DomainCache::new(backend);
        cache.refresh().await.unwrap();
        let names: Vec<String> = cache.students().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    #[tokio::test]
    async fn new_scans_are_prepended() {
        let backend = Arc::new(MemoryBackend::with_students(vec![student("STU001", "Amy")]));
        let cache = DomainCache::new(backend);
        cache.refresh().await.unwrap();
        cache.add_scan_log(new_scan("STU001", 1)).await.unwrap();
        let second = cache.add_scan_log(new_scan("STU001", 2)).await.unwrap();
        let scans = cache.scan_logs().await;
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[0].id, second.id);
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_untouched() {
        let backend = Arc::new(MemoryBackend::with_students(vec![student("STU001", "Amy")]));
        let cache = DomainCache::new(backend.clone());
        cache.refresh().await.unwrap();

        backend.set_fail_writes(true);
        assert!(cache.add_scan_log(new_scan("STU001", 1)).await.is_err());
        assert!(cache.add_student(student("STU002", "Bo")).await.is_err());

        assert!(cache.scan_logs().await.is_empty());
        assert_eq!(cache.students().await.len(), 1);
    }

    #[tokio::test]
    async fn mutations_publish_events() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = DomainCache::new(backend);
        let mut rx = cache.subscribe();

        cache.add_student(student("STU001", "Amy")).await.unwrap();
        cache.add_scan_log(new_scan("STU001", 5)).await.unwrap();
        cache.refresh().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), CacheEvent::StudentsChanged);
        assert_eq!(
            rx.recv().await.unwrap(),
            CacheEvent::ScanLogged {
                student_id: "STU001".to_string()
            }
        );
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Refreshed);
    }

    #[tokio::test]
    async fn removing_a_student_drops_their_scans() {
        let backend = Arc::new(MemoryBackend::with_students(vec![
            student("STU001", "Amy"),
            student("STU002", "Bo"),
        ]));
        let cache = DomainCache::new(backend);
        cache.refresh().await.unwrap();
        cache.add_scan_log(new_scan("STU001", 1)).await.unwrap();
        cache.add_scan_log(new_scan("STU002", 2)).await.unwrap();

        assert!(cache.remove_student("STU001").await.unwrap());
        assert!(!cache.remove_student("STU001").await.unwrap());
        assert!(cache.student("STU001").await.is_none());
        assert!(cache.scan_logs().await.iter().all(|e| e.student_id == "STU002"));
    }
}
