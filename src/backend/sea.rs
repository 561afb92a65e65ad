use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::Backend;
use crate::entities::{scan_event, schedule_entry, student, system_setting, user_profile};
use crate::error::BackendError;
use crate::models::{NewScanEvent, ScanEvent, ScheduleEntry, Student, User};

/// Postgres tables through sea-orm.
#[derive(Clone)]
pub struct SeaOrmBackend {
    db: DatabaseConnection,
}

impl SeaOrmBackend {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn corrupt(table: &str, e: String) -> BackendError {
    BackendError::Database(format!("corrupt row in {}: {}", table, e))
}

fn user_from_model(m: user_profile::Model) -> Result<User, BackendError> {
    Ok(User {
        id: m.id,
        role: m.role.parse().map_err(|e| corrupt("user_profiles", e))?,
        status: m.status.parse().map_err(|e| corrupt("user_profiles", e))?,
        name: m.name,
        email: m.email,
        phone: m.phone,
        school_id: m.school_id,
        bus_id: m.bus_id,
        password_hash: m.password_hash,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn student_from_model(m: student::Model) -> Result<Student, BackendError> {
    let allergies: Vec<String> =
        serde_json::from_value(m.allergies).map_err(|e| corrupt("students", e.to_string()))?;
    let custom_fields = match m.custom_fields {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Ok(Student {
        id: m.id,
        name: m.name,
        grade: m.grade,
        emergency_contact: m.emergency_contact,
        emergency_phone: m.emergency_phone,
        parent_email: m.parent_email,
        parent_phone: m.parent_phone,
        allergies,
        medical_notes: m.medical_notes,
        transportation: m
            .transportation_status
            .parse()
            .map_err(|e| corrupt("students", e))?,
        bus_route: m.bus_route,
        teacher_name: m.teacher_name,
        classroom_number: m.classroom_number,
        custom_fields,
    })
}

fn scan_from_model(m: scan_event::Model) -> Result<ScanEvent, BackendError> {
    Ok(ScanEvent {
        id: m.id,
        action: m.action.parse().map_err(|e| corrupt("scan_events", e))?,
        student_id: m.student_id,
        location: m.location,
        timestamp: m.timestamp,
        scanned_by: m.scanned_by,
        notes: m.notes,
    })
}

fn student_active_model(s: Student) -> student::ActiveModel {
    student::ActiveModel {
        id: Set(s.id),
        name: Set(s.name),
        grade: Set(s.grade),
        emergency_contact: Set(s.emergency_contact),
        emergency_phone: Set(s.emergency_phone),
        parent_email: Set(s.parent_email),
        parent_phone: Set(s.parent_phone),
        allergies: Set(serde_json::json!(s.allergies)),
        medical_notes: Set(s.medical_notes),
        transportation_status: Set(s.transportation.as_str().to_string()),
        bus_route: Set(s.bus_route),
        teacher_name: Set(s.teacher_name),
        classroom_number: Set(s.classroom_number),
        custom_fields: Set(serde_json::Value::Object(s.custom_fields)),
        created_at: NotSet,
        updated_at: Set(chrono::Utc::now().naive_utc()),
    }
}

fn user_active_model(u: User) -> user_profile::ActiveModel {
    user_profile::ActiveModel {
        id: Set(u.id),
        name: Set(u.name),
        email: Set(u.email),
        phone: Set(u.phone),
        role: Set(u.role.as_str().to_string()),
        status: Set(u.status.as_str().to_string()),
        school_id: Set(u.school_id),
        bus_id: Set(u.bus_id),
        password_hash: Set(u.password_hash),
        created_at: Set(u.created_at),
        updated_at: Set(u.updated_at),
    }
}

#[async_trait]
impl Backend for SeaOrmBackend {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn list_students(&self) -> Result<Vec<Student>, BackendError> {
        student::Entity::find()
            .order_by_asc(student::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(student_from_model)
            .collect()
    }

    async fn insert_student(&self, s: Student) -> Result<Student, BackendError> {
        let mut active = student_active_model(s);
        active.created_at = Set(chrono::Utc::now().naive_utc());
        student_from_model(active.insert(&self.db).await?)
    }

    async fn update_student(&self, s: Student) -> Result<Option<Student>, BackendError> {
        // `id` stays Set so sea-orm uses it as the WHERE clause.
        match student_active_model(s).update(&self.db).await {
            Ok(m) => student_from_model(m).map(Some),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_student(&self, id: &str) -> Result<bool, BackendError> {
        let res = student::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn list_scan_events(&self) -> Result<Vec<ScanEvent>, BackendError> {
        scan_event::Entity::find()
            .order_by_desc(scan_event::Column::Timestamp)
            .all(&self.db)
            .await?
            .into_iter()
            .map(scan_from_model)
            .collect()
    }

    async fn insert_scan_event(&self, e: NewScanEvent) -> Result<ScanEvent, BackendError> {
        let active = scan_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(e.student_id),
            location: Set(e.location),
            action: Set(e.action.as_str().to_string()),
            timestamp: Set(e.timestamp),
            scanned_by: Set(e.scanned_by),
            notes: Set(e.notes),
        };
        scan_from_model(active.insert(&self.db).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, BackendError> {
        user_profile::Entity::find()
            .order_by_desc(user_profile::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(user_from_model)
            .collect()
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
        user_profile::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(user_from_model)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, BackendError> {
        user_profile::Entity::find()
            .filter(user_profile::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await?
            .map(user_from_model)
            .transpose()
    }

    async fn insert_user(&self, u: User) -> Result<User, BackendError> {
        user_from_model(user_active_model(u).insert(&self.db).await?)
    }

    async fn update_user(&self, u: User) -> Result<Option<User>, BackendError> {
        let mut active = user_active_model(u);
        active.created_at = NotSet;
        match active.update(&self.db).await {
            Ok(m) => user_from_model(m).map(Some),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, BackendError> {
        let res = user_profile::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>, BackendError> {
        Ok(system_setting::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
            .map(|m| m.setting_value))
    }

    async fn store_setting(&self, key: &str, value: serde_json::Value) -> Result<(), BackendError> {
        let now = chrono::Utc::now().naive_utc();
        match system_setting::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
        {
            Some(existing) => {
                let mut active: system_setting::ActiveModel = existing.into();
                active.setting_value = Set(value);
                active.updated_at = Set(now);
                active.update(&self.db).await?;
            }
            None => {
                system_setting::ActiveModel {
                    setting_key: Set(key.to_string()),
                    setting_value: Set(value),
                    updated_at: Set(now),
                }
                .insert(&self.db)
                .await?;
            }
        }
        Ok(())
    }

    async fn insert_schedule_entries(&self, entries: Vec<ScheduleEntry>) -> Result<usize, BackendError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let now = chrono::Utc::now().naive_utc();
        let count = entries.len();
        let models = entries.into_iter().map(|e| schedule_entry::ActiveModel {
            student_id: Set(e.student_id),
            period: Set(e.period),
            subject: Set(e.subject),
            room: Set(e.room),
            teacher: Set(e.teacher),
            created_at: Set(now),
            ..Default::default()
        });
        schedule_entry::Entity::insert_many(models)
            .exec(&self.db)
            .await?;
        Ok(count)
    }
}
