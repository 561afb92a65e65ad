use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub grade: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub parent_email: Option<String>,
    pub parent_phone: Option<String>,
    pub allergies: Json,
    #[sea_orm(column_type = "Text")]
    pub medical_notes: String,
    pub transportation_status: String,
    pub bus_route: Option<String>,
    pub teacher_name: Option<String>,
    pub classroom_number: Option<String>,
    pub custom_fields: Json,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scan_event::Entity")]
    ScanEvent,
    #[sea_orm(has_many = "super::schedule_entry::Entity")]
    ScheduleEntry,
}

impl Related<super::scan_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScanEvent.def()
    }
}

impl Related<super::schedule_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduleEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
