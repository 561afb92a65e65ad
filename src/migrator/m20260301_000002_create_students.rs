use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Students::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Students::Name).string().not_null())
                    .col(ColumnDef::new(Students::Grade).string().not_null())
                    .col(
                        ColumnDef::new(Students::EmergencyContact)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Students::EmergencyPhone)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Students::ParentEmail).string())
                    .col(ColumnDef::new(Students::ParentPhone).string())
                    .col(ColumnDef::new(Students::Allergies).json_binary().not_null())
                    .col(
                        ColumnDef::new(Students::MedicalNotes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Students::TransportationStatus)
                            .string()
                            .not_null()
                            .default("walker"),
                    )
                    .col(ColumnDef::new(Students::BusRoute).string())
                    .col(ColumnDef::new(Students::TeacherName).string())
                    .col(ColumnDef::new(Students::ClassroomNumber).string())
                    .col(ColumnDef::new(Students::CustomFields).json_binary().not_null())
                    .col(ColumnDef::new(Students::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Students::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_students_name")
                    .table(Students::Table)
                    .col(Students::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    Name,
    Grade,
    EmergencyContact,
    EmergencyPhone,
    ParentEmail,
    ParentPhone,
    Allergies,
    MedicalNotes,
    TransportationStatus,
    BusRoute,
    TeacherName,
    ClassroomNumber,
    CustomFields,
    CreatedAt,
    UpdatedAt,
}
