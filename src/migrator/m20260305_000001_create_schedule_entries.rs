use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScheduleEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScheduleEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScheduleEntries::StudentId).string().not_null())
                    .col(ColumnDef::new(ScheduleEntries::Period).string().not_null())
                    .col(ColumnDef::new(ScheduleEntries::Subject).string().not_null())
                    .col(ColumnDef::new(ScheduleEntries::Room).string().not_null())
                    .col(
                        ColumnDef::new(ScheduleEntries::Teacher)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(ScheduleEntries::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_schedule_entries_student")
                            .from(ScheduleEntries::Table, ScheduleEntries::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_schedule_entries_student_id")
                    .table(ScheduleEntries::Table)
                    .col(ScheduleEntries::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScheduleEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScheduleEntries {
    Table,
    Id,
    StudentId,
    Period,
    Subject,
    Room,
    Teacher,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
}
