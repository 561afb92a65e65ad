use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScanEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScanEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScanEvents::StudentId).string().not_null())
                    .col(ColumnDef::new(ScanEvents::Location).string().not_null())
                    .col(ColumnDef::new(ScanEvents::Action).string().not_null())
                    .col(ColumnDef::new(ScanEvents::Timestamp).date_time().not_null())
                    .col(ColumnDef::new(ScanEvents::ScannedBy).string().not_null())
                    .col(ColumnDef::new(ScanEvents::Notes).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scan_events_student")
                            .from(ScanEvents::Table, ScanEvents::StudentId)
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
                    .name("idx_scan_events_student_id")
                    .table(ScanEvents::Table)
                    .col(ScanEvents::StudentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scan_events_timestamp")
                    .table(ScanEvents::Table)
                    .col(ScanEvents::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScanEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScanEvents {
    Table,
    Id,
    StudentId,
    Location,
    Action,
    Timestamp,
    ScannedBy,
    Notes,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
}
