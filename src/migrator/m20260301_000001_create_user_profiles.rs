use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfiles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserProfiles::Name).string().not_null())
                    .col(
                        ColumnDef::new(UserProfiles::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::Phone)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(UserProfiles::Role).string().not_null())
                    .col(
                        ColumnDef::new(UserProfiles::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(UserProfiles::SchoolId).string())
                    .col(ColumnDef::new(UserProfiles::BusId).string())
                    .col(ColumnDef::new(UserProfiles::PasswordHash).string().not_null())
                    .col(ColumnDef::new(UserProfiles::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(UserProfiles::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_profiles_status")
                    .table(UserProfiles::Table)
                    .col(UserProfiles::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Role,
    Status,
    SchoolId,
    BusId,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}
