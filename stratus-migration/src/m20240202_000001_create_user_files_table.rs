use sea_orm_migration::prelude::*;

use crate::m20240201_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserFiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserFiles::UserId).integer().not_null())
                    .col(ColumnDef::new(UserFiles::OriginalName).string().not_null())
                    .col(
                        ColumnDef::new(UserFiles::StoredLocation)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserFiles::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(UserFiles::UploadDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(UserFiles::LastDownload).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(UserFiles::Comment)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(UserFiles::ShareToken).uuid().unique_key())
                    .col(ColumnDef::new(UserFiles::ShareExpiry).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_files-user_id")
                            .from(UserFiles::Table, UserFiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on user_id for listings and usage sums
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-user_files-user_id")
                    .table(UserFiles::Table)
                    .col(UserFiles::UserId)
                    .to_owned(),
            )
            .await?;

        // Create index on share_token for anonymous lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-user_files-share_token")
                    .table(UserFiles::Table)
                    .col(UserFiles::ShareToken)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserFiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserFiles {
    Table,
    Id,
    UserId,
    OriginalName,
    StoredLocation,
    Size,
    UploadDate,
    LastDownload,
    Comment,
    ShareToken,
    ShareExpiry,
}
