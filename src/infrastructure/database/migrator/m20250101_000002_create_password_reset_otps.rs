//! Create password_reset_otps table migration

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PasswordResetOtps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PasswordResetOtps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PasswordResetOtps::UserId).integer().not_null())
                    .col(ColumnDef::new(PasswordResetOtps::Code).string_len(6).not_null())
                    .col(
                        ColumnDef::new(PasswordResetOtps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetOtps::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PasswordResetOtps::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_password_reset_otps_user_id")
                            .from(PasswordResetOtps::Table, PasswordResetOtps::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups are always "unused codes of this user"
        manager
            .create_index(
                Index::create()
                    .name("idx_password_reset_otps_user_used")
                    .table(PasswordResetOtps::Table)
                    .col(PasswordResetOtps::UserId)
                    .col(PasswordResetOtps::IsUsed)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PasswordResetOtps::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum PasswordResetOtps {
    Table,
    Id,
    UserId,
    Code,
    CreatedAt,
    ExpiresAt,
    IsUsed,
}
