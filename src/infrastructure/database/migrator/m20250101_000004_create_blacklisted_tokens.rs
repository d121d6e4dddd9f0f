//! Create blacklisted_tokens table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlacklistedTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlacklistedTokens::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BlacklistedTokens::Jti)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(BlacklistedTokens::TokenType)
                            .string_len(16)
                            .not_null(),
                    )
                    // Informational only; no foreign key so revocation never
                    // depends on the account still existing.
                    .col(ColumnDef::new(BlacklistedTokens::UserId).integer().null())
                    .col(
                        ColumnDef::new(BlacklistedTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BlacklistedTokens::BlacklistedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Purge task scans by expiry
        manager
            .create_index(
                Index::create()
                    .name("idx_blacklisted_tokens_expires_at")
                    .table(BlacklistedTokens::Table)
                    .col(BlacklistedTokens::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlacklistedTokens::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum BlacklistedTokens {
    Table,
    Id,
    Jti,
    TokenType,
    UserId,
    ExpiresAt,
    BlacklistedAt,
}
