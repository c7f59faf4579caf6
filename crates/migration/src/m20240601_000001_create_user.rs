//! Create `user` table.
//!
//! One row per account; role decides which visitors the account sees.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Email, 255).unique_key().not_null())
                    .col(string_len(User::Name, 128).not_null())
                    .col(string_len(User::Role, 16).not_null())
                    .col(string_len(User::PhoneNumber, 16).not_null())
                    .col(ColumnDef::new(User::Apartment).string_len(32).null())
                    .col(ColumnDef::new(User::ResidentId).string_len(16).null())
                    .col(ColumnDef::new(User::SocietyId).string_len(64).null())
                    .col(ColumnDef::new(User::ImageUrl).text().null())
                    .col(boolean(User::EmailVerified).default(false).not_null())
                    .col(ColumnDef::new(User::VerificationToken).string_len(64).null())
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Email,
    Name,
    Role,
    PhoneNumber,
    Apartment,
    ResidentId,
    SocietyId,
    ImageUrl,
    EmailVerified,
    VerificationToken,
    CreatedAt,
    UpdatedAt,
}
