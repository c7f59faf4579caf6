//! Create `visitor` table.
//!
//! `added_by` and `resident_id` are plain columns, not foreign keys: visitor rows outlive
//! the accounts that logged them until the cleanup endpoint removes them.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Visitor::Table)
                    .if_not_exists()
                    .col(uuid(Visitor::Id).primary_key())
                    .col(string_len(Visitor::Name, 128).not_null())
                    .col(string_len(Visitor::PhoneNumber, 16).not_null())
                    .col(string_len(Visitor::Purpose, 255).not_null())
                    .col(ColumnDef::new(Visitor::VehicleNumber).string_len(16).null())
                    .col(ColumnDef::new(Visitor::ImageUrl).text().null())
                    .col(string_len(Visitor::ResidentId, 16).not_null())
                    .col(string_len(Visitor::ResidentName, 128).not_null())
                    .col(ColumnDef::new(Visitor::SocietyId).string_len(64).null())
                    .col(string_len(Visitor::Status, 16).not_null())
                    .col(uuid(Visitor::AddedBy).not_null())
                    .col(timestamp_with_time_zone(Visitor::Timestamp).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Visitor::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Visitor {
    Table,
    Id,
    Name,
    PhoneNumber,
    Purpose,
    VehicleNumber,
    ImageUrl,
    ResidentId,
    ResidentName,
    SocietyId,
    Status,
    AddedBy,
    Timestamp,
}
