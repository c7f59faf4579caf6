use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users: resident lookup by (society_id, resident_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_society_resident")
                    .table(User::Table)
                    .col(User::SocietyId)
                    .col(User::ResidentId)
                    .to_owned(),
            )
            .await?;

        // Visitor feeds: society and resident scopes, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_visitor_society_timestamp")
                    .table(Visitor::Table)
                    .col(Visitor::SocietyId)
                    .col(Visitor::Timestamp)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_visitor_resident")
                    .table(Visitor::Table)
                    .col(Visitor::ResidentId)
                    .to_owned(),
            )
            .await?;

        // Cleanup by author
        manager
            .create_index(
                Index::create()
                    .name("idx_visitor_added_by")
                    .table(Visitor::Table)
                    .col(Visitor::AddedBy)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_user_society_resident").table(User::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_visitor_society_timestamp").table(Visitor::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_visitor_resident").table(Visitor::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_visitor_added_by").table(Visitor::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum User { Table, SocietyId, ResidentId }

#[derive(DeriveIden)]
enum Visitor { Table, SocietyId, Timestamp, ResidentId, AddedBy }
