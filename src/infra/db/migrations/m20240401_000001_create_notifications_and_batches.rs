//! Migration: notifications and batch jobs.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notifications::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Notifications::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Notifications::NotificationType)
                            .string_len(30)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Status)
                            .string_len(10)
                            .not_null()
                            .default("unread"),
                    )
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(ColumnDef::new(Notifications::Data).json_binary().not_null())
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_status")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Batches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Batches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Batches::BatchType).string_len(30).not_null())
                    .col(
                        ColumnDef::new(Batches::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Batches::Schedule).string_len(100).null())
                    .col(ColumnDef::new(Batches::RetryCount).integer().not_null().default(3))
                    .col(
                        ColumnDef::new(Batches::TimeoutSeconds)
                            .integer()
                            .not_null()
                            .default(300),
                    )
                    .col(ColumnDef::new(Batches::Params).json_binary().not_null())
                    .col(ColumnDef::new(Batches::StartedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Batches::FinishedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Batches::ProcessedItems).integer().not_null().default(0))
                    .col(ColumnDef::new(Batches::SuccessCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Batches::ErrorCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Batches::Errors).json_binary().not_null())
                    .col(ColumnDef::new(Batches::Logs).json_binary().not_null())
                    .col(ColumnDef::new(Batches::CreatedBy).uuid().null())
                    .col(ColumnDef::new(Batches::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Batches::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batches_status")
                    .table(Batches::Table)
                    .col(Batches::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Batches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    UserId,
    NotificationType,
    Status,
    Title,
    Message,
    Data,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Batches {
    Table,
    Id,
    BatchType,
    Status,
    Schedule,
    RetryCount,
    TimeoutSeconds,
    Params,
    StartedAt,
    FinishedAt,
    ProcessedItems,
    SuccessCount,
    ErrorCount,
    Errors,
    Logs,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
