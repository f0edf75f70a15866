//! Migration: deliveries, delivery tracking and receivings.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deliveries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deliveries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Deliveries::OrderNumber).string_len(50).not_null())
                    .col(ColumnDef::new(Deliveries::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Deliveries::Quantity).integer().not_null())
                    .col(ColumnDef::new(Deliveries::FromLocation).string_len(100).not_null())
                    .col(ColumnDef::new(Deliveries::CustomerName).string_len(100).not_null())
                    .col(ColumnDef::new(Deliveries::CustomerAddress).string().not_null())
                    .col(ColumnDef::new(Deliveries::CustomerPhone).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Deliveries::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Deliveries::EstimatedDeliveryDate).date().null())
                    .col(
                        ColumnDef::new(Deliveries::ActualDeliveryDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Deliveries::Note).text().null())
                    .col(ColumnDef::new(Deliveries::CreatedBy).uuid().null())
                    .col(ColumnDef::new(Deliveries::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Deliveries::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deliveries_product")
                            .from(Deliveries::Table, Deliveries::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deliveries_status")
                    .table(Deliveries::Table)
                    .col(Deliveries::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DeliveryTrackings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DeliveryTrackings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DeliveryTrackings::DeliveryId).uuid().not_null())
                    .col(ColumnDef::new(DeliveryTrackings::Location).string_len(100).not_null())
                    .col(ColumnDef::new(DeliveryTrackings::Status).string_len(50).not_null())
                    .col(ColumnDef::new(DeliveryTrackings::Notes).text().null())
                    .col(
                        ColumnDef::new(DeliveryTrackings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_trackings_delivery")
                            .from(DeliveryTrackings::Table, DeliveryTrackings::DeliveryId)
                            .to(Deliveries::Table, Deliveries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Receivings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Receivings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Receivings::OrderNumber).string_len(50).not_null())
                    .col(ColumnDef::new(Receivings::SupplierName).string_len(100).not_null())
                    .col(ColumnDef::new(Receivings::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Receivings::Quantity).integer().not_null())
                    .col(ColumnDef::new(Receivings::Location).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Receivings::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Receivings::ExpectedDate).date().null())
                    .col(
                        ColumnDef::new(Receivings::ReceivedDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Receivings::Note).text().null())
                    .col(ColumnDef::new(Receivings::CreatedBy).uuid().null())
                    .col(ColumnDef::new(Receivings::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Receivings::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_receivings_product")
                            .from(Receivings::Table, Receivings::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Receivings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DeliveryTrackings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deliveries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Deliveries {
    Table,
    Id,
    OrderNumber,
    ProductId,
    Quantity,
    FromLocation,
    CustomerName,
    CustomerAddress,
    CustomerPhone,
    Status,
    EstimatedDeliveryDate,
    ActualDeliveryDate,
    Note,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DeliveryTrackings {
    Table,
    Id,
    DeliveryId,
    Location,
    Status,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Receivings {
    Table,
    Id,
    OrderNumber,
    SupplierName,
    ProductId,
    Quantity,
    Location,
    Status,
    ExpectedDate,
    ReceivedDate,
    Note,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
