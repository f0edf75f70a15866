//! Migration: products, inventories, inventory movements and stock history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::Sku).string_len(32).not_null().unique_key())
                    .col(ColumnDef::new(Products::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Products::Description).text().null())
                    .col(ColumnDef::new(Products::Category).string_len(20).not_null())
                    .col(ColumnDef::new(Products::Price).double().not_null())
                    .col(ColumnDef::new(Products::Unit).string_len(10).not_null())
                    .col(
                        ColumnDef::new(Products::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Products::ImageUrl).string().null())
                    .col(ColumnDef::new(Products::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Products::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_category")
                    .table(Products::Table)
                    .col(Products::Category)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Inventories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Inventories::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Inventories::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Inventories::Location).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Inventories::Quantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Inventories::Quantity).gte(0)),
                    )
                    .col(ColumnDef::new(Inventories::Status).string_len(20).not_null())
                    .col(ColumnDef::new(Inventories::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Inventories::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventories_product")
                            .from(Inventories::Table, Inventories::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventories_product_location")
                    .table(Inventories::Table)
                    .col(Inventories::ProductId)
                    .col(Inventories::Location)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryMovements::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(InventoryMovements::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(InventoryMovements::ProductId).uuid().not_null())
                    .col(ColumnDef::new(InventoryMovements::FromLocation).string_len(100).null())
                    .col(ColumnDef::new(InventoryMovements::ToLocation).string_len(100).null())
                    .col(ColumnDef::new(InventoryMovements::Quantity).integer().not_null())
                    .col(ColumnDef::new(InventoryMovements::MovementType).string_len(20).not_null())
                    .col(ColumnDef::new(InventoryMovements::ReferenceNumber).string_len(50).null())
                    .col(
                        ColumnDef::new(InventoryMovements::MovedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_movements_product")
                            .from(InventoryMovements::Table, InventoryMovements::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockHistories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StockHistories::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(StockHistories::ProductId).uuid().not_null())
                    .col(ColumnDef::new(StockHistories::Location).string_len(100).not_null())
                    .col(ColumnDef::new(StockHistories::PreviousStock).integer().not_null())
                    .col(ColumnDef::new(StockHistories::NewStock).integer().not_null())
                    .col(ColumnDef::new(StockHistories::ChangeAmount).integer().not_null())
                    .col(ColumnDef::new(StockHistories::ChangeType).string_len(20).not_null())
                    .col(ColumnDef::new(StockHistories::Reason).string().null())
                    .col(ColumnDef::new(StockHistories::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(StockHistories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_histories_product")
                            .from(StockHistories::Table, StockHistories::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_histories_product_created")
                    .table(StockHistories::Table)
                    .col(StockHistories::ProductId)
                    .col(StockHistories::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockHistories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Sku,
    Name,
    Description,
    Category,
    Price,
    Unit,
    Status,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
    ProductId,
    Location,
    Quantity,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryMovements {
    Table,
    Id,
    ProductId,
    FromLocation,
    ToLocation,
    Quantity,
    MovementType,
    ReferenceNumber,
    MovedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StockHistories {
    Table,
    Id,
    ProductId,
    Location,
    PreviousStock,
    NewStock,
    ChangeAmount,
    ChangeType,
    Reason,
    CreatedBy,
    CreatedAt,
}
