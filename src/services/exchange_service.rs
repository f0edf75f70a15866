//! Bulk export and import.
//!
//! Every imported row is handled on its own: a bad row is recorded in the
//! result and the rest of the file still goes in.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use super::stock::{apply_change, StockChange};
use super::DeliveryService;
use crate::domain::exchange::{
    decode_rows, encode_rows, DeliveryRow, ExportOptions, ImportOptions, InventoryRow,
    ProductRow,
};
use crate::domain::inventory::validate_location;
use crate::domain::{
    DataType, DeliveryStatus, ExportFile, ImportResult, InventoryChanges, NewDelivery,
    NewProduct, Product, ProductChanges, StockChangeType,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::with_transaction;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ExchangeService: Send + Sync {
    async fn export(&self, options: ExportOptions) -> AppResult<ExportFile>;

    /// Import `body`. Only an unreadable file fails the whole call.
    async fn import(
        &self,
        options: ImportOptions,
        body: Vec<u8>,
        actor: Uuid,
    ) -> AppResult<ImportResult>;
}

pub struct ExchangeManager<U: UnitOfWork> {
    uow: Arc<U>,
    deliveries: Arc<dyn DeliveryService>,
}

impl<U: UnitOfWork> ExchangeManager<U> {
    pub fn new(uow: Arc<U>, deliveries: Arc<dyn DeliveryService>) -> Self {
        Self { uow, deliveries }
    }

    async fn skus(&self, product_ids: impl Iterator<Item = Uuid>) -> AppResult<HashMap<Uuid, String>> {
        let mut ids: Vec<Uuid> = product_ids.collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = self.uow.products().find_by_ids(ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p.sku)).collect())
    }

    async fn live_product(&self, sku: &str) -> AppResult<Product> {
        self.uow
            .products()
            .find_by_sku(sku)
            .await?
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::validation(format!("Unknown SKU {}", sku)))
    }

    async fn import_product(&self, row: ProductRow) -> AppResult<()> {
        let incoming = NewProduct {
            sku: row.sku,
            name: row.name,
            description: row.description.filter(|d| !d.trim().is_empty()),
            category: row.category,
            price: row.price,
            unit: row.unit,
            status: row.status,
            image_url: None,
        };
        incoming.validate()?;

        match self.uow.products().find_by_sku(&incoming.sku).await? {
            Some(existing) if existing.deleted_at.is_some() => Err(AppError::validation(format!(
                "SKU {} belongs to a deleted product",
                existing.sku
            ))),
            Some(existing) => {
                let changes = ProductChanges::between(&existing, &incoming);
                if !changes.is_empty() {
                    self.uow.products().update(existing.id, changes).await?;
                }
                Ok(())
            }
            None => self.uow.products().create(incoming).await.map(|_| ()),
        }
    }

    /// Sets the on-hand count through a stock adjustment so the import
    /// leaves a history entry
    async fn import_inventory(&self, row: InventoryRow, actor: Uuid) -> AppResult<()> {
        validate_location(&row.location)?;
        if row.quantity < 0 {
            return Err(AppError::validation("Quantity must not be negative"));
        }
        let product = self.live_product(&row.sku).await?;

        let change = StockChange::new(
            product.id,
            row.location,
            StockChangeType::Adjustment,
            row.quantity,
        )
        .reason("Imported")
        .actor(Some(actor));
        let (inventory, _) = with_transaction!(self.uow, |ctx| apply_change(&ctx, change).await)?;

        if let Some(status) = row.status {
            let status = status.after_quantity_change(inventory.quantity);
            if status != inventory.status {
                let changes = InventoryChanges {
                    status: Some(status),
                    ..Default::default()
                };
                self.uow.inventory().update(inventory.id, changes).await?;
            }
        }
        Ok(())
    }

    async fn import_delivery(&self, row: DeliveryRow, reserve_stock: bool, actor: Uuid) -> AppResult<()> {
        let product = self.live_product(&row.sku).await?;
        let delivery = NewDelivery {
            order_number: row.order_number,
            product_id: product.id,
            quantity: row.quantity,
            from_location: row.from_location,
            customer_name: row.customer_name,
            customer_address: row.customer_address,
            customer_phone: row.customer_phone,
            estimated_delivery_date: row.estimated_delivery_date,
            note: None,
            status: DeliveryStatus::Pending,
            stock_reserved: reserve_stock,
            created_by: Some(actor),
        };

        if reserve_stock {
            return self.deliveries.create(delivery).await.map(|_| ());
        }

        delivery.validate()?;
        if self
            .uow
            .deliveries()
            .find_by_order_number(&delivery.order_number)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Order number"));
        }
        self.uow.deliveries().create(delivery).await.map(|_| ())
    }
}

/// Feed each decoded row to `handle`, numbering rows from 1
async fn import_rows<T, F, Fut>(rows: Vec<Result<T, String>>, mut handle: F) -> ImportResult
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let mut result = ImportResult::default();
    for (index, row) in rows.into_iter().enumerate() {
        let outcome = match row {
            Ok(row) => handle(row).await.map_err(|e| e.user_message()),
            Err(reason) => Err(reason),
        };
        result.record(index + 1, outcome);
    }
    result
}

fn export_filename(data_type: DataType, options: &ExportOptions) -> String {
    format!(
        "{}_export_{}.{}",
        data_type,
        Utc::now().format("%Y%m%d%H%M%S"),
        options.format.extension()
    )
}

#[async_trait]
impl<U: UnitOfWork> ExchangeService for ExchangeManager<U> {
    async fn export(&self, options: ExportOptions) -> AppResult<ExportFile> {
        options.range.validate()?;
        let format = options.format;
        let headers = options.include_headers;

        let (body, total_records) = match options.data_type {
            DataType::Product => {
                let products = self.uow.products().list_created(options.range).await?;
                let rows: Vec<ProductRow> = products.iter().map(ProductRow::from).collect();
                (encode_rows(&rows, format, headers)?, rows.len())
            }
            DataType::Inventory => {
                let items = self.uow.inventory().list_created(options.range).await?;
                let skus = self.skus(items.iter().map(|i| i.product_id)).await?;
                let rows: Vec<InventoryRow> = items
                    .iter()
                    .filter_map(|i| skus.get(&i.product_id).map(|sku| InventoryRow::new(sku, i)))
                    .collect();
                (encode_rows(&rows, format, headers)?, rows.len())
            }
            DataType::Delivery => {
                let deliveries = self.uow.deliveries().list_created(options.range).await?;
                let skus = self.skus(deliveries.iter().map(|d| d.product_id)).await?;
                let rows: Vec<DeliveryRow> = deliveries
                    .iter()
                    .filter_map(|d| skus.get(&d.product_id).map(|sku| DeliveryRow::new(sku, d)))
                    .collect();
                (encode_rows(&rows, format, headers)?, rows.len())
            }
        };

        tracing::info!(data_type = %options.data_type, total_records, "Export rendered");
        Ok(ExportFile {
            filename: export_filename(options.data_type, &options),
            content_type: format.content_type(),
            body,
            total_records,
        })
    }

    async fn import(
        &self,
        options: ImportOptions,
        body: Vec<u8>,
        actor: Uuid,
    ) -> AppResult<ImportResult> {
        if body.is_empty() {
            return Err(AppError::bad_request("Import file is empty"));
        }

        let result = match options.data_type {
            DataType::Product => {
                let rows = decode_rows::<ProductRow>(&body, options.format)?;
                import_rows(rows, |row| self.import_product(row)).await
            }
            DataType::Inventory => {
                let rows = decode_rows::<InventoryRow>(&body, options.format)?;
                import_rows(rows, |row| self.import_inventory(row, actor)).await
            }
            DataType::Delivery => {
                let rows = decode_rows::<DeliveryRow>(&body, options.format)?;
                let reserve = options.reserve_stock;
                import_rows(rows, |row| self.import_delivery(row, reserve, actor)).await
            }
        };

        tracing::info!(
            data_type = %options.data_type,
            total = result.total_records,
            failed = result.error_count,
            "Import finished"
        );
        Ok(result)
    }
}
