//! Bulk export and import of products, inventory and deliveries as CSV
//! or JSON.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::ToSchema;

use super::delivery::{Delivery, DeliveryStatus};
use super::inventory::{Inventory, InventoryStatus};
use super::product::{Product, ProductCategory, ProductStatus};
use crate::errors::{AppError, AppResult};
use crate::types::DateRange;

string_enum! {
    pub enum DataType {
        Inventory => "inventory",
        Delivery => "delivery",
        Product => "product",
    }
}

string_enum! {
    pub enum DataFormat {
        Csv => "csv",
        Json => "json",
    }
}

impl DataFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            DataFormat::Csv => "text/csv; charset=utf-8",
            DataFormat::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

/// One product per row: `sku,name,category,price,unit,status,description`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub sku: String,
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub unit: String,
    pub status: ProductStatus,
    #[serde(default)]
    pub description: Option<String>,
}

/// `sku,location,quantity,status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub sku: String,
    pub location: String,
    pub quantity: i32,
    #[serde(default)]
    pub status: Option<InventoryStatus>,
}

/// `order_number,sku,quantity,from_location,customer_name,customer_address,
/// customer_phone,estimated_delivery_date,status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRow {
    pub order_number: String,
    pub sku: String,
    pub quantity: i32,
    pub from_location: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    #[serde(default)]
    pub estimated_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.sku.clone(),
            name: product.name.clone(),
            category: product.category,
            price: product.price,
            unit: product.unit.clone(),
            status: product.status,
            description: product.description.clone(),
        }
    }
}

impl InventoryRow {
    pub fn new(sku: impl Into<String>, inventory: &Inventory) -> Self {
        Self {
            sku: sku.into(),
            location: inventory.location.clone(),
            quantity: inventory.quantity,
            status: Some(inventory.status),
        }
    }
}

impl DeliveryRow {
    pub fn new(sku: impl Into<String>, delivery: &Delivery) -> Self {
        Self {
            order_number: delivery.order_number.clone(),
            sku: sku.into(),
            quantity: delivery.quantity,
            from_location: delivery.from_location.clone(),
            customer_name: delivery.customer_name.clone(),
            customer_address: delivery.customer_address.clone(),
            customer_phone: delivery.customer_phone.clone(),
            estimated_delivery_date: delivery.estimated_delivery_date,
            status: Some(delivery.status),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub data_type: DataType,
    pub format: DataFormat,
    /// Range over the creation date
    pub range: DateRange,
    pub include_headers: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub data_type: DataType,
    pub format: DataFormat,
    /// Decrement source inventory for imported deliveries
    pub reserve_stock: bool,
}

/// Rendered export
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportRowError {
    /// 1-based data row (header excluded)
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportResult {
    pub total_records: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportResult {
    pub fn record(&mut self, row: usize, outcome: Result<(), String>) {
        self.total_records += 1;
        match outcome {
            Ok(()) => self.success_count += 1,
            Err(message) => {
                self.error_count += 1;
                self.errors.push(ImportRowError { row, message });
            }
        }
    }
}

/// Serialize rows in the requested format
pub fn encode_rows<T: Serialize>(
    rows: &[T],
    format: DataFormat,
    include_headers: bool,
) -> AppResult<Vec<u8>> {
    match format {
        DataFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(include_headers)
                .from_writer(Vec::new());
            for row in rows {
                writer
                    .serialize(row)
                    .map_err(|e| AppError::internal(format!("CSV encode failed: {}", e)))?;
            }
            writer
                .into_inner()
                .map_err(|e| AppError::internal(format!("CSV flush failed: {}", e)))
        }
        DataFormat::Json => serde_json::to_vec_pretty(rows)
            .map_err(|e| AppError::internal(format!("JSON encode failed: {}", e))),
    }
}

/// Parse a file into rows. A row that fails to parse becomes an `Err`
/// carrying the reason; only an unreadable file fails the whole call.
pub fn decode_rows<T: DeserializeOwned>(
    body: &[u8],
    format: DataFormat,
) -> AppResult<Vec<Result<T, String>>> {
    match format {
        DataFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_reader(body);
            reader
                .headers()
                .map_err(|e| AppError::bad_request(format!("Unreadable CSV header: {}", e)))?;
            Ok(reader
                .deserialize::<T>()
                .map(|row| row.map_err(|e| csv_error_message(&e)))
                .collect())
        }
        DataFormat::Json => {
            let values: Vec<serde_json::Value> = serde_json::from_slice(body).map_err(|e| {
                AppError::bad_request(format!("Expected a JSON array of records: {}", e))
            })?;
            Ok(values
                .into_iter()
                .map(|v| serde_json::from_value(v).map_err(|e| e.to_string()))
                .collect())
        }
    }
}

fn csv_error_message(e: &csv::Error) -> String {
    match e.kind() {
        csv::ErrorKind::Deserialize { err, .. } => match err.field() {
            Some(field) => format!("column {}: {}", field + 1, err.kind()),
            None => err.kind().to_string(),
        },
        _ => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<ProductRow> {
        vec![
            ProductRow {
                sku: "GT-001".into(),
                name: "Sencha, first flush".into(),
                category: ProductCategory::GreenTea,
                price: 18.5,
                unit: "kg".into(),
                status: ProductStatus::Active,
                description: Some("Steamed \"asamushi\" style".into()),
            },
            ProductRow {
                sku: "BT-002".into(),
                name: "Assam".into(),
                category: ProductCategory::BlackTea,
                price: 9.0,
                unit: "box".into(),
                status: ProductStatus::Inactive,
                description: None,
            },
        ]
    }

    #[test]
    fn csv_product_rows_survive_quoting() {
        let body = encode_rows(&rows(), DataFormat::Csv, true).unwrap();
        let text = String::from_utf8(body.clone()).unwrap();
        assert!(text.starts_with("sku,name,category,price,unit,status,description\n"));
        assert!(text.contains("\"Sencha, first flush\""));

        let decoded: Vec<Result<ProductRow, String>> =
            decode_rows(&body, DataFormat::Csv).unwrap();
        let decoded: Vec<ProductRow> = decoded.into_iter().map(Result::unwrap).collect();
        assert_eq!(decoded, rows());
    }

    #[test]
    fn headerless_export_omits_header_line() {
        let body = encode_rows(&rows(), DataFormat::Csv, false).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("GT-001,"));
    }

    #[test]
    fn bad_csv_rows_are_reported_individually() {
        let body = b"sku,location,quantity,status\n\
                     GT-001,WH-A,10,available\n\
                     GT-002,WH-A,lots,available\n\
                     GT-003,WH-B,5,\n";

        let decoded: Vec<Result<InventoryRow, String>> =
            decode_rows(body, DataFormat::Csv).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(decoded[0].is_ok());
        assert!(decoded[1].as_ref().unwrap_err().contains("column 3"));
        assert_eq!(decoded[2].as_ref().unwrap().status, None);
    }

    #[test]
    fn json_rows_decode_independently() {
        let body = br#"[{"sku":"GT-001","location":"WH-A","quantity":3},{"sku":"GT-002"}]"#;
        let decoded: Vec<Result<InventoryRow, String>> =
            decode_rows(body, DataFormat::Json).unwrap();
        assert!(decoded[0].is_ok());
        assert!(decoded[1].is_err());

        assert!(decode_rows::<InventoryRow>(b"{}", DataFormat::Json).is_err());
    }

    #[test]
    fn import_result_counts() {
        let mut result = ImportResult::default();
        result.record(1, Ok(()));
        result.record(2, Err("bad sku".into()));

        assert_eq!(result.total_records, 2);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors[0].row, 2);
    }
}
