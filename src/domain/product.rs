//! Product catalog entity and its validation rules.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{
    MAX_PRODUCT_DESCRIPTION_LENGTH, MAX_PRODUCT_NAME_LENGTH, MAX_PRODUCT_PRICE,
    MAX_PRODUCT_UNIT_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Upper-case letters, digits and dashes, 3 to 32 long
pub static SKU_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9-]{3,32}$").expect("SKU pattern is a valid regex"));

string_enum! {
    pub enum ProductStatus {
        Active => "active",
        Inactive => "inactive",
        Discontinued => "discontinued",
    }
}

string_enum! {
    pub enum ProductCategory {
        GreenTea => "green_tea",
        BlackTea => "black_tea",
        OolongTea => "oolong_tea",
        PuerhTea => "puerh_tea",
        HerbalTea => "herbal_tea",
        Other => "other",
    }
}

string_enum! {
    /// Sortable product columns
    pub enum ProductSortField {
        Name => "name",
        Category => "category",
        Price => "price",
        CreatedAt => "created_at",
    }
}

string_enum! {
    pub enum SortDirection {
        Asc => "asc",
        Desc => "desc",
    }
}

impl Default for ProductSortField {
    fn default() -> Self {
        ProductSortField::CreatedAt
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Desc
    }
}

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "GT-SENCHA-01")]
    pub sku: String,
    #[schema(example = "Sencha Premium")]
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    #[schema(example = 24.5)]
    pub price: f64,
    #[schema(example = "kg")]
    pub unit: String,
    pub status: ProductStatus,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Product with its on-hand stock summed over every location
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub stock: i64,
}

/// Validated input for a new product
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub price: f64,
    pub unit: String,
    pub status: ProductStatus,
    pub image_url: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> AppResult<()> {
        validate_sku(&self.sku)?;
        validate_name(&self.name)?;
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        validate_unit(&self.unit)?;
        validate_price(self.price)
    }
}

/// Partial product update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub price: Option<f64>,
    pub unit: Option<String>,
    pub status: Option<ProductStatus>,
    pub image_url: Option<String>,
}

impl ProductChanges {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(unit) = &self.unit {
            validate_unit(unit)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Changes that would turn `product` into `incoming`
    pub fn between(product: &Product, incoming: &NewProduct) -> Self {
        Self {
            name: Some(incoming.name.clone()).filter(|v| *v != product.name),
            description: incoming
                .description
                .clone()
                .filter(|v| Some(v) != product.description.as_ref()),
            category: Some(incoming.category).filter(|v| *v != product.category),
            price: Some(incoming.price).filter(|v| *v != product.price),
            unit: Some(incoming.unit.clone()).filter(|v| *v != product.unit),
            status: Some(incoming.status).filter(|v| *v != product.status),
            image_url: incoming
                .image_url
                .clone()
                .filter(|v| Some(v) != product.image_url.as_ref()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Product list filter
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    pub status: Option<ProductStatus>,
    /// Case-insensitive match on name, SKU or description
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_by: ProductSortField,
    pub sort_dir: SortDirection,
}

impl ProductFilter {
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(AppError::validation(
                    "min_price must not be greater than max_price",
                ));
            }
        }
        Ok(())
    }

    /// Trimmed search term, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

pub fn validate_sku(sku: &str) -> AppResult<()> {
    if !SKU_PATTERN.is_match(sku) {
        return Err(AppError::validation(
            "SKU must be 3-32 characters of upper-case letters, digits or dashes",
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> AppResult<()> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(AppError::validation("Product name is required"));
    }
    if len > MAX_PRODUCT_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "Product name must be at most {} characters",
            MAX_PRODUCT_NAME_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> AppResult<()> {
    if description.chars().count() > MAX_PRODUCT_DESCRIPTION_LENGTH {
        return Err(AppError::validation(format!(
            "Description must be at most {} characters",
            MAX_PRODUCT_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_unit(unit: &str) -> AppResult<()> {
    let len = unit.trim().chars().count();
    if len == 0 || len > MAX_PRODUCT_UNIT_LENGTH {
        return Err(AppError::validation(format!(
            "Unit must be 1-{} characters",
            MAX_PRODUCT_UNIT_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price <= 0.0 || price > MAX_PRODUCT_PRICE {
        return Err(AppError::validation(format!(
            "Price must be greater than 0 and at most {}",
            MAX_PRODUCT_PRICE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            sku: "GT-SENCHA-01".into(),
            name: "Sencha".into(),
            description: None,
            category: ProductCategory::GreenTea,
            price: 12.5,
            unit: "kg".into(),
            status: ProductStatus::Active,
            image_url: None,
        }
    }

    #[test]
    fn sku_pattern() {
        assert!(validate_sku("ABC").is_ok());
        assert!(validate_sku("GT-2024-0001").is_ok());
        assert!(validate_sku("ab-1").is_err());
        assert!(validate_sku("AB").is_err());
        assert!(validate_sku(&"A".repeat(33)).is_err());
        assert!(validate_sku("AB_1").is_err());
    }

    #[test]
    fn price_bounds() {
        assert!(validate_price(0.0).is_err());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(0.01).is_ok());
        assert!(validate_price(1_000_000.0).is_ok());
        assert!(validate_price(1_000_000.01).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }

    #[test]
    fn new_product_checks_every_field() {
        assert!(new_product().validate().is_ok());

        let mut p = new_product();
        p.name = " ".into();
        assert!(p.validate().is_err());

        let mut p = new_product();
        p.unit = "kilograms!!".into();
        assert!(p.validate().is_err());

        let mut p = new_product();
        p.description = Some("x".repeat(1001));
        assert!(p.validate().is_err());
    }

    #[test]
    fn filter_rejects_inverted_price_range() {
        let filter = ProductFilter {
            min_price: Some(50.0),
            max_price: Some(10.0),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn changes_between_only_carry_differences() {
        let now = Utc::now();
        let incoming = new_product();
        let existing = Product {
            id: Uuid::new_v4(),
            sku: incoming.sku.clone(),
            name: incoming.name.clone(),
            description: None,
            category: incoming.category,
            price: 10.0,
            unit: incoming.unit.clone(),
            status: incoming.status,
            image_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let changes = ProductChanges::between(&existing, &incoming);
        assert_eq!(changes.price, Some(12.5));
        assert!(changes.name.is_none());
        assert!(!changes.is_empty());
    }

    #[test]
    fn default_sort_is_newest_first() {
        let filter = ProductFilter::default();
        assert_eq!(filter.sort_by, ProductSortField::CreatedAt);
        assert_eq!(filter.sort_dir, SortDirection::Desc);
    }
}
