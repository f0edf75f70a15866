//! Inventory, stock movements and stock history.
//!
//! Quantity arithmetic lives here so every path that changes stock
//! (manual adjustment, transfer, delivery reservation, receiving) applies
//! the same rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

string_enum! {
    pub enum InventoryStatus {
        Available => "available",
        OutOfStock => "out_of_stock",
        Reserved => "reserved",
        Discontinued => "discontinued",
    }
}

impl InventoryStatus {
    /// Status after the quantity changes to `quantity`.
    ///
    /// An empty row is out of stock. A refilled out-of-stock row becomes
    /// available again. Reserved and discontinued rows keep their status
    /// while they hold stock.
    pub fn after_quantity_change(self, quantity: i32) -> InventoryStatus {
        if quantity <= 0 {
            return InventoryStatus::OutOfStock;
        }
        match self {
            InventoryStatus::OutOfStock => InventoryStatus::Available,
            other => other,
        }
    }

    /// Initial status for a freshly created row
    pub fn for_new_row(quantity: i32) -> InventoryStatus {
        InventoryStatus::Available.after_quantity_change(quantity)
    }
}

string_enum! {
    pub enum MovementType {
        Inbound => "inbound",
        Outbound => "outbound",
        Transfer => "transfer",
        Adjustment => "adjustment",
    }
}

string_enum! {
    pub enum StockChangeType {
        In => "in",
        Out => "out",
        Adjustment => "adjustment",
    }
}

impl StockChangeType {
    /// Apply `quantity` to `on_hand`.
    ///
    /// `in` adds, `out` subtracts and fails with InsufficientStock rather
    /// than going negative, `adjustment` sets the absolute count.
    pub fn apply(self, on_hand: i32, quantity: i32) -> AppResult<i32> {
        match self {
            StockChangeType::In => {
                if quantity <= 0 {
                    return Err(AppError::validation("Quantity must be greater than 0"));
                }
                on_hand
                    .checked_add(quantity)
                    .ok_or_else(|| AppError::validation("Quantity is too large"))
            }
            StockChangeType::Out => {
                if quantity <= 0 {
                    return Err(AppError::validation("Quantity must be greater than 0"));
                }
                take(on_hand, quantity)
            }
            StockChangeType::Adjustment => {
                if quantity < 0 {
                    return Err(AppError::validation("Quantity must not be negative"));
                }
                Ok(quantity)
            }
        }
    }
}

/// Remove `quantity` from `on_hand`, never below zero
pub fn take(on_hand: i32, quantity: i32) -> AppResult<i32> {
    if quantity > on_hand {
        return Err(AppError::insufficient_stock(format!(
            "requested {}, available {}",
            quantity, on_hand
        )));
    }
    Ok(on_hand - quantity)
}

/// Stock of one product at one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Inventory {
    pub id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "WH-TOKYO-A1")]
    pub location: String,
    pub quantity: i32,
    pub status: InventoryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventory {
    pub product_id: Uuid,
    pub location: String,
    pub quantity: i32,
    pub status: InventoryStatus,
}

impl NewInventory {
    pub fn validate(&self) -> AppResult<()> {
        validate_location(&self.location)?;
        if self.quantity < 0 {
            return Err(AppError::validation("Quantity must not be negative"));
        }
        Ok(())
    }
}

/// Partial inventory update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryChanges {
    pub location: Option<String>,
    pub quantity: Option<i32>,
    pub status: Option<InventoryStatus>,
}

impl InventoryChanges {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(location) = &self.location {
            validate_location(location)?;
        }
        if matches!(self.quantity, Some(q) if q < 0) {
            return Err(AppError::validation("Quantity must not be negative"));
        }
        Ok(())
    }

    /// Fill in the derived status when only the quantity changes
    pub fn resolve_status(mut self, current: &Inventory) -> Self {
        if let Some(quantity) = self.quantity {
            let base = self.status.unwrap_or(current.status);
            self.status = Some(base.after_quantity_change(quantity));
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub product_id: Option<Uuid>,
    pub location: Option<String>,
    pub status: Option<InventoryStatus>,
}

pub fn validate_location(location: &str) -> AppResult<()> {
    let len = location.trim().chars().count();
    if len == 0 || len > 100 {
        return Err(AppError::validation("Location must be 1-100 characters"));
    }
    Ok(())
}

/// Recorded movement of stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub quantity: i32,
    pub movement_type: MovementType,
    pub reference_number: Option<String>,
    pub moved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub quantity: i32,
    pub movement_type: MovementType,
    pub reference_number: Option<String>,
    pub moved_at: DateTime<Utc>,
}

/// Request to move stock between two locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub product_id: Uuid,
    pub from_location: String,
    pub to_location: String,
    pub quantity: i32,
    pub movement_type: MovementType,
    pub reference_number: Option<String>,
    pub moved_at: Option<DateTime<Utc>>,
}

impl Transfer {
    pub fn validate(&self) -> AppResult<()> {
        validate_location(&self.from_location)?;
        validate_location(&self.to_location)?;
        if self.from_location == self.to_location {
            return Err(AppError::validation(
                "Source and destination locations must differ",
            ));
        }
        if self.quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        Ok(())
    }

    pub fn into_movement(self, now: DateTime<Utc>) -> NewMovement {
        NewMovement {
            product_id: self.product_id,
            from_location: Some(self.from_location),
            to_location: Some(self.to_location),
            quantity: self.quantity,
            movement_type: self.movement_type,
            reference_number: self.reference_number,
            moved_at: self.moved_at.unwrap_or(now),
        }
    }
}

/// Audit record of a single stock change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockHistory {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location: String,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    #[serde(rename = "type")]
    pub change_type: StockChangeType,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockHistory {
    pub product_id: Uuid,
    pub location: String,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_type: StockChangeType,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
}

impl NewStockHistory {
    pub fn change_amount(&self) -> i32 {
        self.new_stock - self.previous_stock
    }
}

/// Manual stock change on one product at one location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub location: String,
    pub change_type: StockChangeType,
    pub quantity: i32,
    pub reason: Option<String>,
}

impl StockAdjustment {
    pub fn validate(&self) -> AppResult<()> {
        validate_location(&self.location)?;
        // Arithmetic checks happen in `StockChangeType::apply`, against the
        // on-hand count read inside the transaction.
        Ok(())
    }
}

/// Answer to "can `requested` units leave `location`?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Availability {
    pub product_id: Uuid,
    pub location: String,
    pub available: bool,
    pub on_hand: i32,
    pub requested: i32,
}

impl Availability {
    pub fn new(product_id: Uuid, location: String, on_hand: i32, requested: i32) -> Self {
        Self {
            product_id,
            location,
            available: requested <= on_hand,
            on_hand,
            requested,
        }
    }
}
