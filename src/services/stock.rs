//! The single write path for on-hand stock.
//!
//! Adjustments, delivery reservations, cancellations, receivings and
//! imports all call [`apply_change`] inside a transaction, so each change
//! locks the row, checks the arithmetic and writes the history entry and
//! movement together.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Inventory, InventoryStatus, MovementType, NewInventory, NewMovement, NewStockHistory,
    StockChangeType, StockHistory,
};
use crate::errors::AppResult;
use crate::infra::TransactionContext;

/// One change to the stock of a product at a location
#[derive(Debug, Clone)]
pub(crate) struct StockChange {
    pub product_id: Uuid,
    pub location: String,
    pub change_type: StockChangeType,
    pub quantity: i32,
    pub reason: Option<String>,
    /// Order or purchase number recorded on the movement
    pub reference: Option<String>,
    pub actor: Option<Uuid>,
}

impl StockChange {
    pub fn new(
        product_id: Uuid,
        location: impl Into<String>,
        change_type: StockChangeType,
        quantity: i32,
    ) -> Self {
        Self {
            product_id,
            location: location.into(),
            change_type,
            quantity,
            reason: None,
            reference: None,
            actor: None,
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn actor(mut self, actor: Option<Uuid>) -> Self {
        self.actor = actor;
        self
    }

    fn movement(&self, previous: i32, new: i32) -> Option<NewMovement> {
        let (movement_type, from_location, to_location) = match self.change_type {
            StockChangeType::In => (MovementType::Inbound, None, Some(self.location.clone())),
            StockChangeType::Out => (MovementType::Outbound, Some(self.location.clone()), None),
            StockChangeType::Adjustment => {
                (MovementType::Adjustment, None, Some(self.location.clone()))
            }
        };
        let quantity = (new - previous).abs();
        if quantity == 0 {
            return None;
        }
        Some(NewMovement {
            product_id: self.product_id,
            from_location,
            to_location,
            quantity,
            movement_type,
            reference_number: self.reference.clone(),
            moved_at: Utc::now(),
        })
    }
}

/// Apply `change` under a row lock and record it.
///
/// A missing row counts as zero on hand and is created on the way in;
/// taking stock out of a missing row fails with InsufficientStock.
pub(crate) async fn apply_change(
    ctx: &TransactionContext<'_>,
    change: StockChange,
) -> AppResult<(Inventory, StockHistory)> {
    let current = ctx
        .inventory()
        .find_for_update(change.product_id, &change.location)
        .await?;
    let previous = current.as_ref().map_or(0, |row| row.quantity);
    let new_quantity = change.change_type.apply(previous, change.quantity)?;

    let inventory = match current {
        Some(row) => {
            let status = row.status.after_quantity_change(new_quantity);
            ctx.inventory()
                .set_quantity(row.id, new_quantity, status)
                .await?
        }
        None => {
            ctx.inventory()
                .create(NewInventory {
                    product_id: change.product_id,
                    location: change.location.clone(),
                    quantity: new_quantity,
                    status: InventoryStatus::for_new_row(new_quantity),
                })
                .await?
        }
    };

    let history = ctx
        .stock_history()
        .record(NewStockHistory {
            product_id: change.product_id,
            location: change.location.clone(),
            previous_stock: previous,
            new_stock: new_quantity,
            change_type: change.change_type,
            reason: change.reason.clone(),
            created_by: change.actor,
        })
        .await?;

    if let Some(movement) = change.movement(previous, new_quantity) {
        ctx.inventory().record_movement(movement).await?;
    }

    tracing::debug!(
        product_id = %change.product_id,
        location = %change.location,
        previous,
        new = new_quantity,
        "Stock changed"
    );
    Ok((inventory, history))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_direction_follows_change_type() {
        let id = Uuid::new_v4();
        let out = StockChange::new(id, "WH-A", StockChangeType::Out, 4)
            .reference("ORD-9")
            .movement(10, 6)
            .unwrap();
        assert_eq!(out.movement_type, MovementType::Outbound);
        assert_eq!(out.from_location.as_deref(), Some("WH-A"));
        assert_eq!(out.to_location, None);
        assert_eq!(out.quantity, 4);
        assert_eq!(out.reference_number.as_deref(), Some("ORD-9"));

        let inbound = StockChange::new(id, "WH-A", StockChangeType::In, 3)
            .movement(0, 3)
            .unwrap();
        assert_eq!(inbound.movement_type, MovementType::Inbound);
        assert_eq!(inbound.to_location.as_deref(), Some("WH-A"));
    }

    #[test]
    fn adjustment_records_the_size_of_the_correction() {
        let id = Uuid::new_v4();
        let down = StockChange::new(id, "WH-A", StockChangeType::Adjustment, 2)
            .movement(9, 2)
            .unwrap();
        assert_eq!(down.movement_type, MovementType::Adjustment);
        assert_eq!(down.quantity, 7);

        assert!(StockChange::new(id, "WH-A", StockChangeType::Adjustment, 5)
            .movement(5, 5)
            .is_none());
    }
}
