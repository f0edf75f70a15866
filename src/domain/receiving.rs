//! Inbound receiving of supplier shipments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::delivery::required;
use super::inventory::validate_location;
use crate::errors::{AppError, AppResult};

string_enum! {
    pub enum ReceivingStatus {
        Pending => "pending",
        InTransit => "in_transit",
        Received => "received",
        Cancelled => "cancelled",
    }
}

impl ReceivingStatus {
    pub fn next_states(self) -> &'static [ReceivingStatus] {
        use ReceivingStatus::*;
        match self {
            Pending => &[InTransit, Received, Cancelled],
            InTransit => &[Received, Cancelled],
            Received | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: ReceivingStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }

    pub fn transition(self, next: ReceivingStatus) -> AppResult<ReceivingStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::invalid_transition(self, next))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Receiving {
    pub id: Uuid,
    #[schema(example = "PO-2024-0042")]
    pub order_number: String,
    pub supplier_name: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub location: String,
    pub status: ReceivingStatus,
    pub expected_date: Option<NaiveDate>,
    pub received_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReceiving {
    pub order_number: String,
    pub supplier_name: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub location: String,
    pub expected_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
}

impl NewReceiving {
    pub fn validate(&self) -> AppResult<()> {
        required("Order number", &self.order_number, 50)?;
        required("Supplier name", &self.supplier_name, 100)?;
        if self.quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        validate_location(&self.location)
    }
}

/// Details editable while the receiving is pending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivingChanges {
    pub supplier_name: Option<String>,
    pub quantity: Option<i32>,
    pub location: Option<String>,
    pub expected_date: Option<NaiveDate>,
    pub note: Option<String>,
}

impl ReceivingChanges {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.supplier_name {
            required("Supplier name", name, 100)?;
        }
        if matches!(self.quantity, Some(q) if q <= 0) {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        if let Some(location) = &self.location {
            validate_location(location)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReceivingFilter {
    pub status: Option<ReceivingStatus>,
    pub product_id: Option<Uuid>,
}
