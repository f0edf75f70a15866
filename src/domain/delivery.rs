//! Outbound deliveries and their tracking trail.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::inventory::validate_location;
use crate::errors::{AppError, AppResult};
use crate::types::DateRange;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9()\- ]{6,20}$").expect("phone pattern is a valid regex"));

string_enum! {
    pub enum DeliveryStatus {
        Pending => "pending",
        Scheduled => "scheduled",
        InTransit => "in_transit",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

impl DeliveryStatus {
    /// States reachable in one step
    pub fn next_states(self) -> &'static [DeliveryStatus] {
        use DeliveryStatus::*;
        match self {
            Pending => &[Scheduled, InTransit, Cancelled],
            Scheduled => &[InTransit, Cancelled],
            InTransit => &[Delivered, Cancelled],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }

    /// Details (address, dates, note) are editable until dispatch
    pub fn is_editable(self) -> bool {
        matches!(self, DeliveryStatus::Pending | DeliveryStatus::Scheduled)
    }

    /// Check a transition, returning the error the API reports
    pub fn transition(self, next: DeliveryStatus) -> AppResult<DeliveryStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::invalid_transition(self, next))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Delivery {
    pub id: Uuid,
    #[schema(example = "ORD-2024-0001")]
    pub order_number: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub from_location: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub status: DeliveryStatus,
    pub estimated_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    /// Stock was taken out of `from_location` when the delivery was created
    pub stock_reserved: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Delivered on or before the estimated date. `None` when either date
    /// is missing.
    pub fn is_on_time(&self) -> Option<bool> {
        match (self.estimated_delivery_date, self.actual_delivery_date) {
            (Some(estimated), Some(actual)) => Some(actual.date_naive() <= estimated),
            _ => None,
        }
    }

    /// Scheduled and its estimated date has arrived
    pub fn is_due_for_dispatch(&self, today: NaiveDate) -> bool {
        self.status == DeliveryStatus::Scheduled
            && self.estimated_delivery_date.is_some_and(|d| d <= today)
    }

    /// Still in transit more than `grace_days` after the estimate
    pub fn is_overdue(&self, today: NaiveDate, grace_days: i64) -> bool {
        self.status == DeliveryStatus::InTransit
            && self
                .estimated_delivery_date
                .is_some_and(|d| (today - d).num_days() > grace_days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDelivery {
    pub order_number: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub from_location: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub estimated_delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub status: DeliveryStatus,
    pub stock_reserved: bool,
    pub created_by: Option<Uuid>,
}

impl NewDelivery {
    pub fn validate(&self) -> AppResult<()> {
        required("Order number", &self.order_number, 50)?;
        if self.quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        validate_location(&self.from_location)?;
        required("Customer name", &self.customer_name, 100)?;
        required("Customer address", &self.customer_address, 255)?;
        validate_phone(&self.customer_phone)?;
        if let Some(note) = &self.note {
            validate_note(note)?;
        }
        Ok(())
    }
}

/// Editable delivery details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryChanges {
    pub customer_name: Option<String>,
    pub customer_address: Option<String>,
    pub customer_phone: Option<String>,
    pub estimated_delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
}

impl DeliveryChanges {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.customer_name {
            required("Customer name", name, 100)?;
        }
        if let Some(address) = &self.customer_address {
            required("Customer address", address, 255)?;
        }
        if let Some(phone) = &self.customer_phone {
            validate_phone(phone)?;
        }
        if let Some(note) = &self.note {
            validate_note(note)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    /// Matches order number or customer name
    pub search: Option<String>,
    /// Range over the estimated delivery date
    pub estimated: DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryTracking {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub location: String,
    #[schema(example = "arrived_at_hub")]
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTracking {
    pub delivery_id: Uuid,
    pub location: String,
    pub status: String,
    pub notes: Option<String>,
}

impl NewTracking {
    pub fn validate(&self) -> AppResult<()> {
        validate_location(&self.location)?;
        required("Tracking status", &self.status, 50)?;
        if let Some(notes) = &self.notes {
            validate_note(notes)?;
        }
        Ok(())
    }
}

pub fn validate_phone(phone: &str) -> AppResult<()> {
    if !PHONE_PATTERN.is_match(phone.trim()) {
        return Err(AppError::validation("Invalid phone number format"));
    }
    Ok(())
}

fn validate_note(note: &str) -> AppResult<()> {
    if note.chars().count() > 500 {
        return Err(AppError::validation("Note must be at most 500 characters"));
    }
    Ok(())
}

pub(crate) fn required(field: &str, value: &str, max: usize) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}
