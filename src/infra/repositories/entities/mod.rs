//! SeaORM entity definitions
//!
//! Database rows, kept separate from the domain models. Enum columns are
//! stored as text and parsed on the way out.

pub mod batch;
pub mod delivery;
pub mod delivery_tracking;
pub mod inventory;
pub mod inventory_movement;
pub mod notification;
pub mod product;
pub mod receiving;
pub mod stock_history;
pub mod user;
