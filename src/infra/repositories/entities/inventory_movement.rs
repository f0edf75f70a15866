//! Inventory movement database entity.

use sea_orm::entity::prelude::*;

use crate::domain::InventoryMovement;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub quantity: i32,
    pub movement_type: String,
    pub reference_number: Option<String>,
    pub moved_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for InventoryMovement {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(InventoryMovement {
            id: model.id,
            product_id: model.product_id,
            from_location: model.from_location,
            to_location: model.to_location,
            quantity: model.quantity,
            movement_type: model.movement_type.parse()?,
            reference_number: model.reference_number,
            moved_at: model.moved_at,
            created_at: model.created_at,
        })
    }
}
