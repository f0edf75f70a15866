//! Delivery database entity.

use sea_orm::entity::prelude::*;

use crate::domain::Delivery;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub from_location: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_phone: String,
    pub status: String,
    pub estimated_delivery_date: Option<Date>,
    pub actual_delivery_date: Option<DateTimeUtc>,
    pub note: Option<String>,
    pub stock_reserved: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::delivery_tracking::Entity")]
    Tracking,
}

impl Related<super::delivery_tracking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tracking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Delivery {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Delivery {
            id: model.id,
            order_number: model.order_number,
            product_id: model.product_id,
            quantity: model.quantity,
            from_location: model.from_location,
            customer_name: model.customer_name,
            customer_address: model.customer_address,
            customer_phone: model.customer_phone,
            status: model.status.parse()?,
            estimated_delivery_date: model.estimated_delivery_date,
            actual_delivery_date: model.actual_delivery_date,
            note: model.note,
            stock_reserved: model.stock_reserved,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
