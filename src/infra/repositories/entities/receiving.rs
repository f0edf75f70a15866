//! Receiving database entity.

use sea_orm::entity::prelude::*;

use crate::domain::Receiving;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "receivings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub supplier_name: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub location: String,
    pub status: String,
    pub expected_date: Option<Date>,
    pub received_date: Option<DateTimeUtc>,
    pub note: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Receiving {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Receiving {
            id: model.id,
            order_number: model.order_number,
            supplier_name: model.supplier_name,
            product_id: model.product_id,
            quantity: model.quantity,
            location: model.location,
            status: model.status.parse()?,
            expected_date: model.expected_date,
            received_date: model.received_date,
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
