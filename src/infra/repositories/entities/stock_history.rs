//! Stock history database entity.

use sea_orm::entity::prelude::*;

use crate::domain::StockHistory;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "stock_histories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub location: String,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    pub change_type: String,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for StockHistory {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(StockHistory {
            id: model.id,
            product_id: model.product_id,
            location: model.location,
            previous_stock: model.previous_stock,
            new_stock: model.new_stock,
            change_amount: model.change_amount,
            change_type: model.change_type.parse()?,
            reason: model.reason,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
