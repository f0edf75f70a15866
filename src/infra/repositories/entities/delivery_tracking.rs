//! Delivery tracking database entity.

use sea_orm::entity::prelude::*;

use crate::domain::DeliveryTracking;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "delivery_trackings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub location: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::delivery::Entity",
        from = "Column::DeliveryId",
        to = "super::delivery::Column::Id"
    )]
    Delivery,
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DeliveryTracking {
    fn from(model: Model) -> Self {
        DeliveryTracking {
            id: model.id,
            delivery_id: model.delivery_id,
            location: model.location,
            status: model.status,
            notes: model.notes,
            created_at: model.created_at,
        }
    }
}
