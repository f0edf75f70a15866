//! Notification database entity.

use sea_orm::entity::prelude::*;

use crate::domain::Notification;
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub status: String,
    pub title: String,
    pub message: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Notification {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: model.id,
            user_id: model.user_id,
            notification_type: model.notification_type.parse()?,
            status: model.status.parse()?,
            title: model.title,
            message: model.message,
            data: model.data,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
