//! One-time promotions consumed per user.
//!
//! The composite primary key makes a second use by the same user fail at the
//! store, even when two purchases race.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "promotion_usages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub promotion_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub transaction_id: String,
    pub used_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promotions::Entity",
        from = "Column::PromotionId",
        to = "super::promotions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Promotions,
}

impl Related<super::promotions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promotions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
