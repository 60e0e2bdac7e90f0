//! Users: members of the program and their cached point balance.
//!
//! `points` is a denormalized cache of the ledger balance; only the
//! transaction engine writes it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Principal, Role, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub handle: String,
    pub name: String,
    pub role: Role,
    pub suspicious: bool,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(handle: String, name: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle,
            name,
            role,
            suspicious: false,
            points: 0,
            created_at: Utc::now(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
            suspicious: self.suspicious,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub handle: String,
    pub name: String,
    pub role: String,
    pub suspicious: bool,
    pub points: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        Self {
            id: ActiveValue::Set(user.id.to_string()),
            handle: ActiveValue::Set(user.handle.clone()),
            name: ActiveValue::Set(user.name.clone()),
            role: ActiveValue::Set(user.role.as_str().to_string()),
            suspicious: ActiveValue::Set(user.suspicious),
            points: ActiveValue::Set(user.points),
            created_at: ActiveValue::Set(user.created_at),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "user")?,
            handle: model.handle,
            name: model.name,
            role: Role::try_from(model.role.as_str())?,
            suspicious: model.suspicious,
            points: model.points,
            created_at: model.created_at,
        })
    }
}
