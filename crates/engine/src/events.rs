//! Events and their points budget.
//!
//! Awards move points from `points_remain` to `points_awarded`, and a budget
//! change resets `points_remain` to the new budget minus what was awarded, so
//! `points_remain + points_awarded` always equals the budget.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub user_id: Uuid,
    pub attended: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i64,
    pub points_budget: i64,
    pub points_remain: i64,
    pub points_awarded: i64,
    pub created_by: Uuid,
    pub organizers: Vec<Uuid>,
    pub guests: Vec<Guest>,
}

impl Event {
    pub fn is_organizer(&self, user_id: Uuid) -> bool {
        self.organizers.contains(&user_id)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    pub capacity: i64,
    pub points_budget: i64,
    pub points_remain: i64,
    pub points_awarded: i64,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_organizers::Entity")]
    EventOrganizers,
    #[sea_orm(has_many = "super::event_guests::Entity")]
    EventGuests,
}

impl Related<super::event_organizers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventOrganizers.def()
    }
}

impl Related<super::event_guests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventGuests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Event> for ActiveModel {
    fn from(event: &Event) -> Self {
        Self {
            id: ActiveValue::Set(event.id.to_string()),
            name: ActiveValue::Set(event.name.clone()),
            description: ActiveValue::Set(event.description.clone()),
            location: ActiveValue::Set(event.location.clone()),
            starts_at: ActiveValue::Set(event.starts_at),
            ends_at: ActiveValue::Set(event.ends_at),
            capacity: ActiveValue::Set(event.capacity),
            points_budget: ActiveValue::Set(event.points_budget),
            points_remain: ActiveValue::Set(event.points_remain),
            points_awarded: ActiveValue::Set(event.points_awarded),
            created_by: ActiveValue::Set(event.created_by.to_string()),
        }
    }
}

/// Organizers and guests live in their own tables; the conversion leaves
/// them empty.
impl TryFrom<Model> for Event {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "event")?,
            name: model.name,
            description: model.description,
            location: model.location,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            capacity: model.capacity,
            points_budget: model.points_budget,
            points_remain: model.points_remain,
            points_awarded: model.points_awarded,
            created_by: parse_uuid(&model.created_by, "user")?,
            organizers: Vec::new(),
            guests: Vec::new(),
        })
    }
}
