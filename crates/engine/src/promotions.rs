//! Promotions: extra points on purchases.
//!
//! Automatic promotions apply on their own whenever their window contains the
//! purchase time and the spend meets the minimum. One-time promotions must be
//! named by the cashier and can be used once per user.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionKind {
    Automatic,
    OneTime,
}

impl PromotionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::OneTime => "one_time",
        }
    }
}

impl TryFrom<&str> for PromotionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "automatic" => Ok(Self::Automatic),
            "one_time" => Ok(Self::OneTime),
            other => Err(EngineError::Validation(format!(
                "invalid promotion kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: PromotionKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub min_spending_minor: Option<i64>,
    /// Extra points per spent minor unit.
    pub rate: Option<f64>,
    pub bonus_points: Option<i64>,
}

impl Promotion {
    /// The window is inclusive on both ends.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at <= self.ends_at
    }

    pub fn meets_minimum(&self, spent_minor: i64) -> bool {
        self.min_spending_minor
            .is_none_or(|minimum| spent_minor >= minimum)
    }

    pub fn applies_to(&self, spent_minor: i64, at: DateTime<Utc>) -> bool {
        self.is_active_at(at) && self.meets_minimum(spent_minor)
    }

    /// `floor(spent * rate) + bonus_points`.
    pub fn bonus_for(&self, spent_minor: i64) -> ResultEngine<i64> {
        let from_rate = match self.rate {
            Some(rate) => {
                let raw = (spent_minor as f64 * rate).floor();
                if !raw.is_finite() || raw > i64::MAX as f64 || raw < i64::MIN as f64 {
                    return Err(EngineError::Validation(format!(
                        "promotion {} bonus overflows",
                        self.id
                    )));
                }
                raw as i64
            }
            None => 0,
        };
        from_rate
            .checked_add(self.bonus_points.unwrap_or(0))
            .ok_or_else(|| {
                EngineError::Validation(format!("promotion {} bonus overflows", self.id))
            })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    pub min_spending_minor: Option<i64>,
    pub rate: Option<f64>,
    pub bonus_points: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promotion_usages::Entity")]
    PromotionUsages,
}

impl Related<super::promotion_usages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromotionUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Promotion> for ActiveModel {
    fn from(promotion: &Promotion) -> Self {
        Self {
            id: ActiveValue::Set(promotion.id.to_string()),
            name: ActiveValue::Set(promotion.name.clone()),
            description: ActiveValue::Set(promotion.description.clone()),
            kind: ActiveValue::Set(promotion.kind.as_str().to_string()),
            starts_at: ActiveValue::Set(promotion.starts_at),
            ends_at: ActiveValue::Set(promotion.ends_at),
            min_spending_minor: ActiveValue::Set(promotion.min_spending_minor),
            rate: ActiveValue::Set(promotion.rate),
            bonus_points: ActiveValue::Set(promotion.bonus_points),
        }
    }
}

impl TryFrom<Model> for Promotion {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "promotion")?,
            name: model.name,
            description: model.description,
            kind: PromotionKind::try_from(model.kind.as_str())?,
            starts_at: model.starts_at,
            ends_at: model.ends_at,
            min_spending_minor: model.min_spending_minor,
            rate: model.rate,
            bonus_points: model.bonus_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn promotion(rate: Option<f64>, bonus: Option<i64>, min: Option<i64>) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: Uuid::new_v4(),
            name: "Spring".to_string(),
            description: None,
            kind: PromotionKind::Automatic,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            min_spending_minor: min,
            rate,
            bonus_points: bonus,
        }
    }

    #[test]
    fn bonus_combines_rate_and_flat_points() {
        // 1 extra point per dollar spent, plus 5 flat.
        let promo = promotion(Some(0.01), Some(5), None);
        assert_eq!(promo.bonus_for(2_599).unwrap(), 25 + 5);
    }

    #[test]
    fn minimum_spend_gates_the_promotion() {
        let promo = promotion(None, Some(10), Some(1_000));
        let now = Utc::now();
        assert!(!promo.applies_to(999, now));
        assert!(promo.applies_to(1_000, now));
    }

    #[test]
    fn window_is_inclusive() {
        let promo = promotion(None, Some(1), None);
        assert!(promo.is_active_at(promo.starts_at));
        assert!(promo.is_active_at(promo.ends_at));
        assert!(!promo.is_active_at(promo.ends_at + Duration::seconds(1)));
    }
}
