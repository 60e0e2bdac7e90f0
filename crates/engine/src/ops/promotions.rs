use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, prelude::*,
};
use uuid::Uuid;

use crate::{
    CreatePromotionCmd, EngineError, Principal, Promotion, PromotionKind, PromotionUpdate,
    ResultEngine, Role,
    promotion_usages, promotions,
    util::{normalize_optional_text, normalize_required_name, validate_window},
};

use super::{Engine, on_unique_violation};

/// Promotions that apply to one purchase.
#[derive(Debug, Default)]
pub(super) struct PromotionMatch {
    /// Sum of the bonus points of every applied promotion.
    pub bonus: i64,
    /// Every applied promotion, automatic and one-time.
    pub applied: Vec<Uuid>,
    /// The one-time subset of `applied`, to be marked as used.
    pub one_time: Vec<Uuid>,
}

impl PromotionMatch {
    fn add(&mut self, promotion: &Promotion, spent_minor: i64) -> ResultEngine<()> {
        let bonus = promotion.bonus_for(spent_minor)?;
        self.bonus = self
            .bonus
            .checked_add(bonus)
            .ok_or_else(|| EngineError::Validation("promotion bonus overflows".to_string()))?;
        self.applied.push(promotion.id);
        if promotion.kind == PromotionKind::OneTime {
            self.one_time.push(promotion.id);
        }
        Ok(())
    }
}

impl Engine {
    /// Collect the promotions a purchase earns.
    ///
    /// Every automatic promotion active at `at` whose minimum spend is met
    /// applies on its own. Requested one-time promotions must exist, be
    /// active, have their minimum met and be unused by the customer; any
    /// failure rejects the whole purchase.
    pub(super) async fn match_promotions<C: ConnectionTrait>(
        &self,
        db: &C,
        customer_id: Uuid,
        spent_minor: i64,
        requested: &[Uuid],
        at: DateTime<Utc>,
    ) -> ResultEngine<PromotionMatch> {
        let mut matched = PromotionMatch::default();

        let automatic = promotions::Entity::find()
            .filter(promotions::Column::Kind.eq(PromotionKind::Automatic.as_str()))
            .order_by_asc(promotions::Column::StartsAt)
            .all(db)
            .await?;
        for model in automatic {
            let promotion = Promotion::try_from(model)?;
            if promotion.applies_to(spent_minor, at) {
                matched.add(&promotion, spent_minor)?;
            }
        }

        for promotion_id in requested {
            let model = promotions::Entity::find_by_id(promotion_id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("promotion {promotion_id}")))?;
            let promotion = Promotion::try_from(model)?;
            if promotion.kind != PromotionKind::OneTime {
                return Err(EngineError::Validation(format!(
                    "promotion {promotion_id} is automatic and cannot be requested"
                )));
            }
            if !promotion.is_active_at(at) {
                return Err(EngineError::Validation(format!(
                    "promotion {promotion_id} is not active"
                )));
            }
            if !promotion.meets_minimum(spent_minor) {
                return Err(EngineError::Validation(format!(
                    "promotion {promotion_id} requires a higher spend"
                )));
            }
            let used = promotion_usages::Entity::find_by_id((
                promotion_id.to_string(),
                customer_id.to_string(),
            ))
            .one(db)
            .await?
            .is_some();
            if used {
                return Err(already_used(*promotion_id));
            }
            matched.add(&promotion, spent_minor)?;
        }

        Ok(matched)
    }

    /// Mark one-time promotions as used by `customer_id`.
    ///
    /// Must run in the same atomic unit as the purchase insert. The usage key
    /// rejects a concurrent second use even if both purchases passed
    /// [`Engine::match_promotions`].
    pub(super) async fn consume_one_time_promotions<C: ConnectionTrait>(
        &self,
        db: &C,
        customer_id: Uuid,
        transaction_id: Uuid,
        promotion_ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        for promotion_id in promotion_ids {
            promotion_usages::ActiveModel {
                promotion_id: ActiveValue::Set(promotion_id.to_string()),
                user_id: ActiveValue::Set(customer_id.to_string()),
                transaction_id: ActiveValue::Set(transaction_id.to_string()),
                used_at: ActiveValue::Set(at),
            }
            .insert(db)
            .await
            .map_err(|err| on_unique_violation(err, already_used(*promotion_id)))?;
        }
        Ok(())
    }

    pub async fn create_promotion(
        &self,
        cmd: CreatePromotionCmd,
        principal: &Principal,
    ) -> ResultEngine<Promotion> {
        principal.require(Role::Manager, "create promotion")?;
        let name = normalize_required_name(&cmd.name, "promotion")?;
        validate_window(cmd.starts_at, cmd.ends_at, "promotion")?;
        validate_terms(cmd.min_spending_minor, cmd.rate, cmd.bonus_points)?;
        if cmd.rate.is_none() && cmd.bonus_points.is_none() {
            return Err(EngineError::Validation(
                "promotion needs a rate or bonus points".to_string(),
            ));
        }

        let promotion = Promotion {
            id: Uuid::new_v4(),
            name,
            description: normalize_optional_text(cmd.description.as_deref()),
            kind: cmd.kind,
            starts_at: cmd.starts_at,
            ends_at: cmd.ends_at,
            min_spending_minor: cmd.min_spending_minor,
            rate: cmd.rate,
            bonus_points: cmd.bonus_points,
        };
        let created = self
            .with_tx(|_engine, db_tx| {
                Box::pin(async move {
                    let model: promotions::ActiveModel = (&promotion).into();
                    model.insert(db_tx).await?;
                    Ok(promotion)
                })
            })
            .await?;
        tracing::info!(
            promotion_id = %created.id,
            kind = created.kind.as_str(),
            "promotion created"
        );
        Ok(created)
    }

    pub async fn promotion(&self, promotion_id: Uuid) -> ResultEngine<Promotion> {
        self.store
            .bounded(async {
                let model = promotions::Entity::find_by_id(promotion_id.to_string())
                    .one(self.database())
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("promotion {promotion_id}")))?;
                Promotion::try_from(model)
            })
            .await
    }

    /// Change a promotion. Once it has started, its start time and the terms
    /// a purchase earns by are frozen; name, description and end stay
    /// editable.
    pub async fn update_promotion(
        &self,
        promotion_id: Uuid,
        update: PromotionUpdate,
        principal: &Principal,
    ) -> ResultEngine<Promotion> {
        principal.require(Role::Manager, "update promotion")?;
        if update.is_empty() {
            return Err(EngineError::Validation(
                "promotion update has no changes".to_string(),
            ));
        }
        validate_terms(update.min_spending_minor, update.rate, update.bonus_points)?;
        let name = update
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "promotion"))
            .transpose()?;
        let now = Utc::now();

        let updated = self
            .with_tx(|_engine, db_tx| {
                Box::pin(async move {
                    let model = promotions::Entity::find_by_id(promotion_id.to_string())
                        .one(db_tx)
                        .await?
                        .ok_or_else(|| {
                            EngineError::NotFound(format!("promotion {promotion_id}"))
                        })?;
                    let mut promotion = Promotion::try_from(model)?;
                    if promotion.starts_at <= now
                        && (update.starts_at.is_some() || update.touches_terms())
                    {
                        return Err(EngineError::Validation(format!(
                            "promotion {promotion_id} has already started"
                        )));
                    }

                    if let Some(name) = name {
                        promotion.name = name;
                    }
                    if update.description.is_some() {
                        promotion.description =
                            normalize_optional_text(update.description.as_deref());
                    }
                    promotion.starts_at = update.starts_at.unwrap_or(promotion.starts_at);
                    promotion.ends_at = update.ends_at.unwrap_or(promotion.ends_at);
                    validate_window(promotion.starts_at, promotion.ends_at, "promotion")?;
                    if update.min_spending_minor.is_some() {
                        promotion.min_spending_minor = update.min_spending_minor;
                    }
                    if update.rate.is_some() {
                        promotion.rate = update.rate;
                    }
                    if update.bonus_points.is_some() {
                        promotion.bonus_points = update.bonus_points;
                    }

                    let active: promotions::ActiveModel = (&promotion).into();
                    active.update(db_tx).await?;
                    Ok(promotion)
                })
            })
            .await?;
        tracing::info!(promotion_id = %promotion_id, "promotion updated");
        Ok(updated)
    }

    /// Delete a promotion that has not started yet.
    pub async fn delete_promotion(
        &self,
        promotion_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<()> {
        principal.require(Role::Manager, "delete promotion")?;
        let now = Utc::now();
        self.with_tx(|_engine, db_tx| {
            Box::pin(async move {
                let model = promotions::Entity::find_by_id(promotion_id.to_string())
                    .one(db_tx)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("promotion {promotion_id}")))?;
                if model.starts_at <= now {
                    return Err(EngineError::Validation(format!(
                        "promotion {promotion_id} has already started"
                    )));
                }
                promotions::Entity::delete_by_id(model.id).exec(db_tx).await?;
                Ok(())
            })
        })
        .await?;
        tracing::info!(promotion_id = %promotion_id, "promotion deleted");
        Ok(())
    }
}

fn validate_terms(
    min_spending_minor: Option<i64>,
    rate: Option<f64>,
    bonus_points: Option<i64>,
) -> ResultEngine<()> {
    if min_spending_minor.is_some_and(|v| v < 0) {
        return Err(EngineError::Validation(
            "min_spending must be >= 0".to_string(),
        ));
    }
    if rate.is_some_and(|v| !v.is_finite() || v < 0.0) {
        return Err(EngineError::Validation("rate must be >= 0".to_string()));
    }
    if bonus_points.is_some_and(|v| v < 0) {
        return Err(EngineError::Validation(
            "bonus points must be >= 0".to_string(),
        ));
    }
    Ok(())
}

fn already_used(promotion_id: Uuid) -> EngineError {
    EngineError::Validation(format!("promotion {promotion_id} already used"))
}
