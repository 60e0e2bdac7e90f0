use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    CreateEventCmd, EngineError, Event, EventUpdate, Guest, Principal, ResultEngine, Role,
    Transaction, TransactionKind, event_guests, event_organizers, events,
    util::{normalize_optional_text, normalize_required_name, parse_uuid, validate_window},
};

use super::Engine;

/// Outcome of [`Engine::award_to_attendees`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AwardResult {
    pub event_id: Uuid,
    pub points_per_person: i64,
    pub total_awarded: i64,
    pub remaining_budget: i64,
    pub transactions: Vec<Transaction>,
}

impl Engine {
    pub async fn create_event(
        &self,
        cmd: CreateEventCmd,
        principal: &Principal,
    ) -> ResultEngine<Event> {
        principal.require(Role::Manager, "create event")?;
        let name = normalize_required_name(&cmd.name, "event")?;
        validate_window(cmd.starts_at, cmd.ends_at, "event")?;
        if cmd.capacity <= 0 {
            return Err(EngineError::Validation("capacity must be > 0".to_string()));
        }
        if cmd.points_budget <= 0 {
            return Err(EngineError::Validation(
                "points budget must be > 0".to_string(),
            ));
        }

        let event = Event {
            id: Uuid::new_v4(),
            name,
            description: normalize_optional_text(cmd.description.as_deref()),
            location: normalize_optional_text(cmd.location.as_deref()),
            starts_at: cmd.starts_at,
            ends_at: cmd.ends_at,
            capacity: cmd.capacity,
            points_budget: cmd.points_budget,
            points_remain: cmd.points_budget,
            points_awarded: 0,
            created_by: principal.id,
            organizers: Vec::new(),
            guests: Vec::new(),
        };
        let created = self
            .with_tx(|_engine, db_tx| {
                Box::pin(async move {
                    let model: events::ActiveModel = (&event).into();
                    model.insert(db_tx).await?;
                    Ok(event)
                })
            })
            .await?;
        tracing::info!(event_id = %created.id, budget = created.points_budget, "event created");
        Ok(created)
    }

    /// Event with its organizers and guest list.
    pub async fn event(&self, event_id: Uuid) -> ResultEngine<Event> {
        self.store
            .bounded(async { self.load_event(self.database(), event_id).await })
            .await
    }

    /// Change an event's details, schedule, capacity or budget.
    ///
    /// Details are frozen once the event has ended. A new budget may not be
    /// lower than what was already awarded; the remaining budget becomes the
    /// difference, so `points_remain + points_awarded` keeps matching it.
    pub async fn update_event(
        &self,
        event_id: Uuid,
        update: EventUpdate,
        principal: &Principal,
    ) -> ResultEngine<Event> {
        principal.require(Role::Manager, "update event")?;
        if update.is_empty() {
            return Err(EngineError::Validation(
                "event update has no changes".to_string(),
            ));
        }
        let name = update
            .name
            .as_deref()
            .map(|name| normalize_required_name(name, "event"))
            .transpose()?;
        if update.capacity.is_some_and(|capacity| capacity <= 0) {
            return Err(EngineError::Validation("capacity must be > 0".to_string()));
        }
        if update.points_budget.is_some_and(|budget| budget <= 0) {
            return Err(EngineError::Validation(
                "points budget must be > 0".to_string(),
            ));
        }
        let now = Utc::now();

        let updated = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    let model = engine.require_event(db_tx, event_id).await?;
                    if model.ends_at <= now && update.touches_details() {
                        return Err(EngineError::Validation(format!(
                            "event {event_id} has ended"
                        )));
                    }
                    let starts_at = update.starts_at.unwrap_or(model.starts_at);
                    let ends_at = update.ends_at.unwrap_or(model.ends_at);
                    validate_window(starts_at, ends_at, "event")?;
                    if let Some(capacity) = update.capacity {
                        let guests = event_guests::Entity::find()
                            .filter(event_guests::Column::EventId.eq(model.id.clone()))
                            .count(db_tx)
                            .await?;
                        if guests > u64::try_from(capacity).unwrap_or(0) {
                            return Err(EngineError::Validation(format!(
                                "event {event_id} already has {guests} guests"
                            )));
                        }
                    }

                    let mut active: events::ActiveModel = model.into();
                    if let Some(name) = name {
                        active.name = ActiveValue::Set(name);
                    }
                    if let Some(description) = update.description.as_deref() {
                        active.description =
                            ActiveValue::Set(normalize_optional_text(Some(description)));
                    }
                    if let Some(location) = update.location.as_deref() {
                        active.location = ActiveValue::Set(normalize_optional_text(Some(location)));
                    }
                    active.starts_at = ActiveValue::Set(starts_at);
                    active.ends_at = ActiveValue::Set(ends_at);
                    if let Some(capacity) = update.capacity {
                        active.capacity = ActiveValue::Set(capacity);
                    }
                    active.update(db_tx).await?;

                    if let Some(budget) = update.points_budget {
                        engine.set_budget(db_tx, event_id, budget).await?;
                    }
                    engine.load_event(db_tx, event_id).await
                })
            })
            .await?;
        tracing::info!(
            event_id = %event_id,
            budget = updated.points_budget,
            remaining = updated.points_remain,
            "event updated"
        );
        Ok(updated)
    }

    /// Delete an event that has not started and has awarded nothing. Its
    /// organizer and guest lists go with it.
    pub async fn delete_event(&self, event_id: Uuid, principal: &Principal) -> ResultEngine<()> {
        principal.require(Role::Manager, "delete event")?;
        let now = Utc::now();
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let model = engine.require_event(db_tx, event_id).await?;
                if model.starts_at <= now {
                    return Err(EngineError::Validation(format!(
                        "event {event_id} has already started"
                    )));
                }
                if model.points_awarded > 0 {
                    return Err(EngineError::Validation(format!(
                        "event {event_id} has already awarded points"
                    )));
                }
                event_guests::Entity::delete_many()
                    .filter(event_guests::Column::EventId.eq(model.id.clone()))
                    .exec(db_tx)
                    .await?;
                event_organizers::Entity::delete_many()
                    .filter(event_organizers::Column::EventId.eq(model.id.clone()))
                    .exec(db_tx)
                    .await?;
                events::Entity::delete_by_id(model.id).exec(db_tx).await?;
                Ok(())
            })
        })
        .await?;
        tracing::info!(event_id = %event_id, "event deleted");
        Ok(())
    }

    pub async fn add_organizer(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Event> {
        principal.require(Role::Manager, "add organizer")?;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_event(db_tx, event_id).await?;
                engine.require_user(db_tx, user_id).await?;
                if engine.find_guest(db_tx, event_id, user_id).await?.is_some() {
                    return Err(EngineError::Validation(format!(
                        "user {user_id} is a guest of event {event_id}"
                    )));
                }
                if engine.is_event_organizer(db_tx, event_id, user_id).await? {
                    return Err(EngineError::ExistingKey(format!("organizer {user_id}")));
                }
                event_organizers::ActiveModel {
                    event_id: ActiveValue::Set(event_id.to_string()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                }
                .insert(db_tx)
                .await?;
                engine.load_event(db_tx, event_id).await
            })
        })
        .await
    }

    pub async fn remove_organizer(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Event> {
        principal.require(Role::Manager, "remove organizer")?;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_event(db_tx, event_id).await?;
                let result = event_organizers::Entity::delete_by_id((
                    event_id.to_string(),
                    user_id.to_string(),
                ))
                .exec(db_tx)
                .await?;
                if result.rows_affected == 0 {
                    return Err(EngineError::NotFound(format!("organizer {user_id}")));
                }
                engine.load_event(db_tx, event_id).await
            })
        })
        .await
    }

    /// Put a user on the guest list. Organizers of the event and managers
    /// only; members add themselves through [`Engine::rsvp`].
    pub async fn add_guest(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Event> {
        let principal = *principal;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let event = engine
                    .require_event_staff(db_tx, event_id, &principal, "add guest")
                    .await?;
                engine.insert_guest(db_tx, &event, user_id).await?;
                engine.load_event(db_tx, event_id).await
            })
        })
        .await
    }

    /// The caller puts themself on the guest list.
    pub async fn rsvp(&self, event_id: Uuid, principal: &Principal) -> ResultEngine<Event> {
        let user_id = principal.id;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let event = engine.require_event(db_tx, event_id).await?;
                engine.insert_guest(db_tx, &event, user_id).await?;
                engine.load_event(db_tx, event_id).await
            })
        })
        .await
    }

    /// Remove a guest. Allowed to the guest themself, event organizers and
    /// managers.
    pub async fn remove_guest(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Event> {
        let principal = *principal;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                if principal.id == user_id {
                    engine.require_event(db_tx, event_id).await?;
                } else {
                    engine
                        .require_event_staff(db_tx, event_id, &principal, "remove guest")
                        .await?;
                }
                let result = event_guests::Entity::delete_by_id((
                    event_id.to_string(),
                    user_id.to_string(),
                ))
                .exec(db_tx)
                .await?;
                if result.rows_affected == 0 {
                    return Err(EngineError::NotFound(format!("guest {user_id}")));
                }
                engine.load_event(db_tx, event_id).await
            })
        })
        .await
    }

    pub async fn mark_attended(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Event> {
        let principal = *principal;
        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine
                    .require_event_staff(db_tx, event_id, &principal, "mark attendance")
                    .await?;
                let guest = engine
                    .find_guest(db_tx, event_id, user_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("guest {user_id}")))?;
                let mut active: event_guests::ActiveModel = guest.into();
                active.attended = ActiveValue::Set(true);
                active.update(db_tx).await?;
                engine.load_event(db_tx, event_id).await
            })
        })
        .await
    }

    /// Award `points_per_person` to every guest marked as attended.
    ///
    /// One processed event transaction per attendee; all of them, the credits
    /// and the budget decrement commit together or not at all.
    pub async fn award_to_attendees(
        &self,
        event_id: Uuid,
        points_per_person: i64,
        principal: &Principal,
    ) -> ResultEngine<AwardResult> {
        if points_per_person <= 0 {
            return Err(EngineError::Validation(
                "points per person must be > 0".to_string(),
            ));
        }
        let principal = *principal;

        let awarded = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    engine
                        .require_event_staff(db_tx, event_id, &principal, "award attendees")
                        .await?;
                    let attendees = event_guests::Entity::find()
                        .filter(event_guests::Column::EventId.eq(event_id.to_string()))
                        .filter(event_guests::Column::Attended.eq(true))
                        .order_by_asc(event_guests::Column::UserId)
                        .all(db_tx)
                        .await?;
                    if attendees.is_empty() {
                        return Err(EngineError::NoAttendees(format!(
                            "event {event_id} has no confirmed attendees"
                        )));
                    }
                    let total = i64::try_from(attendees.len())
                        .ok()
                        .and_then(|count| count.checked_mul(points_per_person))
                        .ok_or_else(|| {
                            EngineError::Validation("award total overflows".to_string())
                        })?;

                    engine.consume_budget(db_tx, event_id, total).await?;

                    let now = Utc::now();
                    let mut transactions = Vec::with_capacity(attendees.len());
                    for attendee in attendees {
                        let user_id = parse_uuid(&attendee.user_id, "user")?;
                        let mut tx = Transaction::new(
                            TransactionKind::Event,
                            user_id,
                            principal.id,
                            points_per_person,
                        );
                        tx.event_id = Some(event_id);
                        tx.created_at = now;
                        tx.processed_at = Some(now);
                        tx.processed_by = Some(principal.id);
                        engine.insert_transaction(db_tx, &tx).await?;
                        engine
                            .apply_points(db_tx, user_id, points_per_person)
                            .await?;
                        transactions.push(tx);
                    }

                    let event = engine.require_event(db_tx, event_id).await?;
                    Ok(AwardResult {
                        event_id,
                        points_per_person,
                        total_awarded: total,
                        remaining_budget: event.points_remain,
                        transactions,
                    })
                })
            })
            .await?;
        tracing::info!(
            event_id = %event_id,
            attendees = awarded.transactions.len(),
            total = awarded.total_awarded,
            remaining = awarded.remaining_budget,
            "event points awarded"
        );
        Ok(awarded)
    }

    /// Guarded budget decrement: moves `total` from the remaining budget to
    /// the awarded counter only if enough is left.
    pub(super) async fn consume_budget<C: ConnectionTrait>(
        &self,
        db: &C,
        event_id: Uuid,
        total: i64,
    ) -> ResultEngine<()> {
        let result = events::Entity::update_many()
            .col_expr(
                events::Column::PointsRemain,
                Expr::col(events::Column::PointsRemain).sub(total),
            )
            .col_expr(
                events::Column::PointsAwarded,
                Expr::col(events::Column::PointsAwarded).add(total),
            )
            .filter(events::Column::Id.eq(event_id.to_string()))
            .filter(events::Column::PointsRemain.gte(total))
            .exec(db)
            .await?;
        if result.rows_affected == 1 {
            return Ok(());
        }
        let event = self.require_event(db, event_id).await?;
        Err(EngineError::InsufficientBudget(format!(
            "event {event_id} has {} points left, {total} requested",
            event.points_remain
        )))
    }

    /// Guarded budget change: the new budget must cover what was already
    /// awarded, checked against the row as it is at write time.
    async fn set_budget<C: ConnectionTrait>(
        &self,
        db: &C,
        event_id: Uuid,
        budget: i64,
    ) -> ResultEngine<()> {
        let result = events::Entity::update_many()
            .col_expr(events::Column::PointsBudget, Expr::value(budget))
            .col_expr(
                events::Column::PointsRemain,
                Expr::val(budget).sub(Expr::col(events::Column::PointsAwarded)),
            )
            .filter(events::Column::Id.eq(event_id.to_string()))
            .filter(events::Column::PointsAwarded.lte(budget))
            .exec(db)
            .await?;
        if result.rows_affected == 1 {
            return Ok(());
        }
        let event = self.require_event(db, event_id).await?;
        Err(EngineError::Validation(format!(
            "event {event_id} already awarded {} points, budget {budget} is too low",
            event.points_awarded
        )))
    }

    async fn find_guest<C: ConnectionTrait>(
        &self,
        db: &C,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<Option<event_guests::Model>> {
        event_guests::Entity::find_by_id((event_id.to_string(), user_id.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    async fn insert_guest<C: ConnectionTrait>(
        &self,
        db: &C,
        event: &events::Model,
        user_id: Uuid,
    ) -> ResultEngine<()> {
        let event_id = parse_uuid(&event.id, "event")?;
        self.require_user(db, user_id).await?;
        if event.ends_at <= Utc::now() {
            return Err(EngineError::Validation(format!(
                "event {event_id} has ended"
            )));
        }
        if self.is_event_organizer(db, event_id, user_id).await? {
            return Err(EngineError::Validation(format!(
                "user {user_id} organizes event {event_id}"
            )));
        }
        if self.find_guest(db, event_id, user_id).await?.is_some() {
            return Err(EngineError::ExistingKey(format!("guest {user_id}")));
        }
        let guests = event_guests::Entity::find()
            .filter(event_guests::Column::EventId.eq(event.id.clone()))
            .count(db)
            .await?;
        if guests >= u64::try_from(event.capacity).unwrap_or(0) {
            return Err(EngineError::Validation(format!(
                "event {event_id} is full"
            )));
        }
        event_guests::ActiveModel {
            event_id: ActiveValue::Set(event.id.clone()),
            user_id: ActiveValue::Set(user_id.to_string()),
            attended: ActiveValue::Set(false),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn load_event<C: ConnectionTrait>(&self, db: &C, event_id: Uuid) -> ResultEngine<Event> {
        let model = self.require_event(db, event_id).await?;
        let organizers = event_organizers::Entity::find()
            .filter(event_organizers::Column::EventId.eq(model.id.clone()))
            .order_by_asc(event_organizers::Column::UserId)
            .all(db)
            .await?;
        let guests = event_guests::Entity::find()
            .filter(event_guests::Column::EventId.eq(model.id.clone()))
            .order_by_asc(event_guests::Column::UserId)
            .all(db)
            .await?;

        let mut event = Event::try_from(model)?;
        event.organizers = organizers
            .iter()
            .map(|o| parse_uuid(&o.user_id, "user"))
            .collect::<ResultEngine<Vec<_>>>()?;
        event.guests = guests
            .iter()
            .map(|g| {
                Ok(Guest {
                    user_id: parse_uuid(&g.user_id, "user")?,
                    attended: g.attended,
                })
            })
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(event)
    }
}
