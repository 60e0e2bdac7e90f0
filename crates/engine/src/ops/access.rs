use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Principal, ResultEngine, Role, Transaction, User, event_organizers, events,
    transaction_promotions, transactions, users,
    util::parse_uuid,
};

use super::Engine;

impl Engine {
    /// Resolve the caller behind an authenticated user id.
    pub async fn principal(&self, user_id: Uuid) -> ResultEngine<Principal> {
        self.store
            .bounded(async {
                let model = self.require_user(self.database(), user_id).await?;
                Ok(User::try_from(model)?.principal())
            })
            .await
    }

    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }

    pub(super) async fn require_transaction<C: ConnectionTrait>(
        &self,
        db: &C,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {transaction_id}")))
    }

    pub(super) async fn require_event<C: ConnectionTrait>(
        &self,
        db: &C,
        event_id: Uuid,
    ) -> ResultEngine<events::Model> {
        events::Entity::find_by_id(event_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("event {event_id}")))
    }

    pub(super) async fn is_event_organizer<C: ConnectionTrait>(
        &self,
        db: &C,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<bool> {
        event_organizers::Entity::find_by_id((event_id.to_string(), user_id.to_string()))
            .one(db)
            .await
            .map(|model| model.is_some())
            .map_err(Into::into)
    }

    /// Event must exist; caller must organize it or be at least a manager.
    pub(super) async fn require_event_staff<C: ConnectionTrait>(
        &self,
        db: &C,
        event_id: Uuid,
        principal: &Principal,
        action: &str,
    ) -> ResultEngine<events::Model> {
        let event = self.require_event(db, event_id).await?;
        if principal.is_at_least(Role::Manager)
            || self.is_event_organizer(db, event_id, principal.id).await?
        {
            return Ok(event);
        }
        Err(EngineError::PermissionDenied(format!(
            "{action} requires an organizer of the event or role manager"
        )))
    }

    /// Convert a stored transaction and attach the promotions it used.
    pub(super) async fn load_transaction<C: ConnectionTrait>(
        &self,
        db: &C,
        model: transactions::Model,
    ) -> ResultEngine<Transaction> {
        let links = transaction_promotions::Entity::find()
            .filter(transaction_promotions::Column::TransactionId.eq(model.id.clone()))
            .all(db)
            .await?;
        let mut tx = Transaction::try_from(model)?;
        tx.promotion_ids = links
            .iter()
            .map(|link| parse_uuid(&link.promotion_id, "promotion"))
            .collect::<ResultEngine<Vec<_>>>()?;
        Ok(tx)
    }
}
