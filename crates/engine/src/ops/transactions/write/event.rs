use chrono::Utc;
use sea_orm::EntityTrait;

use crate::{
    EngineError, EventAwardCmd, Principal, ResultEngine, Transaction, TransactionKind,
    event_guests, util::normalize_optional_text,
};

use super::{super::super::Engine, require_positive};

impl Engine {
    /// Award points from an event budget to one attendee.
    ///
    /// Only organizers of the event (or managers) may award, and only to
    /// guests marked as attended.
    pub(crate) async fn event_award(
        &self,
        cmd: EventAwardCmd,
        principal: &Principal,
    ) -> ResultEngine<Transaction> {
        require_positive(cmd.amount, "amount")?;
        let EventAwardCmd {
            event_id,
            recipient_id,
            amount,
            remark,
        } = cmd;
        let remark = normalize_optional_text(remark.as_deref());
        let principal = *principal;

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine
                    .require_event_staff(db_tx, event_id, &principal, "event award")
                    .await?;
                engine.require_user(db_tx, recipient_id).await?;
                let attended = event_guests::Entity::find_by_id((
                    event_id.to_string(),
                    recipient_id.to_string(),
                ))
                .one(db_tx)
                .await?
                .is_some_and(|guest| guest.attended);
                if !attended {
                    return Err(EngineError::Validation(format!(
                        "user {recipient_id} did not attend event {event_id}"
                    )));
                }

                engine.consume_budget(db_tx, event_id, amount).await?;

                let now = Utc::now();
                let mut tx =
                    Transaction::new(TransactionKind::Event, recipient_id, principal.id, amount);
                tx.event_id = Some(event_id);
                tx.remark = remark;
                tx.created_at = now;
                tx.processed_at = Some(now);
                tx.processed_by = Some(principal.id);

                engine.insert_transaction(db_tx, &tx).await?;
                engine.apply_points(db_tx, recipient_id, amount).await?;
                Ok(tx)
            })
        })
        .await
    }
}
