use chrono::Utc;
use uuid::Uuid;

use crate::{
    EngineError, Principal, ResultEngine, Role, Transaction, TransactionKind, TransferCmd,
    util::normalize_optional_text,
};

use super::{
    super::{super::Engine, TransactionResult},
    require_positive,
};

impl Engine {
    /// Move points from the caller to another user.
    ///
    /// Writes two processed records, one per party, that point at each other
    /// through `related_transaction_id`. Both balances change in the same
    /// atomic unit, so either both records exist or neither does.
    pub(crate) async fn transfer(
        &self,
        cmd: TransferCmd,
        principal: &Principal,
    ) -> ResultEngine<TransactionResult> {
        principal.require(Role::Regular, "transfer")?;
        require_positive(cmd.amount, "amount")?;
        if cmd.recipient_id == principal.id {
            return Err(EngineError::Validation(
                "cannot transfer points to yourself".to_string(),
            ));
        }
        let TransferCmd {
            recipient_id,
            amount,
            remark,
        } = cmd;
        let remark = normalize_optional_text(remark.as_deref());
        let sender_id = principal.id;

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, recipient_id).await?;
                engine.debit_points(db_tx, sender_id, amount).await?;
                engine.apply_points(db_tx, recipient_id, amount).await?;

                let now = Utc::now();
                let sender_tx_id = Uuid::new_v4();
                let receiver_tx_id = Uuid::new_v4();

                let mut sender =
                    Transaction::new(TransactionKind::Transfer, sender_id, sender_id, -amount);
                sender.id = sender_tx_id;
                sender.related_transaction_id = Some(receiver_tx_id);
                sender.related_user_id = Some(recipient_id);
                sender.remark = remark.clone();
                sender.created_at = now;
                sender.processed_at = Some(now);
                sender.processed_by = Some(sender_id);

                let mut receiver =
                    Transaction::new(TransactionKind::Transfer, recipient_id, sender_id, amount);
                receiver.id = receiver_tx_id;
                receiver.related_transaction_id = Some(sender_tx_id);
                receiver.related_user_id = Some(sender_id);
                receiver.remark = remark;
                receiver.created_at = now;
                receiver.processed_at = Some(now);
                receiver.processed_by = Some(sender_id);

                engine.insert_transaction(db_tx, &sender).await?;
                engine.insert_transaction(db_tx, &receiver).await?;
                Ok(TransactionResult::Transfer { sender, receiver })
            })
        })
        .await
    }
}
