use chrono::Utc;

use crate::{
    AdjustmentCmd, EngineError, Principal, ResultEngine, Role, Transaction, TransactionKind,
    util::normalize_optional_text,
};

use super::super::super::Engine;

impl Engine {
    /// Manager correction tied to an existing transaction.
    ///
    /// The amount is signed and applied unconditionally, so an adjustment may
    /// leave the balance negative.
    pub(crate) async fn adjustment(
        &self,
        cmd: AdjustmentCmd,
        principal: &Principal,
    ) -> ResultEngine<Transaction> {
        principal.require(Role::Manager, "adjustment")?;
        if cmd.amount == 0 {
            return Err(EngineError::Validation(
                "adjustment amount must not be zero".to_string(),
            ));
        }
        let AdjustmentCmd {
            user_id,
            related_transaction_id,
            amount,
            remark,
        } = cmd;
        let remark = normalize_optional_text(remark.as_deref());
        let manager_id = principal.id;

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                engine.require_user(db_tx, user_id).await?;
                engine
                    .require_transaction(db_tx, related_transaction_id)
                    .await?;

                let now = Utc::now();
                let mut tx =
                    Transaction::new(TransactionKind::Adjustment, user_id, manager_id, amount);
                tx.related_transaction_id = Some(related_transaction_id);
                tx.remark = remark;
                tx.created_at = now;
                tx.processed_at = Some(now);
                tx.processed_by = Some(manager_id);

                engine.insert_transaction(db_tx, &tx).await?;
                engine.apply_points(db_tx, user_id, amount).await?;
                Ok(tx)
            })
        })
        .await
    }
}
