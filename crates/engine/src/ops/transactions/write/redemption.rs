use chrono::Utc;

use crate::{
    Principal, RedemptionCmd, ResultEngine, Role, Transaction, TransactionKind,
    util::normalize_optional_text,
};

use super::{super::super::Engine, require_positive};

impl Engine {
    /// Spend the caller's own points.
    ///
    /// The points leave the balance immediately; the record stays
    /// unprocessed until a cashier hands out the reward.
    pub(crate) async fn redemption(
        &self,
        cmd: RedemptionCmd,
        principal: &Principal,
    ) -> ResultEngine<Transaction> {
        principal.require(Role::Regular, "redemption")?;
        require_positive(cmd.amount, "amount")?;
        let amount = cmd.amount;
        let remark = normalize_optional_text(cmd.remark.as_deref());
        let user_id = principal.id;

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                // Debit first: the guarded update is the balance check.
                engine.debit_points(db_tx, user_id, amount).await?;

                let mut tx =
                    Transaction::new(TransactionKind::Redemption, user_id, user_id, -amount);
                tx.processed = false;
                tx.remark = remark;
                tx.created_at = Utc::now();
                engine.insert_transaction(db_tx, &tx).await?;
                Ok(tx)
            })
        })
        .await
    }
}
