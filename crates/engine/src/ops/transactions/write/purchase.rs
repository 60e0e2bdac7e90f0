use std::collections::HashSet;

use chrono::Utc;

use crate::{
    EngineError, Principal, PurchaseCmd, ResultEngine, Role, Transaction, TransactionKind,
    util::normalize_optional_text,
};

use super::{super::super::Engine, require_positive};

impl Engine {
    /// Credit a customer for money spent at the counter.
    ///
    /// Points are `floor(spent / cents_per_point)` plus the bonus of every
    /// matching promotion. A purchase rung up by a suspicious cashier is held
    /// for verification and credits nothing until processed.
    pub(crate) async fn purchase(
        &self,
        cmd: PurchaseCmd,
        principal: &Principal,
    ) -> ResultEngine<Transaction> {
        principal.require(Role::Cashier, "purchase")?;
        require_positive(cmd.spent_minor, "spent")?;
        let mut seen = HashSet::with_capacity(cmd.promotion_ids.len());
        if let Some(duplicate) = cmd.promotion_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(EngineError::Validation(format!(
                "promotion {duplicate} listed more than once"
            )));
        }

        let base_points = cmd.spent_minor / self.config.cents_per_point;
        let remark = normalize_optional_text(cmd.remark.as_deref());
        let cashier = *principal;
        let now = Utc::now();

        self.with_tx(|engine, db_tx| {
            Box::pin(async move {
                let PurchaseCmd {
                    customer_id,
                    spent_minor,
                    promotion_ids,
                    ..
                } = cmd;
                engine.require_user(db_tx, customer_id).await?;

                let matched = engine
                    .match_promotions(db_tx, customer_id, spent_minor, &promotion_ids, now)
                    .await?;
                let points = base_points.checked_add(matched.bonus).ok_or_else(|| {
                    EngineError::Validation("purchase points overflow".to_string())
                })?;

                let mut tx =
                    Transaction::new(TransactionKind::Purchase, customer_id, cashier.id, points);
                tx.spent_minor = Some(spent_minor);
                tx.cashier_id = Some(cashier.id);
                tx.remark = remark;
                tx.created_at = now;
                tx.promotion_ids = matched.applied;
                if cashier.suspicious {
                    tx.processed = false;
                    tx.requires_verification = true;
                } else {
                    tx.processed_at = Some(now);
                    tx.processed_by = Some(cashier.id);
                }

                engine.insert_transaction(db_tx, &tx).await?;
                engine
                    .consume_one_time_promotions(db_tx, customer_id, tx.id, &matched.one_time, now)
                    .await?;
                if tx.counts_toward_balance() {
                    engine.apply_points(db_tx, customer_id, points).await?;
                }
                Ok(tx)
            })
        })
        .await
    }
}
