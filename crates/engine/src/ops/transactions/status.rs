//! Processing state transitions.
//!
//! Financial fields never change after insert; these operations only flip
//! `processed`/`requires_verification` and move the delta in or out of the
//! balance accordingly.

use chrono::Utc;
use sea_orm::{QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    EngineError, Principal, ResultEngine, Role, Transaction, TransactionKind, transactions,
    util::parse_uuid,
};

use super::super::Engine;

impl Engine {
    /// Mark a transaction as processed.
    ///
    /// A held purchase (or a flagged transaction) starts counting now; a
    /// pending redemption was already debited, so for it this is a pure status
    /// flip. The flip is conditional on the transaction still being
    /// unprocessed, so two concurrent calls cannot both apply the delta.
    ///
    /// Cashiers may only complete pending redemptions. Anything awaiting
    /// verification (a held purchase or a flagged transaction) needs a
    /// manager, and a principal marked suspicious cannot process at all.
    pub async fn process_transaction(
        &self,
        transaction_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Transaction> {
        principal.require(Role::Cashier, "process transaction")?;
        if principal.suspicious {
            return Err(EngineError::PermissionDenied(
                "process transaction: caller is marked suspicious".to_string(),
            ));
        }
        let processor_id = principal.id;
        let principal = *principal;

        let processed = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    let model = engine.require_transaction(db_tx, transaction_id).await?;
                    if model.processed {
                        return Err(already_processed(transaction_id));
                    }
                    if model.requires_verification {
                        principal.require(Role::Manager, "verify transaction")?;
                    }
                    let kind = TransactionKind::try_from(model.kind.as_str())?;
                    let counted_before = transactions::counts_toward_balance(
                        kind,
                        model.processed,
                        model.requires_verification,
                    );

                    let now = Utc::now();
                    let result = transactions::Entity::update_many()
                        .col_expr(transactions::Column::Processed, Expr::value(true))
                        .col_expr(
                            transactions::Column::RequiresVerification,
                            Expr::value(false),
                        )
                        .col_expr(transactions::Column::ProcessedAt, Expr::value(now))
                        .col_expr(
                            transactions::Column::ProcessedBy,
                            Expr::value(processor_id.to_string()),
                        )
                        .filter(transactions::Column::Id.eq(model.id.clone()))
                        .filter(transactions::Column::Processed.eq(false))
                        .exec(db_tx)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(already_processed(transaction_id));
                    }

                    if !counted_before {
                        let user_id = parse_uuid(&model.user_id, "user")?;
                        if model.points_delta < 0 {
                            engine
                                .debit_points(db_tx, user_id, -model.points_delta)
                                .await?;
                        } else {
                            engine
                                .apply_points(db_tx, user_id, model.points_delta)
                                .await?;
                        }
                    }

                    let model = engine.require_transaction(db_tx, transaction_id).await?;
                    engine.load_transaction(db_tx, model).await
                })
            })
            .await?;
        tracing::info!(
            transaction_id = %transaction_id,
            by = %processor_id,
            "transaction processed"
        );
        Ok(processed)
    }

    /// Flag a processed transaction as suspicious.
    ///
    /// The transaction stops counting and its delta is reversed in the same
    /// atomic unit; the balance may go negative. Processing it again restores
    /// the delta.
    pub async fn flag_suspicious(
        &self,
        transaction_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Transaction> {
        principal.require(Role::Manager, "flag transaction")?;

        let flagged = self
            .with_tx(|engine, db_tx| {
                Box::pin(async move {
                    let model = engine.require_transaction(db_tx, transaction_id).await?;
                    if !model.processed {
                        return Err(not_processed(transaction_id));
                    }

                    let result = transactions::Entity::update_many()
                        .col_expr(transactions::Column::Processed, Expr::value(false))
                        .col_expr(
                            transactions::Column::RequiresVerification,
                            Expr::value(true),
                        )
                        .filter(transactions::Column::Id.eq(model.id.clone()))
                        .filter(transactions::Column::Processed.eq(true))
                        .exec(db_tx)
                        .await?;
                    if result.rows_affected == 0 {
                        return Err(not_processed(transaction_id));
                    }

                    let user_id = parse_uuid(&model.user_id, "user")?;
                    let reversal = model.points_delta.checked_neg().ok_or_else(|| {
                        EngineError::Validation("points delta overflows".to_string())
                    })?;
                    engine.apply_points(db_tx, user_id, reversal).await?;

                    let model = engine.require_transaction(db_tx, transaction_id).await?;
                    engine.load_transaction(db_tx, model).await
                })
            })
            .await?;
        tracing::warn!(
            transaction_id = %transaction_id,
            by = %principal.id,
            "transaction flagged suspicious"
        );
        Ok(flagged)
    }
}

fn already_processed(transaction_id: Uuid) -> EngineError {
    EngineError::AlreadyProcessed(format!("transaction {transaction_id}"))
}

fn not_processed(transaction_id: Uuid) -> EngineError {
    EngineError::NotProcessed(format!("transaction {transaction_id}"))
}
