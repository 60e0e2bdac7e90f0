use std::collections::HashMap;

use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, transactions, users,
    util::parse_uuid,
};

use super::Engine;

/// Cached balance next to the balance recomputed from the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub user_id: Uuid,
    pub cached_points: i64,
    pub ledger_points: i64,
}

impl BalanceReport {
    pub fn is_consistent(&self) -> bool {
        self.cached_points == self.ledger_points
    }
}

impl Engine {
    /// `true` when the cached balance equals the sum of the user's counting
    /// ledger entries.
    ///
    /// Diagnostic only; writes never consult it.
    pub async fn verify_balance(&self, user_id: Uuid) -> ResultEngine<bool> {
        Ok(self.balance_report(user_id).await?.is_consistent())
    }

    pub async fn balance_report(&self, user_id: Uuid) -> ResultEngine<BalanceReport> {
        self.store
            .bounded(async {
                let db = self.database();
                let user = self.require_user(db, user_id).await?;
                let entries = transactions::Entity::find()
                    .filter(transactions::Column::UserId.eq(user.id.clone()))
                    .filter(transactions::counting_condition())
                    .all(db)
                    .await?;
                let ledger_points = sum_deltas(entries.iter().map(|e| e.points_delta))?;
                Ok(BalanceReport {
                    user_id,
                    cached_points: user.points,
                    ledger_points,
                })
            })
            .await
    }

    /// Every user whose cached balance disagrees with the ledger, ordered by
    /// handle. Read-only: fixing a drift is an operator decision.
    pub async fn reconcile_balances(&self) -> ResultEngine<Vec<BalanceReport>> {
        self.store
            .bounded(async {
                let db = self.database();
                let users = users::Entity::find()
                    .order_by_asc(users::Column::Handle)
                    .all(db)
                    .await?;
                let entries = transactions::Entity::find()
                    .filter(transactions::counting_condition())
                    .all(db)
                    .await?;

                let mut ledger: HashMap<String, Vec<i64>> = HashMap::new();
                for entry in entries {
                    ledger
                        .entry(entry.user_id)
                        .or_default()
                        .push(entry.points_delta);
                }

                let mut drifted = Vec::new();
                for user in users {
                    let deltas = ledger.remove(&user.id).unwrap_or_default();
                    let report = BalanceReport {
                        user_id: parse_uuid(&user.id, "user")?,
                        cached_points: user.points,
                        ledger_points: sum_deltas(deltas)?,
                    };
                    if !report.is_consistent() {
                        tracing::warn!(
                            user_id = %report.user_id,
                            cached = report.cached_points,
                            ledger = report.ledger_points,
                            "balance drift"
                        );
                        drifted.push(report);
                    }
                }
                Ok(drifted)
            })
            .await
    }

    /// Guarded debit: succeeds only when the user holds at least `amount`.
    pub(super) async fn debit_points<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
        amount: i64,
    ) -> ResultEngine<()> {
        let result = users::Entity::update_many()
            .col_expr(
                users::Column::Points,
                Expr::col(users::Column::Points).sub(amount),
            )
            .filter(users::Column::Id.eq(user_id.to_string()))
            .filter(users::Column::Points.gte(amount))
            .exec(db)
            .await?;
        if result.rows_affected == 1 {
            return Ok(());
        }
        let user = self.require_user(db, user_id).await?;
        Err(EngineError::InsufficientBalance(format!(
            "user {user_id} holds {} points, {amount} required",
            user.points
        )))
    }

    /// Unconditional balance change; the balance may go negative.
    pub(super) async fn apply_points<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
        delta: i64,
    ) -> ResultEngine<()> {
        let result = users::Entity::update_many()
            .col_expr(
                users::Column::Points,
                Expr::col(users::Column::Points).add(delta),
            )
            .filter(users::Column::Id.eq(user_id.to_string()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }
}

fn sum_deltas(deltas: impl IntoIterator<Item = i64>) -> ResultEngine<i64> {
    deltas.into_iter().try_fold(0_i64, |acc, delta| {
        acc.checked_add(delta)
            .ok_or_else(|| EngineError::Validation("ledger sum overflows".to_string()))
    })
}
