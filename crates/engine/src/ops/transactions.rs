use sea_orm::{
    ActiveModelTrait, ConnectionTrait, QueryFilter, QueryOrder, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, Principal, ResultEngine, Role, Transaction, TransactionRequest,
    transaction_promotions, transactions,
};

use super::Engine;

mod status;
mod write;

/// Outcome of [`Engine::create_transaction`].
///
/// A transfer always yields two linked records, every other type one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionResult {
    Single(Transaction),
    Transfer {
        sender: Transaction,
        receiver: Transaction,
    },
}

impl TransactionResult {
    /// The record of the caller's side: the single record, or the sender's
    /// record of a transfer.
    pub fn primary(&self) -> &Transaction {
        match self {
            Self::Single(tx) => tx,
            Self::Transfer { sender, .. } => sender,
        }
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        match self {
            Self::Single(tx) => vec![tx],
            Self::Transfer { sender, receiver } => vec![sender, receiver],
        }
    }
}

impl Engine {
    /// Create a transaction of any type on behalf of `principal`.
    ///
    /// Role and input checks run before any store access; the record(s) and
    /// every balance or budget change they imply are written in one atomic
    /// unit.
    pub async fn create_transaction(
        &self,
        request: TransactionRequest,
        principal: &Principal,
    ) -> ResultEngine<TransactionResult> {
        let kind = request.kind();
        let result = match request {
            TransactionRequest::Purchase(cmd) => {
                self.purchase(cmd, principal).await.map(TransactionResult::Single)
            }
            TransactionRequest::Redemption(cmd) => self
                .redemption(cmd, principal)
                .await
                .map(TransactionResult::Single),
            TransactionRequest::Transfer(cmd) => self.transfer(cmd, principal).await,
            TransactionRequest::Adjustment(cmd) => self
                .adjustment(cmd, principal)
                .await
                .map(TransactionResult::Single),
            TransactionRequest::Event(cmd) => self
                .event_award(cmd, principal)
                .await
                .map(TransactionResult::Single),
        };
        match &result {
            Ok(created) => {
                let tx = created.primary();
                tracing::info!(
                    kind = kind.as_str(),
                    transaction_id = %tx.id,
                    user_id = %tx.user_id,
                    points_delta = tx.points_delta,
                    processed = tx.processed,
                    by = %principal.id,
                    "transaction created"
                );
            }
            Err(EngineError::Database(err)) => {
                tracing::error!(kind = kind.as_str(), error = %err, "transaction failed");
            }
            Err(err) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    error = %err,
                    by = %principal.id,
                    "transaction rejected"
                );
            }
        }
        result
    }

    /// A single transaction, visible to its owner, its creator and managers.
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Transaction> {
        self.store
            .bounded(async {
                let db = self.database();
                let model = self.require_transaction(db, transaction_id).await?;
                let tx = self.load_transaction(db, model).await?;
                if !principal.is_at_least(Role::Manager)
                    && tx.user_id != principal.id
                    && tx.created_by != principal.id
                {
                    return Err(EngineError::PermissionDenied(
                        "viewing this transaction requires role manager".to_string(),
                    ));
                }
                Ok(tx)
            })
            .await
    }

    /// A user's ledger, newest first.
    pub async fn user_transactions(
        &self,
        user_id: Uuid,
        principal: &Principal,
    ) -> ResultEngine<Vec<Transaction>> {
        if principal.id != user_id {
            principal.require(Role::Manager, "viewing another user's transactions")?;
        }
        self.store
            .bounded(async {
                let db = self.database();
                self.require_user(db, user_id).await?;
                let models = transactions::Entity::find()
                    .filter(transactions::Column::UserId.eq(user_id.to_string()))
                    .order_by_desc(transactions::Column::CreatedAt)
                    .all(db)
                    .await?;
                let mut out = Vec::with_capacity(models.len());
                for model in models {
                    out.push(self.load_transaction(db, model).await?);
                }
                Ok(out)
            })
            .await
    }

    /// Insert a ledger record together with its promotion links.
    pub(super) async fn insert_transaction<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        let model: transactions::ActiveModel = tx.into();
        model.insert(db).await?;
        for promotion_id in &tx.promotion_ids {
            transaction_promotions::ActiveModel {
                transaction_id: sea_orm::ActiveValue::Set(tx.id.to_string()),
                promotion_id: sea_orm::ActiveValue::Set(promotion_id.to_string()),
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }
}
