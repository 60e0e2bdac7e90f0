//! Transactions API endpoints

use api_types::transaction::{
    TransactionCreated, TransactionKind as ApiKind, TransactionNew, TransactionProcessed,
    TransactionSuspicious, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{
    AdjustmentCmd, EventAwardCmd, Principal, PurchaseCmd, RedemptionCmd, Transaction,
    TransactionRequest, TransferCmd,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Purchase => ApiKind::Purchase,
        engine::TransactionKind::Redemption => ApiKind::Redemption,
        engine::TransactionKind::Transfer => ApiKind::Transfer,
        engine::TransactionKind::Adjustment => ApiKind::Adjustment,
        engine::TransactionKind::Event => ApiKind::Event,
    }
}

pub(crate) fn transaction_view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind),
        points_delta: tx.points_delta,
        spent_minor: tx.spent_minor,
        user_id: tx.user_id,
        created_by: tx.created_by,
        related_transaction_id: tx.related_transaction_id,
        related_user_id: tx.related_user_id,
        event_id: tx.event_id,
        processed: tx.processed,
        requires_verification: tx.requires_verification,
        remark: tx.remark,
        promotion_ids: tx.promotion_ids,
        created_at: tx.created_at.fixed_offset(),
        processed_at: tx.processed_at.map(|at| at.fixed_offset()),
    }
}

fn into_request(payload: TransactionNew) -> TransactionRequest {
    match payload {
        TransactionNew::Purchase {
            user_id,
            spent_minor,
            promotion_ids,
            remark,
        } => PurchaseCmd {
            customer_id: user_id,
            spent_minor,
            promotion_ids,
            remark,
        }
        .into(),
        TransactionNew::Redemption { amount, remark } => RedemptionCmd { amount, remark }.into(),
        TransactionNew::Transfer {
            recipient_id,
            amount,
            remark,
        } => TransferCmd {
            recipient_id,
            amount,
            remark,
        }
        .into(),
        TransactionNew::Adjustment {
            user_id,
            related_transaction_id,
            amount,
            remark,
        } => AdjustmentCmd {
            user_id,
            related_transaction_id,
            amount,
            remark,
        }
        .into(),
        TransactionNew::Event {
            event_id,
            recipient_id,
            amount,
            remark,
        } => EventAwardCmd {
            event_id,
            recipient_id,
            amount,
            remark,
        }
        .into(),
    }
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let created = state
        .engine
        .create_transaction(into_request(payload), &principal)
        .await?;

    let transactions = created
        .into_transactions()
        .into_iter()
        .map(transaction_view)
        .collect();
    Ok((StatusCode::CREATED, Json(TransactionCreated { transactions })))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(id, &principal).await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn processed(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionProcessed>,
) -> Result<Json<TransactionView>, ServerError> {
    if !payload.processed {
        return Err(ServerError::Generic(
            "a transaction can only be marked processed".to_string(),
        ));
    }

    let tx = state.engine.process_transaction(id, &principal).await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn suspicious(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionSuspicious>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = if payload.suspicious {
        state.engine.flag_suspicious(id, &principal).await?
    } else {
        state.engine.process_transaction(id, &principal).await?
    };
    Ok(Json(transaction_view(tx)))
}
