//! User API endpoints

use api_types::{
    Role as ApiRole,
    transaction::TransactionListResponse,
    user::{BalanceView, UserNew, UserRecord, UserUpdate, UserView},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Principal, RegisterUserCmd, Role, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, transactions::transaction_view};

fn map_role(role: Role) -> ApiRole {
    match role {
        Role::Regular => ApiRole::Regular,
        Role::Cashier => ApiRole::Cashier,
        Role::Organizer => ApiRole::Organizer,
        Role::Manager => ApiRole::Manager,
        Role::Superuser => ApiRole::Superuser,
    }
}

fn unmap_role(role: ApiRole) -> Role {
    match role {
        ApiRole::Regular => Role::Regular,
        ApiRole::Cashier => Role::Cashier,
        ApiRole::Organizer => Role::Organizer,
        ApiRole::Manager => Role::Manager,
        ApiRole::Superuser => Role::Superuser,
    }
}

fn user_view(user: User, viewer: &Principal) -> UserView {
    let record = UserRecord {
        id: user.id,
        handle: user.handle,
        name: user.name,
        role: map_role(user.role),
        suspicious: user.suspicious,
        points: user.points,
        created_at: user.created_at.fixed_offset(),
    };
    UserView::for_role(record, map_role(viewer.role))
}

/// Register a regular member. Cashiers and above only.
pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .register_user(RegisterUserCmd::new(payload.handle, payload.name), &principal)
        .await?;
    Ok((StatusCode::CREATED, Json(user_view(user, &principal))))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(id).await?;
    Ok(Json(user_view(user, &principal)))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let update = engine::UserUpdate {
        role: payload.role.map(unmap_role),
        suspicious: payload.suspicious,
    };
    let user = state.engine.update_user(id, update, &principal).await?;
    Ok(Json(user_view(user, &principal)))
}

/// Cached balance next to the ledger sum. Own balance, or manager and above.
pub async fn balance(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BalanceView>, ServerError> {
    if principal.id != id {
        principal.require(Role::Manager, "view another user's balance")?;
    }

    let report = state.engine.balance_report(id).await?;
    Ok(Json(BalanceView {
        user_id: report.user_id,
        cached_points: report.cached_points,
        ledger_points: report.ledger_points,
        consistent: report.is_consistent(),
    }))
}

pub async fn transactions(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let transactions = state
        .engine
        .user_transactions(id, &principal)
        .await?
        .into_iter()
        .map(transaction_view)
        .collect();
    Ok(Json(TransactionListResponse { transactions }))
}
