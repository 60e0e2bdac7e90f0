//! Promotion API endpoints

use api_types::promotion::{
    PromotionKind as ApiKind, PromotionNew, PromotionUpdate, PromotionView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{CreatePromotionCmd, Principal, Promotion, PromotionKind};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn promotion_view(promotion: Promotion) -> PromotionView {
    PromotionView {
        id: promotion.id,
        name: promotion.name,
        description: promotion.description,
        kind: match promotion.kind {
            PromotionKind::Automatic => ApiKind::Automatic,
            PromotionKind::OneTime => ApiKind::OneTime,
        },
        starts_at: promotion.starts_at.fixed_offset(),
        ends_at: promotion.ends_at.fixed_offset(),
        min_spending_minor: promotion.min_spending_minor,
        rate: promotion.rate,
        bonus_points: promotion.bonus_points,
    }
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<PromotionNew>,
) -> Result<(StatusCode, Json<PromotionView>), ServerError> {
    let cmd = CreatePromotionCmd {
        name: payload.name,
        description: payload.description,
        kind: match payload.kind {
            ApiKind::Automatic => PromotionKind::Automatic,
            ApiKind::OneTime => PromotionKind::OneTime,
        },
        starts_at: payload.starts_at.with_timezone(&Utc),
        ends_at: payload.ends_at.with_timezone(&Utc),
        min_spending_minor: payload.min_spending_minor,
        rate: payload.rate,
        bonus_points: payload.bonus_points,
    };
    let promotion = state.engine.create_promotion(cmd, &principal).await?;
    Ok((StatusCode::CREATED, Json(promotion_view(promotion))))
}

pub async fn get(
    _: Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PromotionView>, ServerError> {
    let promotion = state.engine.promotion(id).await?;
    Ok(Json(promotion_view(promotion)))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PromotionUpdate>,
) -> Result<Json<PromotionView>, ServerError> {
    let update = engine::PromotionUpdate {
        name: payload.name,
        description: payload.description,
        starts_at: payload.starts_at.map(|at| at.with_timezone(&Utc)),
        ends_at: payload.ends_at.map(|at| at.with_timezone(&Utc)),
        min_spending_minor: payload.min_spending_minor,
        rate: payload.rate,
        bonus_points: payload.bonus_points,
    };
    let promotion = state
        .engine
        .update_promotion(id, update, &principal)
        .await?;
    Ok(Json(promotion_view(promotion)))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_promotion(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}
