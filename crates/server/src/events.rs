//! Event API endpoints

use api_types::event::{
    AwardNew, AwardView, EventMember, EventNew, EventUpdate, EventView, GuestUpdate, GuestView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{CreateEventCmd, Event, Principal};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, transactions::transaction_view};

fn event_view(event: Event) -> EventView {
    EventView {
        id: event.id,
        name: event.name,
        description: event.description,
        location: event.location,
        starts_at: event.starts_at.fixed_offset(),
        ends_at: event.ends_at.fixed_offset(),
        capacity: event.capacity,
        points_budget: event.points_budget,
        points_remain: event.points_remain,
        points_awarded: event.points_awarded,
        organizers: event.organizers,
        guests: event
            .guests
            .into_iter()
            .map(|guest| GuestView {
                user_id: guest.user_id,
                attended: guest.attended,
            })
            .collect(),
    }
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<EventNew>,
) -> Result<(StatusCode, Json<EventView>), ServerError> {
    let cmd = CreateEventCmd {
        name: payload.name,
        description: payload.description,
        location: payload.location,
        starts_at: payload.starts_at.with_timezone(&Utc),
        ends_at: payload.ends_at.with_timezone(&Utc),
        capacity: payload.capacity,
        points_budget: payload.points_budget,
    };
    let event = state.engine.create_event(cmd, &principal).await?;
    Ok((StatusCode::CREATED, Json(event_view(event))))
}

pub async fn get(
    _: Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventView>, ServerError> {
    let event = state.engine.event(id).await?;
    Ok(Json(event_view(event)))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventUpdate>,
) -> Result<Json<EventView>, ServerError> {
    let update = engine::EventUpdate {
        name: payload.name,
        description: payload.description,
        location: payload.location,
        starts_at: payload.starts_at.map(|at| at.with_timezone(&Utc)),
        ends_at: payload.ends_at.map(|at| at.with_timezone(&Utc)),
        capacity: payload.capacity,
        points_budget: payload.points_budget,
    };
    let event = state.engine.update_event(id, update, &principal).await?;
    Ok(Json(event_view(event)))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_event(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_organizer(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventMember>,
) -> Result<(StatusCode, Json<EventView>), ServerError> {
    let event = state
        .engine
        .add_organizer(id, payload.user_id, &principal)
        .await?;
    Ok((StatusCode::CREATED, Json(event_view(event))))
}

pub async fn remove_organizer(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EventView>, ServerError> {
    let event = state
        .engine
        .remove_organizer(id, user_id, &principal)
        .await?;
    Ok(Json(event_view(event)))
}

pub async fn add_guest(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventMember>,
) -> Result<(StatusCode, Json<EventView>), ServerError> {
    let event = state.engine.add_guest(id, payload.user_id, &principal).await?;
    Ok((StatusCode::CREATED, Json(event_view(event))))
}

pub async fn rsvp(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<EventView>), ServerError> {
    let event = state.engine.rsvp(id, &principal).await?;
    Ok((StatusCode::CREATED, Json(event_view(event))))
}

pub async fn update_guest(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<GuestUpdate>,
) -> Result<Json<EventView>, ServerError> {
    if !payload.attended {
        return Err(ServerError::Generic(
            "attendance can only be confirmed".to_string(),
        ));
    }

    let event = state
        .engine
        .mark_attended(id, user_id, &principal)
        .await?;
    Ok(Json(event_view(event)))
}

pub async fn remove_guest(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EventView>, ServerError> {
    let event = state.engine.remove_guest(id, user_id, &principal).await?;
    Ok(Json(event_view(event)))
}

pub async fn award(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AwardNew>,
) -> Result<(StatusCode, Json<AwardView>), ServerError> {
    let award = state
        .engine
        .award_to_attendees(id, payload.points_per_person, &principal)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AwardView {
            event_id: award.event_id,
            points_per_person: award.points_per_person,
            total_awarded: award.total_awarded,
            remaining_budget: award.remaining_budget,
            transactions: award.transactions.into_iter().map(transaction_view).collect(),
        }),
    ))
}
