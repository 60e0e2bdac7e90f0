use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};
use engine::{Engine, EngineError};
use uuid::Uuid;

use std::sync::Arc;

use crate::{ServerError, events, promotions, transactions, users};

static PRINCIPAL_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-principal-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` for the authenticated caller.
///
/// The upstream authentication proxy puts the caller's user id in
/// "x-principal-id"; requests without it never reach a handler.
#[derive(Debug)]
struct PrincipalHeader(Uuid);

impl Header for PrincipalHeader {
    fn name() -> &'static axum::http::HeaderName {
        &PRINCIPAL_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let Ok(value) = Uuid::parse_str(value.trim()) else {
            return Err(AxumError::invalid());
        };

        Ok(PrincipalHeader(value))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        let as_string = self.0.to_string();
        match axum::http::HeaderValue::from_str(&as_string) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-principal-id header"),
        }
    }
}

/// Resolve the caller into an `engine::Principal` with its current role.
async fn resolve_principal(
    principal_header: Option<TypedHeader<PrincipalHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(PrincipalHeader(user_id))) = principal_header else {
        return Err(ServerError::Unauthorized);
    };

    let principal = match state.engine.principal(user_id).await {
        Ok(principal) => principal,
        Err(EngineError::NotFound(_)) => {
            tracing::warn!(%user_id, "unknown principal");
            return Err(ServerError::Unauthorized);
        }
        Err(err) => return Err(err.into()),
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };

    Router::new()
        .route("/transactions", post(transactions::create))
        .route("/transactions/{id}", get(transactions::get))
        .route("/transactions/{id}/processed", patch(transactions::processed))
        .route("/transactions/{id}/suspicious", patch(transactions::suspicious))
        .route("/events", post(events::create))
        .route(
            "/events/{id}",
            get(events::get)
                .patch(events::update)
                .delete(events::delete),
        )
        .route("/events/{id}/organizers", post(events::add_organizer))
        .route(
            "/events/{id}/organizers/{user_id}",
            axum::routing::delete(events::remove_organizer),
        )
        .route("/events/{id}/guests", post(events::add_guest))
        .route("/events/{id}/guests/me", post(events::rsvp))
        .route(
            "/events/{id}/guests/{user_id}",
            patch(events::update_guest).delete(events::remove_guest),
        )
        .route("/events/{id}/awards", post(events::award))
        .route("/promotions", post(promotions::create))
        .route(
            "/promotions/{id}",
            get(promotions::get)
                .patch(promotions::update)
                .delete(promotions::delete),
        )
        .route("/users", post(users::create))
        .route("/users/{id}", get(users::get).patch(users::update))
        .route("/users/{id}/balance", get(users::balance))
        .route("/users/{id}/transactions", get(users::transactions))
        .route_layer(middleware::from_fn_with_state(state.clone(), resolve_principal))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine))).await
}
