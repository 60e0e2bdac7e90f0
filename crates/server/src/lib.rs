use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{router, run_with_listener};

mod events;
mod promotions;
mod server;
mod transactions;
mod users;

pub mod types {
    pub mod transaction {
        pub use api_types::transaction::{
            TransactionCreated, TransactionKind, TransactionListResponse, TransactionNew,
            TransactionProcessed, TransactionSuspicious, TransactionView,
        };
    }

    pub mod event {
        pub use api_types::event::{
            AwardNew, AwardView, EventMember, EventNew, EventUpdate, EventView, GuestUpdate,
            GuestView,
        };
    }

    pub mod promotion {
        pub use api_types::promotion::{
            PromotionKind, PromotionNew, PromotionUpdate, PromotionView,
        };
    }

    pub mod user {
        pub use api_types::user::{BalanceView, UserNew, UserUpdate, UserView};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Unauthorized,
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_)
        | EngineError::AlreadyProcessed(_)
        | EngineError::NotProcessed(_) => StatusCode::CONFLICT,
        EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Validation(_)
        | EngineError::InsufficientBalance(_)
        | EngineError::InsufficientBudget(_)
        | EngineError::NoAttendees(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
