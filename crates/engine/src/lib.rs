//! Points ledger engine.
//!
//! Users earn, spend, transfer and have points adjusted through typed
//! transactions. The [`Engine`] decides per transaction type who may create
//! it, how its point delta is computed, which state it starts in, and applies
//! it together with every balance and budget change in one atomic unit.

pub use commands::{
    AdjustmentCmd, CreateEventCmd, CreatePromotionCmd, EventAwardCmd, EventUpdate,
    PromotionUpdate, PurchaseCmd, RedemptionCmd, RegisterUserCmd, TransactionRequest, TransferCmd,
    UserUpdate,
};
pub use config::LedgerConfig;
pub use error::EngineError;
pub use events::{Event, Guest};
pub use ops::{AwardResult, BalanceReport, Engine, EngineBuilder, TransactionResult};
pub use promotions::{Promotion, PromotionKind};
pub use roles::{Principal, Role, at_least};
pub use transactions::{Transaction, TransactionKind};
pub use users::User;

mod commands;
mod config;
mod error;
mod event_guests;
mod event_organizers;
mod events;
mod ops;
mod promotion_usages;
mod promotions;
mod roles;
mod store;
mod transaction_promotions;
mod transactions;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
