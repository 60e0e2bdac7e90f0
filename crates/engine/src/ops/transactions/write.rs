//! Creation of ledger records, one module per transaction type.

mod adjustment;
mod event;
mod purchase;
mod redemption;
mod transfer;

use crate::{EngineError, ResultEngine};

fn require_positive(amount: i64, label: &str) -> ResultEngine<()> {
    if amount <= 0 {
        return Err(EngineError::Validation(format!("{label} must be > 0")));
    }
    Ok(())
}
