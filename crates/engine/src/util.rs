//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

const HANDLE_MIN_LEN: usize = 3;
const HANDLE_MAX_LEN: usize = 32;

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Validation(format!("invalid {label} id")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|v| parse_uuid(v, label)).transpose()
}

/// Canonical form of a user handle: NFKC, trimmed, lowercase.
///
/// Handles are the lookup key for users, so `"Alice"` and `"ａｌｉｃｅ"`
/// (fullwidth) must collide.
pub(crate) fn normalize_handle(value: &str) -> ResultEngine<String> {
    let handle: String = value.trim().nfkc().collect::<String>().to_lowercase();
    let len = handle.chars().count();
    if !(HANDLE_MIN_LEN..=HANDLE_MAX_LEN).contains(&len) {
        return Err(EngineError::Validation(format!(
            "handle must be {HANDLE_MIN_LEN}-{HANDLE_MAX_LEN} characters"
        )));
    }
    if !handle.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EngineError::Validation(
            "handle must be alphanumeric".to_string(),
        ));
    }
    Ok(handle)
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn validate_window(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    label: &str,
) -> ResultEngine<()> {
    if starts_at >= ends_at {
        return Err(EngineError::Validation(format!(
            "{label} must start before it ends"
        )));
    }
    Ok(())
}
