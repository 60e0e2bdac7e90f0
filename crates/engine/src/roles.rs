//! Role hierarchy and principals.
//!
//! Roles form a strict total order; a capability check is a single
//! comparison against the minimum role an operation declares.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Roles in ascending order of privilege. The declaration order is the
/// privilege order (`Ord` is derived).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Regular,
    Cashier,
    Organizer,
    Manager,
    Superuser,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Cashier => "cashier",
            Self::Organizer => "organizer",
            Self::Manager => "manager",
            Self::Superuser => "superuser",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "regular" => Ok(Self::Regular),
            "cashier" => Ok(Self::Cashier),
            "organizer" => Ok(Self::Organizer),
            "manager" => Ok(Self::Manager),
            "superuser" => Ok(Self::Superuser),
            other => Err(EngineError::Validation(format!("invalid role: {other}"))),
        }
    }
}

/// `true` when `actual` grants at least the privileges of `required`.
pub fn at_least(actual: Role, required: Role) -> bool {
    actual >= required
}

/// The authenticated caller of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub suspicious: bool,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            role,
            suspicious: false,
        }
    }

    pub fn is_at_least(&self, required: Role) -> bool {
        at_least(self.role, required)
    }

    /// Fail with `PermissionDenied` unless the principal holds `required`.
    pub fn require(&self, required: Role, action: &str) -> ResultEngine<()> {
        if self.is_at_least(required) {
            return Ok(());
        }
        Err(EngineError::PermissionDenied(format!(
            "{action} requires role {} (caller is {})",
            required.as_str(),
            self.role.as_str()
        )))
    }
}
