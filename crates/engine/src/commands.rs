//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. None of them carries the
//! caller: the `Principal` is always a separate argument.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{PromotionKind, Role, TransactionKind};

/// Credit a customer for a purchase rung up by a cashier.
#[derive(Clone, Debug)]
pub struct PurchaseCmd {
    pub customer_id: Uuid,
    pub spent_minor: i64,
    /// One-time promotions the customer wants to use.
    pub promotion_ids: Vec<Uuid>,
    pub remark: Option<String>,
}

impl PurchaseCmd {
    #[must_use]
    pub fn new(customer_id: Uuid, spent_minor: i64) -> Self {
        Self {
            customer_id,
            spent_minor,
            promotion_ids: Vec::new(),
            remark: None,
        }
    }

    #[must_use]
    pub fn promotion(mut self, promotion_id: Uuid) -> Self {
        self.promotion_ids.push(promotion_id);
        self
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

/// Request to spend the caller's own points.
#[derive(Clone, Debug)]
pub struct RedemptionCmd {
    pub amount: i64,
    pub remark: Option<String>,
}

impl RedemptionCmd {
    #[must_use]
    pub fn new(amount: i64) -> Self {
        Self {
            amount,
            remark: None,
        }
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

/// Move points from the caller to another user.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub recipient_id: Uuid,
    pub amount: i64,
    pub remark: Option<String>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(recipient_id: Uuid, amount: i64) -> Self {
        Self {
            recipient_id,
            amount,
            remark: None,
        }
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

/// Manager correction of a user's balance, tied to an existing transaction.
#[derive(Clone, Debug)]
pub struct AdjustmentCmd {
    pub user_id: Uuid,
    pub related_transaction_id: Uuid,
    /// Signed; may not be zero.
    pub amount: i64,
    pub remark: Option<String>,
}

impl AdjustmentCmd {
    #[must_use]
    pub fn new(user_id: Uuid, related_transaction_id: Uuid, amount: i64) -> Self {
        Self {
            user_id,
            related_transaction_id,
            amount,
            remark: None,
        }
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

/// Award points from an event budget to a single attendee.
#[derive(Clone, Debug)]
pub struct EventAwardCmd {
    pub event_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: i64,
    pub remark: Option<String>,
}

impl EventAwardCmd {
    #[must_use]
    pub fn new(event_id: Uuid, recipient_id: Uuid, amount: i64) -> Self {
        Self {
            event_id,
            recipient_id,
            amount,
            remark: None,
        }
    }

    #[must_use]
    pub fn remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

/// Any transaction the engine can create.
#[derive(Clone, Debug)]
pub enum TransactionRequest {
    Purchase(PurchaseCmd),
    Redemption(RedemptionCmd),
    Transfer(TransferCmd),
    Adjustment(AdjustmentCmd),
    Event(EventAwardCmd),
}

impl TransactionRequest {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Purchase(_) => TransactionKind::Purchase,
            Self::Redemption(_) => TransactionKind::Redemption,
            Self::Transfer(_) => TransactionKind::Transfer,
            Self::Adjustment(_) => TransactionKind::Adjustment,
            Self::Event(_) => TransactionKind::Event,
        }
    }
}

impl From<PurchaseCmd> for TransactionRequest {
    fn from(cmd: PurchaseCmd) -> Self {
        Self::Purchase(cmd)
    }
}

impl From<RedemptionCmd> for TransactionRequest {
    fn from(cmd: RedemptionCmd) -> Self {
        Self::Redemption(cmd)
    }
}

impl From<TransferCmd> for TransactionRequest {
    fn from(cmd: TransferCmd) -> Self {
        Self::Transfer(cmd)
    }
}

impl From<AdjustmentCmd> for TransactionRequest {
    fn from(cmd: AdjustmentCmd) -> Self {
        Self::Adjustment(cmd)
    }
}

impl From<EventAwardCmd> for TransactionRequest {
    fn from(cmd: EventAwardCmd) -> Self {
        Self::Event(cmd)
    }
}

/// Register a new regular member.
#[derive(Clone, Debug)]
pub struct RegisterUserCmd {
    pub handle: String,
    pub name: String,
}

impl RegisterUserCmd {
    #[must_use]
    pub fn new(handle: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            name: name.into(),
        }
    }
}

/// Privileged changes to a user; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub suspicious: Option<bool>,
}

impl UserUpdate {
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn suspicious(mut self, suspicious: bool) -> Self {
        self.suspicious = Some(suspicious);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.suspicious.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct CreateEventCmd {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i64,
    pub points_budget: i64,
}

impl CreateEventCmd {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        capacity: i64,
        points_budget: i64,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            location: None,
            starts_at,
            ends_at,
            capacity,
            points_budget,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Changes to an event; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<i64>,
    pub points_budget: Option<i64>,
}

impl EventUpdate {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn window(mut self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        self.starts_at = Some(starts_at);
        self.ends_at = Some(ends_at);
        self
    }

    #[must_use]
    pub fn capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn points_budget(mut self, points_budget: i64) -> Self {
        self.points_budget = Some(points_budget);
        self
    }

    /// Fields describing the event, as opposed to its schedule and budget.
    pub fn touches_details(&self) -> bool {
        self.name.is_some() || self.description.is_some() || self.location.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.touches_details()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
            && self.capacity.is_none()
            && self.points_budget.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct CreatePromotionCmd {
    pub name: String,
    pub description: Option<String>,
    pub kind: PromotionKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub min_spending_minor: Option<i64>,
    pub rate: Option<f64>,
    pub bonus_points: Option<i64>,
}

impl CreatePromotionCmd {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: PromotionKind,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
            starts_at,
            ends_at,
            min_spending_minor: None,
            rate: None,
            bonus_points: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn min_spending_minor(mut self, min_spending_minor: i64) -> Self {
        self.min_spending_minor = Some(min_spending_minor);
        self
    }

    #[must_use]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    #[must_use]
    pub fn bonus_points(mut self, bonus_points: i64) -> Self {
        self.bonus_points = Some(bonus_points);
        self
    }
}

/// Changes to a promotion; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct PromotionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub min_spending_minor: Option<i64>,
    pub rate: Option<f64>,
    pub bonus_points: Option<i64>,
}

impl PromotionUpdate {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn starts_at(mut self, starts_at: DateTime<Utc>) -> Self {
        self.starts_at = Some(starts_at);
        self
    }

    #[must_use]
    pub fn ends_at(mut self, ends_at: DateTime<Utc>) -> Self {
        self.ends_at = Some(ends_at);
        self
    }

    #[must_use]
    pub fn min_spending_minor(mut self, min_spending_minor: i64) -> Self {
        self.min_spending_minor = Some(min_spending_minor);
        self
    }

    #[must_use]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    #[must_use]
    pub fn bonus_points(mut self, bonus_points: i64) -> Self {
        self.bonus_points = Some(bonus_points);
        self
    }

    /// Fields that change what a purchase earns.
    pub fn touches_terms(&self) -> bool {
        self.min_spending_minor.is_some() || self.rate.is_some() || self.bonus_points.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
            && !self.touches_terms()
    }
}
