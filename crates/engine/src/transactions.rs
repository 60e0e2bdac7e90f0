//! Ledger transactions.
//!
//! A `Transaction` is an immutable entry of the ledger. Once inserted, only
//! its processing state (`processed`, `requires_verification`,
//! `processed_at`, `processed_by`) may change.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, Condition, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Redemption,
    Transfer,
    Adjustment,
    Event,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Redemption => "redemption",
            Self::Transfer => "transfer",
            Self::Adjustment => "adjustment",
            Self::Event => "event",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "purchase" => Ok(Self::Purchase),
            "redemption" => Ok(Self::Redemption),
            "transfer" => Ok(Self::Transfer),
            "adjustment" => Ok(Self::Adjustment),
            "event" => Ok(Self::Event),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub points_delta: i64,
    pub spent_minor: Option<i64>,
    /// The user whose balance this entry affects.
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub cashier_id: Option<Uuid>,
    /// Adjustment: the corrected transaction. Transfer: the counterpart record.
    pub related_transaction_id: Option<Uuid>,
    /// Transfer: the other party.
    pub related_user_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub processed: bool,
    pub requires_verification: bool,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
    pub promotion_ids: Vec<Uuid>,
}

impl Transaction {
    /// A processed entry with no optional references set.
    pub fn new(kind: TransactionKind, user_id: Uuid, created_by: Uuid, points_delta: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            points_delta,
            spent_minor: None,
            user_id,
            created_by,
            cashier_id: None,
            related_transaction_id: None,
            related_user_id: None,
            event_id: None,
            processed: true,
            requires_verification: false,
            remark: None,
            created_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            promotion_ids: Vec::new(),
        }
    }

    /// Whether `points_delta` is currently part of the user's balance.
    ///
    /// Redemptions debit when they are created, so a pending redemption
    /// counts even though a cashier has not processed it yet. A flagged
    /// redemption (`requires_verification`) does not.
    pub fn counts_toward_balance(&self) -> bool {
        counts_toward_balance(self.kind, self.processed, self.requires_verification)
    }
}

pub(crate) fn counts_toward_balance(
    kind: TransactionKind,
    processed: bool,
    requires_verification: bool,
) -> bool {
    processed || (kind == TransactionKind::Redemption && !requires_verification)
}

/// SQL form of [`Transaction::counts_toward_balance`].
pub(crate) fn counting_condition() -> Condition {
    Condition::any().add(Column::Processed.eq(true)).add(
        Condition::all()
            .add(Column::Kind.eq(TransactionKind::Redemption.as_str()))
            .add(Column::RequiresVerification.eq(false)),
    )
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub points_delta: i64,
    pub spent_minor: Option<i64>,
    pub user_id: String,
    pub created_by: String,
    pub cashier_id: Option<String>,
    pub related_transaction_id: Option<String>,
    pub related_user_id: Option<String>,
    pub event_id: Option<String>,
    pub processed: bool,
    pub requires_verification: bool,
    pub remark: Option<String>,
    pub created_at: DateTimeUtc,
    pub processed_at: Option<DateTimeUtc>,
    pub processed_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(has_many = "super::transaction_promotions::Entity")]
    TransactionPromotions,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::transaction_promotions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionPromotions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            points_delta: ActiveValue::Set(tx.points_delta),
            spent_minor: ActiveValue::Set(tx.spent_minor),
            user_id: ActiveValue::Set(tx.user_id.to_string()),
            created_by: ActiveValue::Set(tx.created_by.to_string()),
            cashier_id: ActiveValue::Set(tx.cashier_id.map(|id| id.to_string())),
            related_transaction_id: ActiveValue::Set(
                tx.related_transaction_id.map(|id| id.to_string()),
            ),
            related_user_id: ActiveValue::Set(tx.related_user_id.map(|id| id.to_string())),
            event_id: ActiveValue::Set(tx.event_id.map(|id| id.to_string())),
            processed: ActiveValue::Set(tx.processed),
            requires_verification: ActiveValue::Set(tx.requires_verification),
            remark: ActiveValue::Set(tx.remark.clone()),
            created_at: ActiveValue::Set(tx.created_at),
            processed_at: ActiveValue::Set(tx.processed_at),
            processed_by: ActiveValue::Set(tx.processed_by.map(|id| id.to_string())),
        }
    }
}

/// Promotion ids are stored in `transaction_promotions` and loaded
/// separately; the conversion leaves them empty.
impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            points_delta: model.points_delta,
            spent_minor: model.spent_minor,
            user_id: parse_uuid(&model.user_id, "user")?,
            created_by: parse_uuid(&model.created_by, "user")?,
            cashier_id: parse_optional_uuid(model.cashier_id.as_deref(), "cashier")?,
            related_transaction_id: parse_optional_uuid(
                model.related_transaction_id.as_deref(),
                "related transaction",
            )?,
            related_user_id: parse_optional_uuid(model.related_user_id.as_deref(), "user")?,
            event_id: parse_optional_uuid(model.event_id.as_deref(), "event")?,
            processed: model.processed,
            requires_verification: model.requires_verification,
            remark: model.remark,
            created_at: model.created_at,
            processed_at: model.processed_at,
            processed_by: parse_optional_uuid(model.processed_by.as_deref(), "user")?,
            promotion_ids: Vec::new(),
        })
    }
}
