use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles in ascending order of privilege.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Regular,
    Cashier,
    Organizer,
    Manager,
    Superuser,
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Purchase,
        Redemption,
        Transfer,
        Adjustment,
        Event,
    }

    /// Request body of `POST /transactions`, tagged by `type`.
    ///
    /// The caller is never part of the body: it comes from the resolved
    /// principal.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    pub enum TransactionNew {
        Purchase {
            user_id: Uuid,
            spent_minor: i64,
            #[serde(default)]
            promotion_ids: Vec<Uuid>,
            remark: Option<String>,
        },
        Redemption {
            amount: i64,
            remark: Option<String>,
        },
        Transfer {
            recipient_id: Uuid,
            amount: i64,
            remark: Option<String>,
        },
        Adjustment {
            user_id: Uuid,
            related_transaction_id: Uuid,
            amount: i64,
            remark: Option<String>,
        },
        Event {
            event_id: Uuid,
            recipient_id: Uuid,
            amount: i64,
            remark: Option<String>,
        },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub points_delta: i64,
        pub spent_minor: Option<i64>,
        pub user_id: Uuid,
        pub created_by: Uuid,
        pub related_transaction_id: Option<Uuid>,
        pub related_user_id: Option<Uuid>,
        pub event_id: Option<Uuid>,
        pub processed: bool,
        pub requires_verification: bool,
        pub remark: Option<String>,
        pub promotion_ids: Vec<Uuid>,
        pub created_at: DateTime<FixedOffset>,
        pub processed_at: Option<DateTime<FixedOffset>>,
    }

    /// Records written by one creation: two for a transfer (sender first),
    /// one otherwise.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    /// Body of `PATCH /transactions/{id}/processed`. Only `true` is accepted.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionProcessed {
        pub processed: bool,
    }

    /// Body of `PATCH /transactions/{id}/suspicious`.
    ///
    /// `false` clears a flag by processing the transaction again.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionSuspicious {
        pub suspicious: bool,
    }
}

pub mod event {
    use super::*;
    use crate::transaction::TransactionView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventNew {
        pub name: String,
        pub description: Option<String>,
        pub location: Option<String>,
        pub starts_at: DateTime<FixedOffset>,
        pub ends_at: DateTime<FixedOffset>,
        pub capacity: i64,
        pub points_budget: i64,
    }

    /// Body of `PATCH /events/{id}`; absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EventUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
        pub location: Option<String>,
        pub starts_at: Option<DateTime<FixedOffset>>,
        pub ends_at: Option<DateTime<FixedOffset>>,
        pub capacity: Option<i64>,
        pub points_budget: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GuestView {
        pub user_id: Uuid,
        pub attended: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub location: Option<String>,
        pub starts_at: DateTime<FixedOffset>,
        pub ends_at: DateTime<FixedOffset>,
        pub capacity: i64,
        pub points_budget: i64,
        pub points_remain: i64,
        pub points_awarded: i64,
        pub organizers: Vec<Uuid>,
        pub guests: Vec<GuestView>,
    }

    /// Body for adding an organizer or a guest.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventMember {
        pub user_id: Uuid,
    }

    /// Body of `PATCH /events/{id}/guests/{user_id}`. Attendance can only be
    /// confirmed, never withdrawn.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GuestUpdate {
        pub attended: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AwardNew {
        pub points_per_person: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AwardView {
        pub event_id: Uuid,
        pub points_per_person: i64,
        pub total_awarded: i64,
        pub remaining_budget: i64,
        pub transactions: Vec<TransactionView>,
    }
}

pub mod promotion {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PromotionKind {
        Automatic,
        OneTime,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PromotionNew {
        pub name: String,
        pub description: Option<String>,
        pub kind: PromotionKind,
        pub starts_at: DateTime<FixedOffset>,
        pub ends_at: DateTime<FixedOffset>,
        pub min_spending_minor: Option<i64>,
        pub rate: Option<f64>,
        pub bonus_points: Option<i64>,
    }

    /// Body of `PATCH /promotions/{id}`; absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PromotionUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
        pub starts_at: Option<DateTime<FixedOffset>>,
        pub ends_at: Option<DateTime<FixedOffset>>,
        pub min_spending_minor: Option<i64>,
        pub rate: Option<f64>,
        pub bonus_points: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PromotionView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub kind: PromotionKind,
        pub starts_at: DateTime<FixedOffset>,
        pub ends_at: DateTime<FixedOffset>,
        pub min_spending_minor: Option<i64>,
        pub rate: Option<f64>,
        pub bonus_points: Option<i64>,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub handle: String,
        pub name: String,
    }

    /// Privileged changes; absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserUpdate {
        pub role: Option<Role>,
        pub suspicious: Option<bool>,
    }

    /// Every stored field of a user, before projection.
    #[derive(Clone, Debug)]
    pub struct UserRecord {
        pub id: Uuid,
        pub handle: String,
        pub name: String,
        pub role: Role,
        pub suspicious: bool,
        pub points: i64,
        pub created_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct RegularView {
        pub id: Uuid,
        pub handle: String,
        pub name: String,
        pub points: i64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct CashierView {
        pub id: Uuid,
        pub handle: String,
        pub name: String,
        pub points: i64,
        pub suspicious: bool,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    pub struct ManagerView {
        pub id: Uuid,
        pub handle: String,
        pub name: String,
        pub points: i64,
        pub suspicious: bool,
        pub role: Role,
        pub created_at: DateTime<FixedOffset>,
    }

    /// A user as seen by a viewer of a given role.
    ///
    /// Each variant is a fixed field set, so what a role sees is decided here
    /// and nowhere else. Variants are listed widest first so untagged
    /// deserialization picks the richest match.
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum UserView {
        Manager(ManagerView),
        Cashier(CashierView),
        Regular(RegularView),
    }

    impl UserView {
        pub fn for_role(user: UserRecord, viewer: Role) -> Self {
            match viewer {
                Role::Regular => Self::Regular(RegularView {
                    id: user.id,
                    handle: user.handle,
                    name: user.name,
                    points: user.points,
                }),
                // Organizers get no extra fields over cashiers.
                Role::Cashier | Role::Organizer => Self::Cashier(CashierView {
                    id: user.id,
                    handle: user.handle,
                    name: user.name,
                    points: user.points,
                    suspicious: user.suspicious,
                }),
                Role::Manager | Role::Superuser => Self::Manager(ManagerView {
                    id: user.id,
                    handle: user.handle,
                    name: user.name,
                    points: user.points,
                    suspicious: user.suspicious,
                    role: user.role,
                    created_at: user.created_at,
                }),
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub user_id: Uuid,
        pub cached_points: i64,
        pub ledger_points: i64,
        pub consistent: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Role,
        transaction::TransactionNew,
        user::{UserRecord, UserView},
    };
    use chrono::{FixedOffset, TimeZone};
    use uuid::Uuid;

    fn record() -> UserRecord {
        let utc = FixedOffset::east_opt(0).unwrap();
        UserRecord {
            id: Uuid::nil(),
            handle: "alice".to_string(),
            name: "Alice".to_string(),
            role: Role::Cashier,
            suspicious: true,
            points: 42,
            created_at: utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn regular_viewer_sees_public_fields_only() {
        let json = serde_json::to_value(UserView::for_role(record(), Role::Regular)).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["handle", "id", "name", "points"]);
    }

    #[test]
    fn cashier_viewer_also_sees_suspicious() {
        let json = serde_json::to_value(UserView::for_role(record(), Role::Organizer)).unwrap();
        assert_eq!(json["suspicious"], true);
        assert!(json.get("role").is_none());
    }

    #[test]
    fn manager_viewer_sees_role_and_creation() {
        let json = serde_json::to_value(UserView::for_role(record(), Role::Superuser)).unwrap();
        assert_eq!(json["role"], "cashier");
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn transaction_new_is_tagged_by_type() {
        let body = serde_json::json!({
            "type": "purchase",
            "user_id": Uuid::nil(),
            "spent_minor": 2500,
        });
        let parsed: TransactionNew = serde_json::from_value(body).unwrap();
        match parsed {
            TransactionNew::Purchase {
                spent_minor,
                promotion_ids,
                remark,
                ..
            } => {
                assert_eq!(spent_minor, 2500);
                assert!(promotion_ids.is_empty());
                assert!(remark.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = serde_json::from_str::<TransactionNew>(r#"{"type":"gift","amount":1}"#);
        assert!(err.is_err());
    }
}
