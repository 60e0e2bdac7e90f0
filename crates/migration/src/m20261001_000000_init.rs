//! Initial schema migration.
//!
//! Creates the complete schema of the points ledger:
//!
//! - `users`: members, their role and cached point balance
//! - `transactions`: the append-only ledger
//! - `transaction_promotions`: promotions applied to a purchase
//! - `events`: events with a fixed points budget
//! - `event_organizers`: who runs an event
//! - `event_guests`: who is on the guest list and whether they attended
//! - `promotions`: automatic and one-time promotions
//! - `promotion_usages`: one-time promotions consumed per user

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Handle,
    Name,
    Role,
    Suspicious,
    Points,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Kind,
    PointsDelta,
    SpentMinor,
    UserId,
    CreatedBy,
    CashierId,
    RelatedTransactionId,
    RelatedUserId,
    EventId,
    Processed,
    RequiresVerification,
    Remark,
    CreatedAt,
    ProcessedAt,
    ProcessedBy,
}

#[derive(Iden)]
enum TransactionPromotions {
    Table,
    TransactionId,
    PromotionId,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
    Name,
    Description,
    Location,
    StartsAt,
    EndsAt,
    Capacity,
    PointsBudget,
    PointsRemain,
    PointsAwarded,
    CreatedBy,
}

#[derive(Iden)]
enum EventOrganizers {
    Table,
    EventId,
    UserId,
}

#[derive(Iden)]
enum EventGuests {
    Table,
    EventId,
    UserId,
    Attended,
}

#[derive(Iden)]
enum Promotions {
    Table,
    Id,
    Name,
    Description,
    Kind,
    StartsAt,
    EndsAt,
    MinSpendingMinor,
    Rate,
    BonusPoints,
}

#[derive(Iden)]
enum PromotionUsages {
    Table,
    PromotionId,
    UserId,
    TransactionId,
    UsedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Handle).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("regular"),
                    )
                    .col(
                        ColumnDef::new(Users::Suspicious)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::Points)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-handle-unique")
                    .table(Users::Table)
                    .col(Users::Handle)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Events
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Events::Name).string().not_null())
                    .col(ColumnDef::new(Events::Description).string())
                    .col(ColumnDef::new(Events::Location).string())
                    .col(
                        ColumnDef::new(Events::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Events::Capacity).big_integer().not_null())
                    .col(
                        ColumnDef::new(Events::PointsBudget)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::PointsRemain)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::PointsAwarded)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Events::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-events-created_by")
                            .from(Events::Table, Events::CreatedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::PointsDelta)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::SpentMinor).big_integer())
                    .col(ColumnDef::new(Transactions::UserId).string().not_null())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Transactions::CashierId).string())
                    // Transfer records point at each other, so this stays a
                    // plain column instead of a self-referencing key.
                    .col(ColumnDef::new(Transactions::RelatedTransactionId).string())
                    .col(ColumnDef::new(Transactions::RelatedUserId).string())
                    .col(ColumnDef::new(Transactions::EventId).string())
                    .col(
                        ColumnDef::new(Transactions::Processed)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::RequiresVerification)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Transactions::Remark).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::ProcessedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Transactions::ProcessedBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-created_by")
                            .from(Transactions::Table, Transactions::CreatedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-event_id")
                            .from(Transactions::Table, Transactions::EventId)
                            .to(Events::Table, Events::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Event organizers and guests
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(EventOrganizers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EventOrganizers::EventId).string().not_null())
                    .col(ColumnDef::new(EventOrganizers::UserId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(EventOrganizers::EventId)
                            .col(EventOrganizers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event_organizers-event_id")
                            .from(EventOrganizers::Table, EventOrganizers::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event_organizers-user_id")
                            .from(EventOrganizers::Table, EventOrganizers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventGuests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EventGuests::EventId).string().not_null())
                    .col(ColumnDef::new(EventGuests::UserId).string().not_null())
                    .col(
                        ColumnDef::new(EventGuests::Attended)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(EventGuests::EventId)
                            .col(EventGuests::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event_guests-event_id")
                            .from(EventGuests::Table, EventGuests::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-event_guests-user_id")
                            .from(EventGuests::Table, EventGuests::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Promotions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Promotions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Promotions::Name).string().not_null())
                    .col(ColumnDef::new(Promotions::Description).string())
                    .col(ColumnDef::new(Promotions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Promotions::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Promotions::MinSpendingMinor).big_integer())
                    .col(ColumnDef::new(Promotions::Rate).double())
                    .col(ColumnDef::new(Promotions::BonusPoints).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromotionUsages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromotionUsages::PromotionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PromotionUsages::UserId).string().not_null())
                    .col(
                        ColumnDef::new(PromotionUsages::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromotionUsages::UsedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PromotionUsages::PromotionId)
                            .col(PromotionUsages::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-promotion_usages-promotion_id")
                            .from(PromotionUsages::Table, PromotionUsages::PromotionId)
                            .to(Promotions::Table, Promotions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-promotion_usages-user_id")
                            .from(PromotionUsages::Table, PromotionUsages::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-promotion_usages-transaction_id")
                            .from(PromotionUsages::Table, PromotionUsages::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionPromotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionPromotions::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionPromotions::PromotionId)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(TransactionPromotions::TransactionId)
                            .col(TransactionPromotions::PromotionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_promotions-transaction_id")
                            .from(
                                TransactionPromotions::Table,
                                TransactionPromotions::TransactionId,
                            )
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transaction_promotions-promotion_id")
                            .from(
                                TransactionPromotions::Table,
                                TransactionPromotions::PromotionId,
                            )
                            .to(Promotions::Table, Promotions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(TransactionPromotions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PromotionUsages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Promotions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventGuests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventOrganizers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
