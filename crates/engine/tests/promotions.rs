mod common;

use chrono::{Duration, Utc};
use engine::{CreatePromotionCmd, EngineError, PromotionKind, PromotionUpdate, PurchaseCmd};
use uuid::Uuid;

use common::{cast, engine_with_db, points};

fn running(name: &str, kind: PromotionKind) -> CreatePromotionCmd {
    let now = Utc::now();
    CreatePromotionCmd::new(name, kind, now - Duration::days(1), now + Duration::days(1))
}

#[tokio::test]
async fn automatic_promotions_stack_on_matching_purchases() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;

    // 1 extra point per dollar.
    let rate = engine
        .create_promotion(running("Double", PromotionKind::Automatic).rate(0.01), &cast.manager)
        .await
        .unwrap();
    let flat = engine
        .create_promotion(
            running("Big basket", PromotionKind::Automatic)
                .bonus_points(20)
                .min_spending_minor(5_000),
            &cast.manager,
        )
        .await
        .unwrap();

    let small = engine
        .create_transaction(PurchaseCmd::new(cast.alice.id, 2_500).into(), &cast.cashier)
        .await
        .unwrap()
        .primary()
        .clone();
    assert_eq!(small.points_delta, 100 + 25);
    assert_eq!(small.promotion_ids, vec![rate.id]);

    let big = engine
        .create_transaction(PurchaseCmd::new(cast.alice.id, 5_000).into(), &cast.cashier)
        .await
        .unwrap()
        .primary()
        .clone();
    assert_eq!(big.points_delta, 200 + 50 + 20);
    assert_eq!(big.promotion_ids.len(), 2);
    assert!(big.promotion_ids.contains(&flat.id));

    let stored = engine.transaction(big.id, &cast.manager).await.unwrap();
    assert_eq!(stored.promotion_ids.len(), 2);
    assert_eq!(points(&engine, cast.alice.id).await, 125 + 270);
}

#[tokio::test]
async fn inactive_automatic_promotion_is_ignored() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let now = Utc::now();
    engine
        .create_promotion(
            CreatePromotionCmd::new(
                "Next week",
                PromotionKind::Automatic,
                now + Duration::days(7),
                now + Duration::days(8),
            )
            .bonus_points(100),
            &cast.manager,
        )
        .await
        .unwrap();

    let tx = engine
        .create_transaction(PurchaseCmd::new(cast.alice.id, 250).into(), &cast.cashier)
        .await
        .unwrap()
        .primary()
        .clone();
    assert_eq!(tx.points_delta, 10);
    assert!(tx.promotion_ids.is_empty());
}

#[tokio::test]
async fn one_time_promotion_is_consumed_once() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let promo = engine
        .create_promotion(
            running("Welcome", PromotionKind::OneTime).bonus_points(50),
            &cast.manager,
        )
        .await
        .unwrap();

    let tx = engine
        .create_transaction(
            PurchaseCmd::new(cast.alice.id, 100).promotion(promo.id).into(),
            &cast.cashier,
        )
        .await
        .unwrap()
        .primary()
        .clone();
    assert_eq!(tx.points_delta, 4 + 50);
    assert_eq!(tx.promotion_ids, vec![promo.id]);

    let err = engine
        .create_transaction(
            PurchaseCmd::new(cast.alice.id, 100).promotion(promo.id).into(),
            &cast.cashier,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(points(&engine, cast.alice.id).await, 54);

    // Another customer can still use it.
    engine
        .create_transaction(
            PurchaseCmd::new(cast.bob.id, 100).promotion(promo.id).into(),
            &cast.cashier,
        )
        .await
        .unwrap();
    assert_eq!(points(&engine, cast.bob.id).await, 54);
}

#[tokio::test]
async fn rejected_purchase_does_not_consume_the_promotion() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let promo = engine
        .create_promotion(
            running("Welcome", PromotionKind::OneTime).bonus_points(50),
            &cast.manager,
        )
        .await
        .unwrap();
    let missing = Uuid::new_v4();

    let err = engine
        .create_transaction(
            PurchaseCmd::new(cast.alice.id, 100)
                .promotion(promo.id)
                .promotion(missing)
                .into(),
            &cast.cashier,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    engine
        .create_transaction(
            PurchaseCmd::new(cast.alice.id, 100).promotion(promo.id).into(),
            &cast.cashier,
        )
        .await
        .unwrap();
    assert_eq!(points(&engine, cast.alice.id).await, 54);
}

#[tokio::test]
async fn requested_promotions_are_checked() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let automatic = engine
        .create_promotion(running("Auto", PromotionKind::Automatic).bonus_points(1), &cast.manager)
        .await
        .unwrap();
    let pricey = engine
        .create_promotion(
            running("Pricey", PromotionKind::OneTime)
                .bonus_points(5)
                .min_spending_minor(10_000),
            &cast.manager,
        )
        .await
        .unwrap();
    let now = Utc::now();
    let expired = engine
        .create_promotion(
            CreatePromotionCmd::new(
                "Old",
                PromotionKind::OneTime,
                now - Duration::days(3),
                now - Duration::days(2),
            )
            .bonus_points(5),
            &cast.manager,
        )
        .await
        .unwrap();

    for promotion_id in [automatic.id, pricey.id, expired.id] {
        let err = engine
            .create_transaction(
                PurchaseCmd::new(cast.alice.id, 100).promotion(promotion_id).into(),
                &cast.cashier,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{promotion_id}: {err:?}");
    }

    let err = engine
        .create_transaction(
            PurchaseCmd::new(cast.alice.id, 20_000)
                .promotion(pricey.id)
                .promotion(pricey.id)
                .into(),
            &cast.cashier,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(points(&engine, cast.alice.id).await, 0);
}

#[tokio::test]
async fn promotion_admin_rules() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;

    let err = engine
        .create_promotion(running("Nope", PromotionKind::Automatic).bonus_points(1), &cast.cashier)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .create_promotion(running("Empty", PromotionKind::Automatic), &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let started = engine
        .create_promotion(running("Live", PromotionKind::Automatic).bonus_points(1), &cast.manager)
        .await
        .unwrap();
    let err = engine
        .delete_promotion(started.id, &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let now = Utc::now();
    let upcoming = engine
        .create_promotion(
            CreatePromotionCmd::new(
                "Soon",
                PromotionKind::OneTime,
                now + Duration::days(1),
                now + Duration::days(2),
            )
            .rate(0.02),
            &cast.manager,
        )
        .await
        .unwrap();
    engine
        .delete_promotion(upcoming.id, &cast.manager)
        .await
        .unwrap();
    let err = engine.promotion(upcoming.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn started_promotion_only_changes_name_description_and_end() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let live = engine
        .create_promotion(running("Live", PromotionKind::Automatic).rate(0.01), &cast.manager)
        .await
        .unwrap();
    let now = Utc::now();

    for update in [
        PromotionUpdate::default().rate(0.02),
        PromotionUpdate::default().bonus_points(5),
        PromotionUpdate::default().min_spending_minor(100),
        PromotionUpdate::default().starts_at(now + Duration::hours(1)),
    ] {
        let err = engine
            .update_promotion(live.id, update, &cast.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{err:?}");
    }

    let extended = engine
        .update_promotion(
            live.id,
            PromotionUpdate::default()
                .name(" Live+ ")
                .ends_at(now + Duration::days(7)),
            &cast.manager,
        )
        .await
        .unwrap();
    assert_eq!(extended.name, "Live+");
    assert_eq!(extended.rate, Some(0.01));
    assert_eq!(engine.promotion(live.id).await.unwrap().name, "Live+");

    // Terms stay as they were: 100 points plus 25 from the rate.
    let purchase = engine
        .create_transaction(PurchaseCmd::new(cast.alice.id, 2_500).into(), &cast.cashier)
        .await
        .unwrap()
        .primary()
        .clone();
    assert_eq!(purchase.points_delta, 125);
}

#[tokio::test]
async fn upcoming_promotion_can_be_reworked() {
    let (engine, _db) = engine_with_db().await;
    let cast = cast(&engine).await;
    let now = Utc::now();
    let upcoming = engine
        .create_promotion(
            CreatePromotionCmd::new(
                "Soon",
                PromotionKind::OneTime,
                now + Duration::days(1),
                now + Duration::days(2),
            )
            .rate(0.02),
            &cast.manager,
        )
        .await
        .unwrap();

    let err = engine
        .update_promotion(upcoming.id, PromotionUpdate::default().bonus_points(5), &cast.cashier)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    for update in [
        PromotionUpdate::default(),
        PromotionUpdate::default().bonus_points(-1),
        PromotionUpdate::default().rate(f64::NAN),
        PromotionUpdate::default().ends_at(now + Duration::hours(12)),
    ] {
        let err = engine
            .update_promotion(upcoming.id, update, &cast.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{err:?}");
    }

    let err = engine
        .update_promotion(Uuid::new_v4(), PromotionUpdate::default().name("x"), &cast.manager)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let reworked = engine
        .update_promotion(
            upcoming.id,
            PromotionUpdate::default()
                .starts_at(now + Duration::hours(2))
                .bonus_points(10)
                .min_spending_minor(1_000),
            &cast.manager,
        )
        .await
        .unwrap();
    assert_eq!(reworked.starts_at, now + Duration::hours(2));
    assert_eq!(reworked.bonus_points, Some(10));
    assert_eq!(reworked.min_spending_minor, Some(1_000));
    assert_eq!(reworked.rate, Some(0.02));
    assert_eq!(reworked.kind, PromotionKind::OneTime);
}
