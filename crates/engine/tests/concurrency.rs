//! Races against a file database, where concurrent units really run on
//! separate connections.

mod common;

use chrono::{Duration, Utc};
use engine::{
    CreateEventCmd, CreatePromotionCmd, EngineError, PromotionKind, PurchaseCmd, RedemptionCmd,
    ResultEngine, TransferCmd,
};

use common::{cast, engine_with_file_db, fund, points};

fn loser_is_expected<T>(result: &ResultEngine<T>, business: fn(&EngineError) -> bool) -> bool {
    match result {
        Ok(_) => true,
        Err(err) => business(err) || err.is_retryable(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_redemptions_never_overdraw() {
    let (engine, _db, path) = engine_with_file_db().await;
    let cast = cast(&engine).await;
    fund(&engine, &cast.cashier, cast.alice.id, 100).await;

    let (first, second) = tokio::join!(
        engine.create_transaction(RedemptionCmd::new(60).into(), &cast.alice),
        engine.create_transaction(RedemptionCmd::new(60).into(), &cast.alice),
    );

    let successes = [first.is_ok(), second.is_ok()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1, "{first:?} / {second:?}");
    let insufficient = |err: &EngineError| matches!(err, EngineError::InsufficientBalance(_));
    assert!(loser_is_expected(&first, insufficient));
    assert!(loser_is_expected(&second, insufficient));

    assert_eq!(points(&engine, cast.alice.id).await, 40);
    assert!(engine.verify_balance(cast.alice.id).await.unwrap());

    let _ = std::fs::remove_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_transfer_and_redemption_keep_balance_non_negative() {
    let (engine, _db, path) = engine_with_file_db().await;
    let cast = cast(&engine).await;
    fund(&engine, &cast.cashier, cast.alice.id, 100).await;

    let (transfer, redemption) = tokio::join!(
        engine.create_transaction(TransferCmd::new(cast.bob.id, 70).into(), &cast.alice),
        engine.create_transaction(RedemptionCmd::new(70).into(), &cast.alice),
    );
    assert!(transfer.is_ok() ^ redemption.is_ok(), "{transfer:?} / {redemption:?}");

    let alice = points(&engine, cast.alice.id).await;
    assert_eq!(alice, 30);
    let bob = points(&engine, cast.bob.id).await;
    assert_eq!(bob, if transfer.is_ok() { 70 } else { 0 });
    assert!(engine.verify_balance(cast.alice.id).await.unwrap());
    assert!(engine.verify_balance(cast.bob.id).await.unwrap());

    let _ = std::fs::remove_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_time_promotion_race_applies_once() {
    let (engine, _db, path) = engine_with_file_db().await;
    let cast = cast(&engine).await;
    let now = Utc::now();
    let promo = engine
        .create_promotion(
            CreatePromotionCmd::new(
                "Welcome",
                PromotionKind::OneTime,
                now - Duration::days(1),
                now + Duration::days(1),
            )
            .bonus_points(50),
            &cast.manager,
        )
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        engine.create_transaction(
            PurchaseCmd::new(cast.alice.id, 100).promotion(promo.id).into(),
            &cast.cashier,
        ),
        engine.create_transaction(
            PurchaseCmd::new(cast.alice.id, 100).promotion(promo.id).into(),
            &cast.cashier,
        ),
    );

    assert!(first.is_ok() ^ second.is_ok(), "{first:?} / {second:?}");
    let validation = |err: &EngineError| matches!(err, EngineError::Validation(_));
    assert!(loser_is_expected(&first, validation));
    assert!(loser_is_expected(&second, validation));

    assert_eq!(points(&engine, cast.alice.id).await, 54);
    assert!(engine.verify_balance(cast.alice.id).await.unwrap());

    let _ = std::fs::remove_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_awards_stay_within_budget() {
    let (engine, _db, path) = engine_with_file_db().await;
    let cast = cast(&engine).await;
    let now = Utc::now();
    let event = engine
        .create_event(
            CreateEventCmd::new(
                "Hackathon",
                now - Duration::hours(1),
                now + Duration::hours(5),
                5,
                100,
            ),
            &cast.manager,
        )
        .await
        .unwrap();
    engine.rsvp(event.id, &cast.alice).await.unwrap();
    engine
        .mark_attended(event.id, cast.alice.id, &cast.manager)
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        engine.award_to_attendees(event.id, 60, &cast.manager),
        engine.award_to_attendees(event.id, 60, &cast.manager),
    );
    assert!(first.is_ok() ^ second.is_ok(), "{first:?} / {second:?}");
    let budget = |err: &EngineError| matches!(err, EngineError::InsufficientBudget(_));
    assert!(loser_is_expected(&first, budget));
    assert!(loser_is_expected(&second, budget));

    let event = engine.event(event.id).await.unwrap();
    assert_eq!(event.points_awarded, 60);
    assert_eq!(event.points_remain, 40);
    assert_eq!(points(&engine, cast.alice.id).await, 60);

    let _ = std::fs::remove_file(path);
}
