mod common;

use std::time::Duration;

use engine::{EngineError, LedgerConfig, RedemptionCmd};
use sea_orm::{ConnectionTrait, TransactionTrait};

use common::{cast, engine_with_file_db_config, fund, points};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn locked_store_times_out_without_writing() {
    let config = LedgerConfig::default().store_timeout(Duration::from_millis(200));
    let (engine, db, path) = engine_with_file_db_config(config).await;
    let cast = cast(&engine).await;
    fund(&engine, &cast.cashier, cast.alice.id, 100).await;

    // Another writer holds the database write lock for the whole attempt.
    let blocker = db.begin().await.unwrap();
    blocker
        .execute_unprepared("UPDATE users SET name = name")
        .await
        .unwrap();

    let err = engine
        .create_transaction(RedemptionCmd::new(40).into(), &cast.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreUnavailable(_)), "{err:?}");
    assert!(err.is_retryable());

    blocker.rollback().await.unwrap();

    assert_eq!(points(&engine, cast.alice.id).await, 100);
    assert_eq!(
        engine
            .user_transactions(cast.alice.id, &cast.alice)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(engine.verify_balance(cast.alice.id).await.unwrap());

    let _ = std::fs::remove_file(path);
}
