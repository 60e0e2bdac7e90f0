#![allow(dead_code)]

use sea_orm::{Database, DatabaseConnection};

use engine::{Engine, LedgerConfig, Principal, PurchaseCmd, Role, TransactionRequest, User};
use migration::MigratorTrait;
use uuid::Uuid;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn engine_with_file_db() -> (Engine, DatabaseConnection, std::path::PathBuf) {
    engine_with_file_db_config(LedgerConfig::default()).await
}

pub async fn engine_with_file_db_config(
    config: LedgerConfig,
) -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .config(config)
        .build()
        .await
        .unwrap();

    (engine, db, path)
}

/// One user per role plus two regular members.
pub struct Cast {
    pub superuser: Principal,
    pub manager: Principal,
    pub organizer: Principal,
    pub cashier: Principal,
    pub alice: Principal,
    pub bob: Principal,
}

pub async fn cast(engine: &Engine) -> Cast {
    Cast {
        superuser: user(engine, "root", Role::Superuser).await.principal(),
        manager: user(engine, "manny", Role::Manager).await.principal(),
        organizer: user(engine, "olga", Role::Organizer).await.principal(),
        cashier: user(engine, "cash", Role::Cashier).await.principal(),
        alice: user(engine, "alice", Role::Regular).await.principal(),
        bob: user(engine, "bob", Role::Regular).await.principal(),
    }
}

pub async fn user(engine: &Engine, handle: &str, role: Role) -> User {
    engine.bootstrap_user(handle, handle, role).await.unwrap()
}

/// Give `user` exactly `points` through a processed purchase (no promotions
/// must be active).
pub async fn fund(engine: &Engine, cashier: &Principal, user: Uuid, points: i64) -> Uuid {
    let spent = points * engine.config().cents_per_point;
    let result = engine
        .create_transaction(
            TransactionRequest::from(PurchaseCmd::new(user, spent)),
            cashier,
        )
        .await
        .unwrap();
    result.primary().id
}

pub async fn points(engine: &Engine, user: Uuid) -> i64 {
    engine.user(user).await.unwrap().points
}
