use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{BalanceReport, Engine, Role};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "loyalty_admin")]
#[command(about = "Admin utilities for the points ledger (bootstrap users, audit balances)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./loyalty.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Balance(Balance),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user with any role, without an acting principal.
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    handle: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "regular", value_parser = parse_role)]
    role: Role,
}

#[derive(Args, Debug)]
struct Balance {
    #[command(subcommand)]
    command: BalanceCommand,
}

#[derive(Subcommand, Debug)]
enum BalanceCommand {
    /// Compare one user's cached balance with the ledger.
    Verify(BalanceVerifyArgs),
    /// Check every user and report the ones that drifted.
    Reconcile,
}

#[derive(Args, Debug)]
struct BalanceVerifyArgs {
    /// User handle.
    #[arg(long)]
    user: String,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::try_from(raw.to_lowercase().as_str()).map_err(|err| err.to_string())
}

fn print_report(handle: &str, report: &BalanceReport) {
    println!(
        "{handle}: cached={} ledger={} {}",
        report.cached_points,
        report.ledger_points,
        if report.is_consistent() { "ok" } else { "DRIFT" }
    );
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let user = match engine.bootstrap_user(&args.handle, &args.name, args.role).await {
                Ok(user) => user,
                Err(engine::EngineError::ExistingKey(_)) => {
                    eprintln!("user already exists: {}", args.handle);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            };
            println!(
                "created user: {} ({}) as {}",
                user.handle,
                user.id,
                user.role.as_str()
            );
        }
        Command::Balance(Balance {
            command: BalanceCommand::Verify(args),
        }) => {
            let user = match engine.user_by_handle(&args.user).await {
                Ok(user) => user,
                Err(engine::EngineError::NotFound(_)) => {
                    eprintln!("user not found: {}", args.user);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            };
            let report = engine.balance_report(user.id).await?;
            print_report(&user.handle, &report);
            if !report.is_consistent() {
                std::process::exit(2);
            }
        }
        Command::Balance(Balance {
            command: BalanceCommand::Reconcile,
        }) => {
            let drifted = engine.reconcile_balances().await?;
            for report in &drifted {
                print_report(&report.user_id.to_string(), report);
            }
            if drifted.is_empty() {
                println!("all balances match the ledger");
            } else {
                println!("{} user(s) drifted", drifted.len());
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
