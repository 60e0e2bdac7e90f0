//! Handles settings for the application. Configuration is read from
//! `config/loyalty.toml` (optional) and `LOYALTY__*` environment variables,
//! e.g. `LOYALTY__SERVER__PORT=8080`.
//!
//! See `config/loyalty.example.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    #[serde(default = "default_cents_per_point")]
    pub cents_per_point: i64,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            cents_per_point: default_cents_per_point(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

fn default_cents_per_point() -> i64 {
    engine::LedgerConfig::default().cents_per_point
}

fn default_store_timeout_ms() -> u64 {
    let timeout = engine::LedgerConfig::default().store_timeout;
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

impl Ledger {
    pub fn engine_config(&self) -> engine::LedgerConfig {
        engine::LedgerConfig::default()
            .cents_per_point(self.cents_per_point)
            .store_timeout(std::time::Duration::from_millis(self.store_timeout_ms))
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub ledger: Ledger,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("config/loyalty").required(false))
                .add_source(Environment::with_prefix("LOYALTY").separator("__")),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Settings::from_config(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
            .unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let settings = parse("");
        assert_eq!(settings.app.level, "info");
        assert!(settings.server.is_none());
        assert_eq!(settings.ledger.cents_per_point, 25);
        assert_eq!(settings.ledger.store_timeout_ms, 5000);
    }

    #[test]
    fn server_with_sqlite_database() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            port = 8080
            database = { sqlite = "loyalty.db" }

            [ledger]
            cents_per_point = 10
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        let server = settings.server.unwrap();
        assert_eq!(server.port, 8080);
        assert!(server.bind.is_none());
        assert_eq!(server.database, Database::Sqlite("loyalty.db".to_string()));
        assert_eq!(settings.ledger.cents_per_point, 10);
        assert_eq!(settings.ledger.engine_config().cents_per_point, 10);
    }

    #[test]
    fn memory_database() {
        let settings = parse(
            r#"
            [server]
            port = 3000
            database = "memory"
            "#,
        );
        assert_eq!(settings.server.unwrap().database, Database::Memory);
    }
}
