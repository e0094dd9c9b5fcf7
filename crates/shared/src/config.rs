//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger posting configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger posting configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Prefix for generated transaction numbers.
    pub number_prefix: String,
    /// How many times a colliding transaction number is regenerated.
    pub number_retry_limit: u32,
    /// Window in which an identical transaction counts as a duplicate.
    pub duplicate_window_secs: u64,
    /// Categories completed immediately after recording (e.g. `WRITE_OFF`).
    pub auto_complete_categories: Vec<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            number_prefix: "TXN".to_string(),
            number_retry_limit: 3,
            duplicate_window_secs: 60,
            auto_complete_categories: vec![
                "WRITE_OFF".to_string(),
                "ADJUSTMENT".to_string(),
                "TRANSFER".to_string(),
                "PAYMENT".to_string(),
            ],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "kasir=info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("KASIR")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ledger.auto_complete_categories"),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_config_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.number_prefix, "TXN");
        assert_eq!(ledger.number_retry_limit, 3);
        assert_eq!(ledger.duplicate_window_secs, 60);
        assert!(ledger.auto_complete_categories.contains(&"WRITE_OFF".to_string()));
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("KASIR__DATABASE__URL", Some("postgres://localhost/kasir_test")),
                ("KASIR__LEDGER__DUPLICATE_WINDOW_SECS", Some("30")),
                ("RUN_MODE", Some("test")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/kasir_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.duplicate_window_secs, 30);
                assert_eq!(config.ledger.number_prefix, "TXN");
                assert_eq!(config.logging.filter, "kasir=info");
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_vars([("KASIR__DATABASE__URL", None::<&str>)], || {
            assert!(AppConfig::load().is_err());
        });
    }
}
