//! Ledger settings derived from configuration.

use chrono::Duration;

use kasir_shared::LedgerConfig;

use crate::ledger::error::LedgerError;
use crate::ledger::types::TransactionCategory;

/// Runtime settings of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Prefix of transaction numbers.
    pub number_prefix: String,
    /// Regenerations allowed after a number collision.
    pub number_retry_limit: u32,
    /// How far back the duplicate guard looks.
    pub duplicate_window: Duration,
    /// Categories completed immediately after recording.
    pub auto_complete: Vec<TransactionCategory>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            number_prefix: "TXN".to_string(),
            number_retry_limit: 3,
            duplicate_window: Duration::seconds(60),
            auto_complete: vec![
                TransactionCategory::WriteOff,
                TransactionCategory::Adjustment,
                TransactionCategory::Transfer,
                TransactionCategory::Payment,
            ],
        }
    }
}

impl LedgerSettings {
    /// Builds settings from the `[ledger]` configuration section.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let number_prefix = config.number_prefix.trim().to_uppercase();
        if number_prefix.is_empty() {
            return Err(LedgerError::InvalidConfiguration(
                "number_prefix must not be empty".into(),
            ));
        }

        let duplicate_window = i64::try_from(config.duplicate_window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                LedgerError::InvalidConfiguration(format!(
                    "duplicate_window_secs out of range: {}",
                    config.duplicate_window_secs
                ))
            })?;

        let auto_complete = config
            .auto_complete_categories
            .iter()
            .map(|name| {
                TransactionCategory::parse(name).ok_or_else(|| {
                    LedgerError::InvalidConfiguration(format!("unknown category: {name}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            number_prefix,
            number_retry_limit: config.number_retry_limit,
            duplicate_window,
            auto_complete,
        })
    }

    /// Returns true if `category` completes right after recording.
    #[must_use]
    pub fn auto_completes(&self, category: TransactionCategory) -> bool {
        self.auto_complete.contains(&category)
    }
}
