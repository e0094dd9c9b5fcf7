//! PostgreSQL storage for the Kasir ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the ledger tables
//! - The schema migration
//! - [`SeaLedgerStore`], the database implementation of the core storage port

pub mod entities;
pub mod migration;
pub mod store;

pub use store::{SeaLedgerStore, SeaStoreTx, audit_trail};

use kasir_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Establishes a connection pool to the configured database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
