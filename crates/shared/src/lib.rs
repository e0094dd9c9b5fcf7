//! Shared types, errors, and configuration for Kasir.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Money and quantity rounding rules
//! - Application-wide error taxonomy
//! - Configuration management
//! - Tracing bootstrap for binaries

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, LedgerConfig, LoggingConfig};
pub use error::{AppError, AppResult};
