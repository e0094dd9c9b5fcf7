//! Balance effects, reversal, and the duplicate guard.
//!
//! Reversal convention: the debit and credit roles are swapped. Reversing a
//! transaction credits its debit account and debits its credit account with
//! the full amount; the transaction row keeps its amount and is flagged
//! `reversal_applied`.

pub mod duplicate;
pub mod effect;
pub mod engine;

#[cfg(test)]
mod effect_props;

pub use duplicate::{DuplicateGuard, DuplicateKey};
pub use effect::BalanceEffect;
pub use engine::{ReversalEngine, ReversalOutcome};
