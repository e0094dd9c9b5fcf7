//! Transaction status machine.

use crate::ledger::error::LedgerError;
use crate::ledger::types::TransactionStatus;

/// Stateless validator for status transitions.
pub struct StatusMachine;

impl StatusMachine {
    /// Validates a move from `from` to `to` and returns the resulting status.
    ///
    /// Setting the current status again is allowed and changes nothing.
    ///
    /// # Returns
    /// * `Err(LedgerError::StatusLocked)` when leaving a reversing status
    /// * `Err(LedgerError::CompletedRegression)` for COMPLETED → DRAFT/PENDING
    /// * `Err(LedgerError::InvalidTransition)` for any other unlisted move
    pub fn transition(
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<TransactionStatus, LedgerError> {
        use TransactionStatus::{Completed, Draft, Failed, Pending};

        if from == to {
            return Ok(to);
        }
        if from.is_reversing() {
            return Err(LedgerError::StatusLocked { status: from });
        }
        if to.is_reversing() {
            return Ok(to);
        }

        match (from, to) {
            (Draft, Pending | Failed) | (Pending, Completed | Failed) => Ok(to),
            (Completed, Draft | Pending) => Err(LedgerError::CompletedRegression),
            _ => Err(LedgerError::InvalidTransition { from, to }),
        }
    }

    /// Returns true if the move is allowed.
    #[must_use]
    pub fn can_transition(from: TransactionStatus, to: TransactionStatus) -> bool {
        Self::transition(from, to).is_ok()
    }
}
