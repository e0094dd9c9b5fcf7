//! The primary-account-per-owner rule.
//!
//! One routine serves every owner type. Callers lock the owner's accounts,
//! ask [`plan_primary`] what to do, apply the plan, then save. The storage
//! layer backs this with a partial unique index on `(kind, owner_id)` where
//! `is_primary` holds.

use kasir_shared::types::AccountId;

use crate::account::error::AccountError;
use crate::account::types::{Account, AccountOwner, PrimaryRule};

/// Sibling accounts to demote before saving an incoming primary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryPlan {
    /// Accounts that must lose their primary flag.
    pub demote: Vec<AccountId>,
}

impl PrimaryPlan {
    /// Returns true if nothing needs demoting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.demote.is_empty()
    }
}

/// Decides how saving `incoming` affects the other primaries of `owner`.
///
/// `siblings` are the owner's stored accounts and may include `incoming`
/// itself; an account never conflicts with its own stored row. A non-primary
/// incoming account never needs a plan.
pub fn plan_primary(
    owner: AccountOwner,
    siblings: &[Account],
    incoming: AccountId,
    incoming_primary: bool,
    rule: PrimaryRule,
) -> Result<PrimaryPlan, AccountError> {
    if !incoming_primary {
        return Ok(PrimaryPlan::default());
    }

    let others: Vec<AccountId> = siblings
        .iter()
        .filter(|account| account.id != incoming && account.is_primary())
        .filter(|account| account.owner() == Some(owner))
        .map(|account| account.id)
        .collect();

    match (rule, others.first()) {
        (_, None) => Ok(PrimaryPlan::default()),
        (PrimaryRule::RejectExisting, Some(existing)) => Err(AccountError::DuplicatePrimary {
            owner,
            existing: Some(*existing),
        }),
        (PrimaryRule::Demote, Some(_)) => Ok(PrimaryPlan { demote: others }),
    }
}

/// Number of primary accounts held by `owner` in `accounts`.
#[must_use]
pub fn primary_count(accounts: &[Account], owner: AccountOwner) -> usize {
    accounts
        .iter()
        .filter(|account| account.owner() == Some(owner) && account.is_primary())
        .count()
}

/// The account to promote when an owner has accounts but no primary.
///
/// Picks the oldest account.
#[must_use]
pub fn promotion_candidate(siblings: &[Account]) -> Option<&Account> {
    siblings
        .iter()
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}
