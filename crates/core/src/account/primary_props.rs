//! Property-based tests for the primary-account rule.

use proptest::prelude::*;

use kasir_shared::types::{AccountId, BranchId, CompanyId, CustomerId};

use crate::account::primary::{plan_primary, primary_count};
use crate::account::types::{Account, AccountDetails, AccountOwner, PrimaryRule};

fn owned_accounts(owner: AccountOwner, flags: &[bool]) -> Vec<Account> {
    let company = CompanyId::new();
    let branch = BranchId::new();
    flags
        .iter()
        .map(|primary| {
            Account::new(
                company,
                branch,
                "Receivable".into(),
                AccountDetails::for_owner(owner, *primary),
            )
        })
        .collect()
}

/// Saves `incoming` after applying the plan, the way the registry does.
fn save(accounts: &mut Vec<Account>, demote: &[AccountId], incoming: Account) {
    for account in accounts.iter_mut() {
        if demote.contains(&account.id) {
            account.details.set_primary(false);
        }
    }
    match accounts.iter_mut().find(|a| a.id == incoming.id) {
        Some(existing) => *existing = incoming,
        None => accounts.push(incoming),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Saving a primary account with the demote rule always leaves exactly one primary,
    // whatever state the siblings were in.
    #[test]
    fn prop_demote_leaves_exactly_one_primary(
        flags in prop::collection::vec(any::<bool>(), 0..6),
        edit_index in prop::option::of(0usize..6),
        incoming_primary in any::<bool>(),
    ) {
        let owner = AccountOwner::Customer(CustomerId::new());
        let mut accounts = owned_accounts(owner, &flags);
        let primaries_before = primary_count(&accounts, owner);

        let mut incoming = match edit_index.and_then(|i| accounts.get(i)) {
            Some(existing) => existing.clone(),
            None => owned_accounts(owner, &[false]).remove(0),
        };
        let was_primary = incoming.is_primary();
        incoming.details.set_primary(incoming_primary);

        let plan = plan_primary(owner, &accounts, incoming.id, incoming_primary, PrimaryRule::Demote)
            .unwrap();
        let incoming_id = incoming.id;
        save(&mut accounts, &plan.demote, incoming);

        if incoming_primary {
            prop_assert_eq!(primary_count(&accounts, owner), 1);
            prop_assert!(accounts.iter().any(|a| a.id == incoming_id && a.is_primary()));
        } else {
            prop_assert!(plan.is_empty());
            let expected = primaries_before - usize::from(was_primary && edit_index.is_some_and(|i| i < flags.len()));
            prop_assert_eq!(primary_count(&accounts, owner), expected);
        }
    }

    // With the reject rule, a committed state with at most one primary stays that way.
    #[test]
    fn prop_reject_preserves_at_most_one_primary(
        len in 0usize..6,
        primary_at in prop::option::of(0usize..6),
        incoming_primary in any::<bool>(),
    ) {
        let owner = AccountOwner::Customer(CustomerId::new());
        let flags: Vec<bool> = (0..len).map(|i| primary_at == Some(i)).collect();
        let mut accounts = owned_accounts(owner, &flags);
        prop_assert!(primary_count(&accounts, owner) <= 1);

        let mut incoming = owned_accounts(owner, &[false]).remove(0);
        incoming.details.set_primary(incoming_primary);

        match plan_primary(owner, &accounts, incoming.id, incoming_primary, PrimaryRule::RejectExisting) {
            Ok(plan) => {
                prop_assert!(plan.is_empty());
                save(&mut accounts, &plan.demote, incoming);
                prop_assert!(primary_count(&accounts, owner) <= 1);
            }
            Err(_) => {
                prop_assert!(incoming_primary);
                prop_assert_eq!(primary_count(&accounts, owner), 1);
            }
        }
    }
}
