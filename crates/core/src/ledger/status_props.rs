//! Property-based tests for the status machine.

use proptest::prelude::*;

use crate::ledger::status::StatusMachine;
use crate::ledger::types::TransactionStatus;

fn arb_status() -> impl Strategy<Value = TransactionStatus> {
    prop::sample::select(TransactionStatus::ALL.to_vec())
}

/// Applies every requested move that the machine accepts, skipping the rest.
fn run(start: TransactionStatus, requests: &[TransactionStatus]) -> Vec<TransactionStatus> {
    let mut current = start;
    let mut history = vec![current];
    for to in requests {
        if let Ok(next) = StatusMachine::transition(current, *to) {
            current = next;
            history.push(current);
        }
    }
    history
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // No sequence of accepted moves leads from COMPLETED back to DRAFT or PENDING.
    #[test]
    fn prop_completed_never_regresses(
        requests in prop::collection::vec(arb_status(), 0..20),
    ) {
        let history = run(TransactionStatus::Draft, &requests);
        if let Some(pos) = history.iter().position(|s| *s == TransactionStatus::Completed) {
            for later in &history[pos..] {
                prop_assert!(!matches!(later, TransactionStatus::Draft | TransactionStatus::Pending));
            }
        }
    }

    // Once a reversing status is reached, it is never left.
    #[test]
    fn prop_reversing_status_is_absorbing(
        start in arb_status(),
        requests in prop::collection::vec(arb_status(), 0..20),
    ) {
        let history = run(start, &requests);
        if let Some(pos) = history.iter().position(TransactionStatus::is_reversing) {
            let locked = history[pos];
            prop_assert!(history[pos..].iter().all(|s| *s == locked));
        }
    }

    // Re-applying the current status is always accepted.
    #[test]
    fn prop_same_status_is_a_no_op(status in arb_status()) {
        prop_assert_eq!(StatusMachine::transition(status, status).unwrap(), status);
    }
}
